//! In-process store for tests and runs without PostgreSQL.
//!
//! Records are kept as their serialized (camelCase) JSON per table, keyed by id. Named queries use
//! the query's matcher when it has one; otherwise every bound parameter must equal the record
//! field of the same name. Results are ordered by id; a query's SQL ORDER BY is not applied.

use crate::case::to_camel_case;
use crate::error::StoreError;
use crate::record::{Record, RecordId, RecordType};
use crate::sql::BoundQuery;
use crate::store::{RecordStore, StoreProvider};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// JSON equality where numbers compare by value (`5` matches `5.0`).
fn same_value(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) if a.is_number() && b.is_number() => x == y,
        _ => a == b,
    }
}

#[derive(Default)]
struct Table {
    last_id: RecordId,
    rows: BTreeMap<RecordId, Value>,
}

#[derive(Default)]
struct Inner {
    tables: RwLock<HashMap<String, Table>>,
    fail_writes: AtomicBool,
    offline: AtomicBool,
}

/// Shared in-memory database. Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    inner: Arc<Inner>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every insert, merge and remove fail with a store fault until switched off.
    pub fn fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make readiness pings fail until switched back on.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of stored rows in a table.
    pub fn count(&self, table: &str) -> usize {
        self.inner
            .tables
            .read()
            .map(|t| t.get(table).map(|t| t.rows.len()).unwrap_or(0))
            .unwrap_or(0)
    }

    fn with_table<T>(&self, table: &str, f: impl FnOnce(&mut Table) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let mut tables = self
            .inner
            .tables
            .write()
            .map_err(|_| StoreError::Fault("memory store lock poisoned".into()))?;
        f(tables.entry(table.to_string()).or_default())
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Fault("writes are disabled".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl StoreProvider for MemoryDatabase {
    type Store<R: Record> = MemoryRecordStore<R>;

    async fn open<R: Record>(&self, record_type: Arc<RecordType>) -> Result<Self::Store<R>, StoreError> {
        Ok(MemoryRecordStore {
            db: self.clone(),
            record_type,
            _marker: PhantomData,
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Fault("memory store is offline".into()));
        }
        Ok(())
    }
}

pub struct MemoryRecordStore<R> {
    db: MemoryDatabase,
    record_type: Arc<RecordType>,
    _marker: PhantomData<fn() -> R>,
}

impl<R: Record> MemoryRecordStore<R> {
    fn table(&self) -> &str {
        self.record_type.table_name()
    }

    fn require_id(&self, record: &R) -> Result<RecordId, StoreError> {
        record
            .id()
            .ok_or_else(|| StoreError::Fault(format!("{} has no id", self.record_type.name())))
    }

    fn missing(&self, id: RecordId) -> StoreError {
        StoreError::Fault(format!("{} {} no longer exists", self.record_type.name(), id))
    }

    fn decode(rows: Vec<Value>) -> Result<Vec<R>, StoreError> {
        rows.into_iter()
            .map(|v| serde_json::from_value(v).map_err(StoreError::from))
            .collect()
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for MemoryRecordStore<R> {
    fn record_type(&self) -> &Arc<RecordType> {
        &self.record_type
    }

    async fn find_by_id(&mut self, id: RecordId) -> Result<Option<R>, StoreError> {
        let row = self.db.with_table(self.table(), |t| Ok(t.rows.get(&id).cloned()))?;
        row.map(|v| serde_json::from_value(v).map_err(StoreError::from)).transpose()
    }

    async fn insert(&mut self, record: &mut R) -> Result<(), StoreError> {
        self.db.check_writable()?;
        let table = self.record_type.table_name().to_string();
        self.db.with_table(&table, |t| {
            let id = t.last_id + 1;
            record.set_id(id);
            let body = serde_json::to_value(&*record)?;
            t.last_id = id;
            t.rows.insert(id, body);
            Ok(())
        })
    }

    async fn merge(&mut self, record: &R) -> Result<(), StoreError> {
        self.db.check_writable()?;
        let id = self.require_id(record)?;
        let body = serde_json::to_value(record)?;
        let missing = self.missing(id);
        self.db.with_table(self.table(), |t| match t.rows.get_mut(&id) {
            Some(row) => {
                *row = body;
                Ok(())
            }
            None => Err(missing),
        })
    }

    async fn remove(&mut self, record: &R) -> Result<(), StoreError> {
        self.db.check_writable()?;
        let id = self.require_id(record)?;
        let missing = self.missing(id);
        self.db.with_table(self.table(), |t| t.rows.remove(&id).map(|_| ()).ok_or(missing))
    }

    async fn query_named_list(&mut self, query: &BoundQuery) -> Result<Vec<R>, StoreError> {
        query.positional()?;
        let params = query.parameters();
        let matcher = query.query().matcher();
        let rows = self.db.with_table(self.table(), |t| {
            Ok(t.rows
                .values()
                .filter(|row| match matcher {
                    Some(matches) => matches(row, params),
                    None => params
                        .iter()
                        .all(|(name, value)| row.get(to_camel_case(name)).is_some_and(|field| same_value(field, value))),
                })
                .cloned()
                .collect::<Vec<_>>())
        })?;
        Self::decode(rows)
    }

    async fn query_all(&mut self) -> Result<Vec<R>, StoreError> {
        let rows = self
            .db
            .with_table(self.table(), |t| Ok(t.rows.values().cloned().collect::<Vec<_>>()))?;
        Self::decode(rows)
    }
}
