//! PostgreSQL store: one pooled connection per opened store, SQL from the record type.

use crate::error::StoreError;
use crate::record::{Record, RecordId, RecordType, ID_COLUMN};
use crate::sql::{self, BoundQuery, PgBindValue, QueryBuf};
use crate::store::{from_columns, to_columns, RecordStore, StoreProvider};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};
use std::marker::PhantomData;
use std::sync::Arc;

#[derive(Clone)]
pub struct PgProvider {
    pool: PgPool,
    /// Overrides the schema of every record type opened through this provider.
    schema: Option<String>,
}

impl PgProvider {
    pub fn new(pool: PgPool) -> Self {
        PgProvider { pool, schema: None }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }
}

#[async_trait]
impl StoreProvider for PgProvider {
    type Store<R: Record> = PgRecordStore<R>;

    async fn open<R: Record>(&self, record_type: Arc<RecordType>) -> Result<Self::Store<R>, StoreError> {
        let conn = self.pool.acquire().await?;
        Ok(PgRecordStore {
            conn,
            record_type,
            schema: self.schema.clone(),
            _marker: PhantomData,
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

pub struct PgRecordStore<R> {
    conn: PoolConnection<Postgres>,
    record_type: Arc<RecordType>,
    schema: Option<String>,
    _marker: PhantomData<fn() -> R>,
}

impl<R: Record> PgRecordStore<R> {
    fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    async fn fetch_rows(&mut self, q: &QueryBuf) -> Result<Vec<R>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let rows = query.fetch_all(&mut *self.conn).await?;
        rows.iter().map(|r| from_columns(row_to_map(r))).collect()
    }

    async fn execute(&mut self, q: &QueryBuf) -> Result<u64, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let done = query.execute(&mut *self.conn).await?;
        Ok(done.rows_affected())
    }

    fn require_id(&self, record: &R) -> Result<RecordId, StoreError> {
        record
            .id()
            .ok_or_else(|| StoreError::Fault(format!("{} has no id", self.record_type.name())))
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for PgRecordStore<R> {
    fn record_type(&self) -> &Arc<RecordType> {
        &self.record_type
    }

    async fn find_by_id(&mut self, id: RecordId) -> Result<Option<R>, StoreError> {
        let q = sql::select_by_id(&self.record_type, id, self.schema());
        Ok(self.fetch_rows(&q).await?.into_iter().next())
    }

    async fn insert(&mut self, record: &mut R) -> Result<(), StoreError> {
        let body = to_columns(record)?;
        let q = sql::insert(&self.record_type, &body, self.schema());
        tracing::debug!(sql = %q.sql, params = ?q.params, "insert");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let row = query.fetch_one(&mut *self.conn).await?;
        let id = assigned_id(self.record_type.name(), cell_to_value(&row, ID_COLUMN))?;
        record.set_id(id);
        Ok(())
    }

    async fn merge(&mut self, record: &R) -> Result<(), StoreError> {
        let id = self.require_id(record)?;
        let body = to_columns(record)?;
        let q = sql::update(&self.record_type, id, &body, self.schema());
        if self.execute(&q).await? == 0 {
            return Err(StoreError::Fault(format!("{} {} no longer exists", self.record_type.name(), id)));
        }
        Ok(())
    }

    async fn remove(&mut self, record: &R) -> Result<(), StoreError> {
        let id = self.require_id(record)?;
        let q = sql::delete(&self.record_type, id, self.schema());
        if self.execute(&q).await? == 0 {
            return Err(StoreError::Fault(format!("{} {} no longer exists", self.record_type.name(), id)));
        }
        Ok(())
    }

    async fn query_named_list(&mut self, query: &BoundQuery) -> Result<Vec<R>, StoreError> {
        let q = sql::select_named(&self.record_type, query, self.schema())?;
        self.fetch_rows(&q).await
    }

    async fn query_all(&mut self) -> Result<Vec<R>, StoreError> {
        let q = sql::select_all(&self.record_type, self.schema());
        self.fetch_rows(&q).await
    }
}

/// Identifier from `RETURNING "id"`; int2, int4 and int8 columns all decode to a JSON integer.
fn assigned_id(type_name: &str, cell: Value) -> Result<RecordId, StoreError> {
    cell.as_i64()
        .ok_or_else(|| StoreError::Fault(format!("{} insert returned a non-integer id: {}", type_name, cell)))
}

fn row_to_map(row: &sqlx::postgres::PgRow) -> Map<String, Value> {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    map
}

fn cell_to_value(row: &sqlx::postgres::PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}
