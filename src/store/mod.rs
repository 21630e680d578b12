//! Persistence store adapters. One adapter is opened per request and dropped with it.

mod codec;
pub mod memory;
pub mod postgres;

pub use codec::{from_columns, to_columns};
pub use memory::{MemoryDatabase, MemoryRecordStore};
pub use postgres::{PgProvider, PgRecordStore};

use crate::error::StoreError;
use crate::record::{Record, RecordId, RecordType};
use crate::sql::BoundQuery;
use async_trait::async_trait;
use std::sync::Arc;

/// Store operations on one record type, scoped to one session.
#[async_trait]
pub trait RecordStore<R: Record>: Send {
    fn record_type(&self) -> &Arc<RecordType>;

    /// `Ok(None)` when no record has this id.
    async fn find_by_id(&mut self, id: RecordId) -> Result<Option<R>, StoreError>;

    /// Persist a new record and write the assigned id back into it.
    async fn insert(&mut self, record: &mut R) -> Result<(), StoreError>;

    /// Replace the stored state of a record that already has an id.
    async fn merge(&mut self, record: &R) -> Result<(), StoreError>;

    async fn remove(&mut self, record: &R) -> Result<(), StoreError>;

    async fn query_named_list(&mut self, query: &BoundQuery) -> Result<Vec<R>, StoreError>;

    async fn query_all(&mut self) -> Result<Vec<R>, StoreError>;

    /// Exactly one row: `StoreError::NotFound` on none, `StoreError::Fault` on several.
    async fn query_named(&mut self, query: &BoundQuery) -> Result<R, StoreError> {
        let mut rows = self.query_named_list(query).await?;
        match rows.len() {
            0 => Err(StoreError::NotFound(query.query().name().to_string())),
            1 => Ok(rows.remove(0)),
            n => Err(StoreError::Fault(format!(
                "query {} returned {} rows, expected one",
                query.query().name(),
                n
            ))),
        }
    }
}

/// Opens session-scoped stores. Cloned into every resource that uses it.
#[async_trait]
pub trait StoreProvider: Clone + Send + Sync + 'static {
    type Store<R: Record>: RecordStore<R>;

    async fn open<R: Record>(&self, record_type: Arc<RecordType>) -> Result<Self::Store<R>, StoreError>;

    /// Readiness check against the backing store.
    async fn ping(&self) -> Result<(), StoreError>;
}
