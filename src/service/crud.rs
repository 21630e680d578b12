//! Generic CRUD execution against any record store.
//!
//! Every operation takes the session-scoped store explicitly. Update and delete read before they
//! write and the two calls are not atomic: a record deleted concurrently between them surfaces as
//! a store fault on the write, not as a not-found.

use crate::error::{AppError, StoreError};
use crate::record::{Record, RecordId};
use crate::response::CrudResponse;
use crate::service::StoreFaultPolicy;
use crate::sql::{bind_parameters, BoundQuery, Parameters};
use crate::store::RecordStore;
use axum::http::StatusCode;

pub struct CrudService;

impl CrudService {
    /// Insert a new record. 204 without a record, 400 when it already has an id, 201 with `Location` on success.
    pub async fn create<R, S>(store: &mut S, record: Option<R>, policy: StoreFaultPolicy) -> Result<CrudResponse<R>, AppError>
    where
        R: Record,
        S: RecordStore<R>,
    {
        let ty = store.record_type().clone();
        tracing::debug!(record_type = ty.name(), "create");
        let Some(mut record) = record else {
            tracing::error!(record_type = ty.name(), "create called without a record");
            return Ok(CrudResponse::empty(StatusCode::NO_CONTENT));
        };
        if let Some(id) = record.id() {
            let message = format!("The given {} has an id ({}). Use update instead of create.", ty.name(), id);
            tracing::error!(record_type = ty.name(), id, "{}", message);
            return Ok(CrudResponse::message(StatusCode::BAD_REQUEST, message));
        }

        let outcome = match store.insert(&mut record).await {
            Ok(()) => record
                .id()
                .ok_or_else(|| StoreError::Fault(format!("store assigned no id to {}", ty.name()))),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(id) => Ok(CrudResponse::created(ty.location(id))),
            Err(e) => {
                tracing::error!(record_type = ty.name(), error = %e, "create failed");
                Ok(CrudResponse::empty(policy.create_fault_status()))
            }
        }
    }

    /// Fetch one record. 400 without an id, 404 when absent.
    pub async fn retrieve<R, S>(store: &mut S, id: Option<RecordId>) -> Result<CrudResponse<R>, AppError>
    where
        R: Record,
        S: RecordStore<R>,
    {
        let ty = store.record_type().clone();
        tracing::debug!(record_type = ty.name(), ?id, "retrieve");
        let Some(id) = id else {
            let message = format!("There is no id when attempting to get a {}", ty.name());
            tracing::error!(record_type = ty.name(), "{}", message);
            return Ok(CrudResponse::message(StatusCode::BAD_REQUEST, message));
        };
        Ok(match store.find_by_id(id).await? {
            Some(record) => CrudResponse::ok_one(record),
            None => CrudResponse::empty(StatusCode::NOT_FOUND),
        })
    }

    /// Every record of the type, unfiltered.
    pub async fn retrieve_all<R, S>(store: &mut S) -> Result<CrudResponse<R>, AppError>
    where
        R: Record,
        S: RecordStore<R>,
    {
        tracing::debug!(record_type = store.record_type().name(), "retrieve all");
        Ok(CrudResponse::ok_many(store.query_all().await?))
    }

    /// Replace the stored record `id` with `record`. The path id always wins over the body's id.
    pub async fn update<R, S>(
        store: &mut S,
        id: Option<RecordId>,
        record: Option<R>,
        policy: StoreFaultPolicy,
    ) -> Result<CrudResponse<R>, AppError>
    where
        R: Record,
        S: RecordStore<R>,
    {
        let ty = store.record_type().clone();
        tracing::debug!(record_type = ty.name(), ?id, "update");
        let Some(mut record) = record else {
            tracing::error!(record_type = ty.name(), "update called without a record");
            return Ok(CrudResponse::empty(StatusCode::NO_CONTENT));
        };
        let Some(id) = id else {
            let message = format!("The {} to update has no id. Use create instead.", ty.name());
            tracing::error!(record_type = ty.name(), "{}", message);
            return Ok(CrudResponse::message(StatusCode::NOT_FOUND, message));
        };
        if store.find_by_id(id).await?.is_none() {
            let message = format!("{} {} does not exist.", ty.name(), id);
            tracing::error!(record_type = ty.name(), id, "{}", message);
            return Ok(CrudResponse::message(StatusCode::NOT_FOUND, message));
        }

        record.set_id(id);
        match store.merge(&record).await {
            Ok(()) => Ok(CrudResponse::empty(StatusCode::OK)),
            Err(e) => {
                tracing::error!(record_type = ty.name(), id, error = %e, "update failed");
                Ok(CrudResponse::empty(policy.write_fault_status()))
            }
        }
    }

    /// Remove the stored instance of `id`. 404 when there is no id or no such record.
    pub async fn delete<R, S>(store: &mut S, id: Option<RecordId>, policy: StoreFaultPolicy) -> Result<CrudResponse<R>, AppError>
    where
        R: Record,
        S: RecordStore<R>,
    {
        let ty = store.record_type().clone();
        tracing::debug!(record_type = ty.name(), ?id, "delete");
        let Some(id) = id else {
            tracing::error!(record_type = ty.name(), "delete called without an id");
            return Ok(CrudResponse::empty(StatusCode::NOT_FOUND));
        };
        let Some(found) = store.find_by_id(id).await? else {
            return Ok(CrudResponse::empty(StatusCode::NOT_FOUND));
        };

        match store.remove(&found).await {
            Ok(()) => Ok(CrudResponse::empty(StatusCode::OK)),
            Err(e) => {
                tracing::error!(record_type = ty.name(), id, error = %e, "delete failed");
                Ok(CrudResponse::empty(policy.write_fault_status()))
            }
        }
    }

    /// Run a named query expected to match at most one record. No match is `None`.
    pub async fn find_one_result<R, S>(
        store: &mut S,
        name: &str,
        parameters: Option<&Parameters>,
    ) -> Result<Option<R>, AppError>
    where
        R: Record,
        S: RecordStore<R>,
    {
        let query = Self::bound::<R, S>(store, name, parameters)?;
        match store.query_named(&query).await {
            Ok(record) => Ok(Some(record)),
            Err(StoreError::NotFound(_)) => {
                tracing::debug!(
                    record_type = store.record_type().name(),
                    query = name,
                    ?parameters,
                    "no result"
                );
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Run a named query; no match is an empty list.
    pub async fn find_result_list<R, S>(
        store: &mut S,
        name: &str,
        parameters: Option<&Parameters>,
    ) -> Result<Vec<R>, AppError>
    where
        R: Record,
        S: RecordStore<R>,
    {
        let query = Self::bound::<R, S>(store, name, parameters)?;
        Ok(store.query_named_list(&query).await?)
    }

    fn bound<R, S>(store: &S, name: &str, parameters: Option<&Parameters>) -> Result<BoundQuery, StoreError>
    where
        R: Record,
        S: RecordStore<R>,
    {
        let mut query = BoundQuery::new(store.record_type().query(name)?);
        bind_parameters(&mut query, parameters)?;
        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Brew;
    use crate::record::RecordType;
    use crate::response::Payload;
    use crate::store::{MemoryDatabase, MemoryRecordStore, StoreProvider};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    /// Delegates to the memory store and counts writes.
    struct CountingStore {
        inner: MemoryRecordStore<Brew>,
        inserts: usize,
        merges: usize,
        removes: usize,
    }

    #[async_trait]
    impl RecordStore<Brew> for CountingStore {
        fn record_type(&self) -> &Arc<RecordType> {
            self.inner.record_type()
        }

        async fn find_by_id(&mut self, id: RecordId) -> Result<Option<Brew>, StoreError> {
            self.inner.find_by_id(id).await
        }

        async fn insert(&mut self, record: &mut Brew) -> Result<(), StoreError> {
            self.inserts += 1;
            self.inner.insert(record).await
        }

        async fn merge(&mut self, record: &Brew) -> Result<(), StoreError> {
            self.merges += 1;
            self.inner.merge(record).await
        }

        async fn remove(&mut self, record: &Brew) -> Result<(), StoreError> {
            self.removes += 1;
            self.inner.remove(record).await
        }

        async fn query_named_list(&mut self, query: &BoundQuery) -> Result<Vec<Brew>, StoreError> {
            self.inner.query_named_list(query).await
        }

        async fn query_all(&mut self) -> Result<Vec<Brew>, StoreError> {
            self.inner.query_all().await
        }
    }

    /// Loses every record it finds: the row is removed right after it is read.
    struct VanishingStore(MemoryRecordStore<Brew>);

    #[async_trait]
    impl RecordStore<Brew> for VanishingStore {
        fn record_type(&self) -> &Arc<RecordType> {
            self.0.record_type()
        }

        async fn find_by_id(&mut self, id: RecordId) -> Result<Option<Brew>, StoreError> {
            let found = self.0.find_by_id(id).await?;
            if let Some(record) = &found {
                self.0.remove(record).await?;
            }
            Ok(found)
        }

        async fn insert(&mut self, record: &mut Brew) -> Result<(), StoreError> {
            self.0.insert(record).await
        }

        async fn merge(&mut self, record: &Brew) -> Result<(), StoreError> {
            self.0.merge(record).await
        }

        async fn remove(&mut self, record: &Brew) -> Result<(), StoreError> {
            self.0.remove(record).await
        }

        async fn query_named_list(&mut self, query: &BoundQuery) -> Result<Vec<Brew>, StoreError> {
            self.0.query_named_list(query).await
        }

        async fn query_all(&mut self) -> Result<Vec<Brew>, StoreError> {
            self.0.query_all().await
        }
    }

    async fn store(db: &MemoryDatabase) -> CountingStore {
        CountingStore {
            inner: db.open::<Brew>(Arc::new(Brew::record_type())).await.unwrap(),
            inserts: 0,
            merges: 0,
            removes: 0,
        }
    }

    fn brew(name: &str) -> Brew {
        Brew {
            name: name.into(),
            ..Default::default()
        }
    }

    async fn seed(s: &mut CountingStore, name: &str) -> RecordId {
        let resp = CrudService::create(s, Some(brew(name)), StoreFaultPolicy::Uniform).await.unwrap();
        let location = resp.location.unwrap();
        location.rsplit('/').next().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn create_assigns_id_and_location() {
        let db = MemoryDatabase::new();
        let mut s = store(&db).await;
        let resp = CrudService::create(&mut s, Some(brew("IPA")), StoreFaultPolicy::Uniform).await.unwrap();
        assert_eq!(resp.status, StatusCode::CREATED);
        assert_eq!(resp.location.as_deref(), Some("/api/brews/1"));
        assert_eq!((s.inserts, s.merges), (1, 0));

        let found = CrudService::retrieve::<Brew, _>(&mut s, Some(1)).await.unwrap();
        assert_eq!(found.status, StatusCode::OK);
        let Payload::One(b) = found.payload else { panic!("expected a record") };
        assert_eq!((b.id, b.name.as_str()), (Some(1), "IPA"));
    }

    #[tokio::test]
    async fn create_rejects_missing_record_and_existing_id() {
        let db = MemoryDatabase::new();
        let mut s = store(&db).await;
        let resp = CrudService::create::<Brew, _>(&mut s, None, StoreFaultPolicy::Uniform).await.unwrap();
        assert_eq!(resp.status, StatusCode::NO_CONTENT);

        let stout = Brew { id: Some(7), ..brew("Stout") };
        let resp = CrudService::create(&mut s, Some(stout), StoreFaultPolicy::Uniform).await.unwrap();
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert!(matches!(resp.payload, Payload::Message(ref m) if m.contains("Use update instead")));
        assert_eq!(s.inserts, 0);
        assert_eq!(db.count("brew"), 0);
    }

    #[tokio::test]
    async fn create_fault_follows_policy() {
        let db = MemoryDatabase::new();
        let mut s = store(&db).await;
        db.fail_writes(true);
        let uniform = CrudService::create(&mut s, Some(brew("IPA")), StoreFaultPolicy::Uniform).await.unwrap();
        assert_eq!(uniform.status, StatusCode::INTERNAL_SERVER_ERROR);
        let legacy = CrudService::create(&mut s, Some(brew("IPA")), StoreFaultPolicy::Legacy).await.unwrap();
        assert_eq!(legacy.status, StatusCode::NOT_FOUND);
        assert_eq!(s.inserts, 2);
    }

    #[tokio::test]
    async fn retrieve_without_id_or_record() {
        let db = MemoryDatabase::new();
        let mut s = store(&db).await;
        let resp = CrudService::retrieve::<Brew, _>(&mut s, None).await.unwrap();
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        let resp = CrudService::retrieve::<Brew, _>(&mut s, Some(99)).await.unwrap();
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        assert_eq!(resp.payload, Payload::Empty);
        assert_eq!((s.inserts, s.merges, s.removes), (0, 0, 0));
    }

    #[tokio::test]
    async fn retrieve_all_lists_in_id_order() {
        let db = MemoryDatabase::new();
        let mut s = store(&db).await;
        let empty = CrudService::retrieve_all::<Brew, _>(&mut s).await.unwrap();
        assert_eq!(empty.payload, Payload::Many(vec![]));

        seed(&mut s, "IPA").await;
        seed(&mut s, "Stout").await;
        let resp = CrudService::retrieve_all::<Brew, _>(&mut s).await.unwrap();
        let Payload::Many(all) = resp.payload else { panic!("expected a list") };
        let names: Vec<_> = all.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["IPA", "Stout"]);
    }

    #[tokio::test]
    async fn update_uses_path_id() {
        let db = MemoryDatabase::new();
        let mut s = store(&db).await;
        let id = seed(&mut s, "IPA").await;
        let other = seed(&mut s, "Stout").await;

        let payload = Brew { id: Some(other), abv: Some(6.5), ..brew("Hazy IPA") };
        let resp = CrudService::update(&mut s, Some(id), Some(payload), StoreFaultPolicy::Uniform).await.unwrap();
        assert_eq!(resp.status, StatusCode::OK);

        let updated = s.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(updated.name, "Hazy IPA");
        assert_eq!(updated.abv, Some(6.5));
        let untouched = s.find_by_id(other).await.unwrap().unwrap();
        assert_eq!(untouched.name, "Stout");
    }

    #[tokio::test]
    async fn update_rejections_never_merge() {
        let db = MemoryDatabase::new();
        let mut s = store(&db).await;
        let resp = CrudService::update::<Brew, _>(&mut s, Some(1), None, StoreFaultPolicy::Uniform).await.unwrap();
        assert_eq!(resp.status, StatusCode::NO_CONTENT);
        let resp = CrudService::update(&mut s, None, Some(brew("IPA")), StoreFaultPolicy::Uniform).await.unwrap();
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        let resp = CrudService::update(&mut s, Some(99), Some(brew("IPA")), StoreFaultPolicy::Uniform).await.unwrap();
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        assert!(matches!(resp.payload, Payload::Message(ref m) if m.contains("does not exist")));
        assert_eq!(s.merges, 0);
    }

    #[tokio::test]
    async fn update_fault_is_server_error_under_both_policies() {
        let db = MemoryDatabase::new();
        let mut s = store(&db).await;
        let id = seed(&mut s, "IPA").await;
        db.fail_writes(true);
        for policy in [StoreFaultPolicy::Uniform, StoreFaultPolicy::Legacy] {
            let resp = CrudService::update(&mut s, Some(id), Some(brew("IPA")), policy).await.unwrap();
            assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[tokio::test]
    async fn delete_twice_is_not_found_second_time() {
        let db = MemoryDatabase::new();
        let mut s = store(&db).await;
        let id = seed(&mut s, "IPA").await;

        let first = CrudService::delete::<Brew, _>(&mut s, Some(id), StoreFaultPolicy::Uniform).await.unwrap();
        assert_eq!(first.status, StatusCode::OK);
        let second = CrudService::delete::<Brew, _>(&mut s, Some(id), StoreFaultPolicy::Uniform).await.unwrap();
        assert_eq!(second.status, StatusCode::NOT_FOUND);
        assert_eq!(s.removes, 1);

        let gone = CrudService::retrieve::<Brew, _>(&mut s, Some(id)).await.unwrap();
        assert_eq!(gone.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_without_id_or_on_fault() {
        let db = MemoryDatabase::new();
        let mut s = store(&db).await;
        let resp = CrudService::delete::<Brew, _>(&mut s, None, StoreFaultPolicy::Uniform).await.unwrap();
        assert_eq!(resp.status, StatusCode::NOT_FOUND);

        let id = seed(&mut s, "IPA").await;
        db.fail_writes(true);
        let resp = CrudService::delete::<Brew, _>(&mut s, Some(id), StoreFaultPolicy::Legacy).await.unwrap();
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(db.count("brew"), 1);
    }

    #[tokio::test]
    async fn named_query_helpers() {
        let db = MemoryDatabase::new();
        let mut s = store(&db).await;
        seed(&mut s, "IPA").await;
        seed(&mut s, "Stout").await;

        let params: Parameters = [("name".to_string(), json!("Stout"))].into_iter().collect();
        let found = CrudService::find_one_result::<Brew, _>(&mut s, "Brew.findByName", Some(&params)).await.unwrap();
        assert_eq!(found.map(|b| b.id), Some(Some(2)));

        let params: Parameters = [("name".to_string(), json!("Porter"))].into_iter().collect();
        let none = CrudService::find_one_result::<Brew, _>(&mut s, "Brew.findByName", Some(&params)).await.unwrap();
        assert!(none.is_none());
        let list = CrudService::find_result_list::<Brew, _>(&mut s, "Brew.findByName", Some(&params)).await.unwrap();
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn named_query_errors_propagate() {
        let db = MemoryDatabase::new();
        let mut s = store(&db).await;
        let err = CrudService::find_result_list::<Brew, _>(&mut s, "Brew.findByColor", None).await.unwrap_err();
        assert!(matches!(err, AppError::Store(StoreError::UnknownQuery(_))));
        let err = CrudService::find_one_result::<Brew, _>(&mut s, "Brew.findByName", None).await.unwrap_err();
        assert!(matches!(err, AppError::Store(StoreError::UnboundParameter { .. })));
    }

    #[tokio::test]
    async fn record_removed_between_find_and_write_is_a_server_error() {
        let db = MemoryDatabase::new();
        let mut s = VanishingStore(db.open::<Brew>(Arc::new(Brew::record_type())).await.unwrap());
        let mut first = brew("IPA");
        let mut second = brew("Stout");
        s.0.insert(&mut first).await.unwrap();
        s.0.insert(&mut second).await.unwrap();

        let updated = CrudService::update(&mut s, first.id, Some(brew("Hazy IPA")), StoreFaultPolicy::Legacy)
            .await
            .unwrap();
        assert_eq!(updated.status, StatusCode::INTERNAL_SERVER_ERROR);
        let deleted = CrudService::delete::<Brew, _>(&mut s, second.id, StoreFaultPolicy::Legacy).await.unwrap();
        assert_eq!(deleted.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(db.count("brew"), 0);
    }

    #[tokio::test]
    async fn several_matches_for_a_single_result_is_a_fault() {
        let db = MemoryDatabase::new();
        let mut s = store(&db).await;
        seed(&mut s, "Wit").await;
        seed(&mut s, "Wit").await;

        let params: Parameters = [("name".to_string(), json!("Wit"))].into_iter().collect();
        let err = CrudService::find_one_result::<Brew, _>(&mut s, "Brew.findByName", Some(&params))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Store(StoreError::Fault(_))));
        assert_eq!(err.status().0, StatusCode::INTERNAL_SERVER_ERROR);

        let both = CrudService::find_result_list::<Brew, _>(&mut s, "Brew.findByName", Some(&params))
            .await
            .unwrap();
        assert_eq!(both.len(), 2);
    }
}
