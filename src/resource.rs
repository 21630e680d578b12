//! Per-type CRUD facade: binds one record type to a store provider and fault policy.
//!
//! Each call opens a fresh store session, so a facade can be shared across requests.

use crate::error::AppError;
use crate::record::{Record, RecordId, RecordType};
use crate::response::CrudResponse;
use crate::service::{CrudService, StoreFaultPolicy};
use crate::sql::Parameters;
use crate::store::StoreProvider;
use std::marker::PhantomData;
use std::sync::Arc;

pub struct CrudResource<R, P> {
    record_type: Arc<RecordType>,
    provider: P,
    policy: StoreFaultPolicy,
    _marker: PhantomData<fn() -> R>,
}

impl<R: Record, P: StoreProvider> CrudResource<R, P> {
    pub fn new(provider: P) -> Self {
        Self {
            record_type: Arc::new(R::record_type()),
            provider,
            policy: StoreFaultPolicy::default(),
            _marker: PhantomData,
        }
    }

    pub fn with_policy(mut self, policy: StoreFaultPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.record_type
    }

    async fn store(&self) -> Result<P::Store<R>, AppError> {
        Ok(self.provider.open::<R>(self.record_type.clone()).await?)
    }

    pub async fn create(&self, record: Option<R>) -> Result<CrudResponse<R>, AppError> {
        let mut store = self.store().await?;
        CrudService::create(&mut store, record, self.policy).await
    }

    pub async fn retrieve(&self, id: Option<RecordId>) -> Result<CrudResponse<R>, AppError> {
        let mut store = self.store().await?;
        CrudService::retrieve::<R, _>(&mut store, id).await
    }

    pub async fn retrieve_all(&self) -> Result<CrudResponse<R>, AppError> {
        let mut store = self.store().await?;
        CrudService::retrieve_all::<R, _>(&mut store).await
    }

    pub async fn update(&self, id: Option<RecordId>, record: Option<R>) -> Result<CrudResponse<R>, AppError> {
        let mut store = self.store().await?;
        CrudService::update(&mut store, id, record, self.policy).await
    }

    pub async fn delete(&self, id: Option<RecordId>) -> Result<CrudResponse<R>, AppError> {
        let mut store = self.store().await?;
        CrudService::delete::<R, _>(&mut store, id, self.policy).await
    }

    pub async fn find_one_result(&self, name: &str, parameters: Option<&Parameters>) -> Result<Option<R>, AppError> {
        let mut store = self.store().await?;
        CrudService::find_one_result::<R, _>(&mut store, name, parameters).await
    }

    pub async fn find_result_list(&self, name: &str, parameters: Option<&Parameters>) -> Result<Vec<R>, AppError> {
        let mut store = self.store().await?;
        CrudService::find_result_list::<R, _>(&mut store, name, parameters).await
    }
}

impl<R, P: Clone> Clone for CrudResource<R, P> {
    fn clone(&self) -> Self {
        Self {
            record_type: self.record_type.clone(),
            provider: self.provider.clone(),
            policy: self.policy,
            _marker: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Brew;
    use crate::response::Payload;
    use crate::store::MemoryDatabase;
    use axum::http::StatusCode;
    use serde_json::json;

    fn brew(name: &str) -> Brew {
        Brew {
            name: name.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn sessions_share_the_provider() {
        let db = MemoryDatabase::new();
        let resource = CrudResource::<Brew, _>::new(db.clone());
        let created = resource.create(Some(brew("Porter"))).await.unwrap();
        assert_eq!(created.status, StatusCode::CREATED);
        assert_eq!(created.location.as_deref(), Some("/api/brews/1"));

        let fetched = resource.clone().retrieve(Some(1)).await.unwrap();
        match fetched.payload {
            Payload::One(b) => assert_eq!(b.name, "Porter"),
            _ => panic!("expected one record"),
        }
        assert_eq!(db.count("brew"), 1);
    }

    #[tokio::test]
    async fn legacy_policy_reports_create_fault_as_not_found() {
        let db = MemoryDatabase::new();
        db.fail_writes(true);
        let uniform = CrudResource::<Brew, _>::new(db.clone());
        let legacy = uniform.clone().with_policy(StoreFaultPolicy::Legacy);

        assert_eq!(
            uniform.create(Some(brew("Mild"))).await.unwrap().status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(legacy.create(Some(brew("Mild"))).await.unwrap().status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn named_queries_through_the_facade() {
        let resource = CrudResource::<Brew, _>::new(MemoryDatabase::new());
        resource.create(Some(brew("Saison"))).await.unwrap();
        resource.create(Some(brew("Dubbel"))).await.unwrap();

        let params: Parameters = [("name".to_string(), json!("Dubbel"))].into_iter().collect();
        let found = resource
            .find_one_result("Brew.findByName", Some(&params))
            .await
            .unwrap()
            .expect("Dubbel is stored");
        assert_eq!(found.id, Some(2));

        let params: Parameters = [("name".to_string(), json!("Tripel"))].into_iter().collect();
        assert!(resource.find_one_result("Brew.findByName", Some(&params)).await.unwrap().is_none());
        assert!(resource
            .find_result_list("Brew.findByName", Some(&params))
            .await
            .unwrap()
            .is_empty());
    }
}
