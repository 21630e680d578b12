//! Shared application state: the store provider and fault policy every resource is built from.

use crate::record::Record;
use crate::resource::CrudResource;
use crate::service::StoreFaultPolicy;
use crate::store::StoreProvider;

#[derive(Clone)]
pub struct AppState<P> {
    pub provider: P,
    pub policy: StoreFaultPolicy,
}

impl<P: StoreProvider> AppState<P> {
    pub fn new(provider: P, policy: StoreFaultPolicy) -> Self {
        Self { provider, policy }
    }

    /// Facade for one record type over the shared provider.
    pub fn resource<R: Record>(&self) -> CrudResource<R, P> {
        CrudResource::new(self.provider.clone()).with_policy(self.policy)
    }
}
