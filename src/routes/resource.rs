use crate::entity::BrewResource;
use crate::handlers::{self, brew};
use crate::record::Record;
use crate::resource::CrudResource;
use crate::store::StoreProvider;
use axum::{routing::get, Router};
use std::sync::Arc;

/// `/api/{type}s` (list, create) and `/api/{type}s/:id` (read, update, delete) for one record type.
pub fn resource_routes<R: Record, P: StoreProvider>(resource: CrudResource<R, P>) -> Router {
    let collection = resource.record_type().collection_path();
    Router::new()
        .route(
            &collection,
            get(handlers::list::<R, P>).post(handlers::create::<R, P>),
        )
        .route(
            &format!("{}/:id", collection),
            get(handlers::read::<R, P>)
                .put(handlers::update::<R, P>)
                .delete(handlers::delete::<R, P>),
        )
        .with_state(Arc::new(resource))
}

pub fn brew_routes<P: StoreProvider>(resource: BrewResource<P>) -> Router {
    let collection = resource.record_type().collection_path();
    Router::new()
        .route(&format!("{}/search", collection), get(brew::search::<P>))
        .route(&format!("{}/by-name/:name", collection), get(brew::by_name::<P>))
        .with_state(Arc::new(resource))
}
