//! Routers: per-resource CRUD routes, brew lookups, and operational routes.

mod common;
mod resource;
pub use common::common_routes;
pub use resource::{brew_routes, resource_routes};

use crate::entity::Brew;
use crate::state::AppState;
use crate::store::StoreProvider;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Largest accepted request body.
pub const BODY_LIMIT: usize = 1024 * 1024;

/// Full application router for every served record type.
pub fn app<P: StoreProvider>(state: AppState<P>) -> Router {
    let brews = state.resource::<Brew>();
    Router::new()
        .merge(common_routes(state.provider.clone()))
        .merge(resource_routes(brews.clone()))
        .merge(brew_routes(brews))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(BODY_LIMIT)),
        )
}
