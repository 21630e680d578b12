//! Generic CRUD handlers. Each takes the record's facade as state and renders in the negotiated format.

use crate::error::AppError;
use crate::extractors::{Accepts, RecordBody};
use crate::record::{Record, RecordId};
use crate::resource::CrudResource;
use crate::store::StoreProvider;
use axum::{
    extract::{Path, State},
    response::Response,
};
use std::sync::Arc;

/// A path id that is not an integer counts as no id at all.
fn parse_id(raw: &str) -> Option<RecordId> {
    raw.trim().parse().ok()
}

pub async fn create<R: Record, P: StoreProvider>(
    State(resource): State<Arc<CrudResource<R, P>>>,
    Accepts(format): Accepts,
    RecordBody(record): RecordBody<R>,
) -> Result<Response, AppError> {
    resource.create(record).await?.render(format, resource.record_type())
}

pub async fn read<R: Record, P: StoreProvider>(
    State(resource): State<Arc<CrudResource<R, P>>>,
    Accepts(format): Accepts,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    resource.retrieve(parse_id(&id)).await?.render(format, resource.record_type())
}

pub async fn list<R: Record, P: StoreProvider>(
    State(resource): State<Arc<CrudResource<R, P>>>,
    Accepts(format): Accepts,
) -> Result<Response, AppError> {
    resource.retrieve_all().await?.render(format, resource.record_type())
}

pub async fn update<R: Record, P: StoreProvider>(
    State(resource): State<Arc<CrudResource<R, P>>>,
    Accepts(format): Accepts,
    Path(id): Path<String>,
    RecordBody(record): RecordBody<R>,
) -> Result<Response, AppError> {
    resource
        .update(parse_id(&id), record)
        .await?
        .render(format, resource.record_type())
}

pub async fn delete<R: Record, P: StoreProvider>(
    State(resource): State<Arc<CrudResource<R, P>>>,
    Accepts(format): Accepts,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    resource.delete(parse_id(&id)).await?.render(format, resource.record_type())
}
