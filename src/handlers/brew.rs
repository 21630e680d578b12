//! Brew-specific lookups built on the named queries.

use crate::entity::{Brew, BrewResource};
use crate::error::AppError;
use crate::response::success_many;
use crate::sql::Parameters;
use crate::store::StoreProvider;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub name: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// GET /api/brews/search?name=… or ?from=…&to=…
pub async fn search<P: StoreProvider>(
    State(resource): State<Arc<BrewResource<P>>>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let (query, bound): (&str, Parameters) = match params {
        SearchParams { name: Some(name), .. } => ("Brew.findByName", [("name".to_string(), Value::String(name))].into()),
        SearchParams {
            from: Some(from),
            to: Some(to),
            ..
        } => (
            "Brew.findBrewedBetween",
            [
                ("from".to_string(), Value::String(from.to_string())),
                ("to".to_string(), Value::String(to.to_string())),
            ]
            .into(),
        ),
        _ => return Err(AppError::BadRequest("search needs name, or both from and to".into())),
    };
    let brews: Vec<Brew> = resource.find_result_list(query, Some(&bound)).await?;
    Ok(success_many(brews))
}

/// GET /api/brews/by-name/:name
pub async fn by_name<P: StoreProvider>(
    State(resource): State<Arc<BrewResource<P>>>,
    Path(name): Path<String>,
) -> Result<Json<Brew>, AppError> {
    let params: Parameters = [("name".to_string(), Value::String(name.clone()))].into();
    resource
        .find_one_result("Brew.findByName", Some(&params))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no brew named {}", name)))
}
