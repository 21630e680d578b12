//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
    #[error("invalid bind address: {0}")]
    BindAddr(#[from] std::net::AddrParseError),
}

/// Failures raised by a record store adapter.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A single-result query matched no rows.
    #[error("no result for query {0}")]
    NotFound(String),
    #[error("store fault: {0}")]
    Fault(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("unknown named query: {0}")]
    UnknownQuery(String),
    #[error("query {query} has no parameter named '{name}'")]
    UnknownParameter { query: String, name: String },
    #[error("query {query} is missing a value for '{name}'")]
    UnboundParameter { query: String, name: String },
    #[error("record codec: {0}")]
    Codec(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),
    #[error("encode: {0}")]
    Encode(String),
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Encode(e.to_string())
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            AppError::Encode(_) => (StatusCode::INTERNAL_SERVER_ERROR, "encode_error"),
            AppError::Store(e) => match e {
                StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                StoreError::Db(sqlx::Error::RowNotFound) => (StatusCode::NOT_FOUND, "not_found"),
                StoreError::UnknownQuery(_)
                | StoreError::UnknownParameter { .. }
                | StoreError::UnboundParameter { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "query_error"),
                StoreError::Fault(_) | StoreError::Db(_) | StoreError::Codec(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
