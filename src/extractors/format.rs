//! Body format negotiation (JSON or XML) and the record body extractor.

use crate::error::AppError;
use crate::record::Record;
use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, StatusCode},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BodyFormat {
    #[default]
    Json,
    Xml,
}

impl BodyFormat {
    /// Whichever of json/xml the header value names first; JSON when neither appears.
    fn from_header(headers: &HeaderMap, name: header::HeaderName) -> Self {
        let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) else {
            return BodyFormat::Json;
        };
        let value = value.to_ascii_lowercase();
        match (value.find("json"), value.find("xml")) {
            (_, None) => BodyFormat::Json,
            (None, Some(_)) => BodyFormat::Xml,
            (Some(j), Some(x)) if x < j => BodyFormat::Xml,
            _ => BodyFormat::Json,
        }
    }

    pub fn from_content_type(headers: &HeaderMap) -> Self {
        Self::from_header(headers, header::CONTENT_TYPE)
    }

    pub fn from_accept(headers: &HeaderMap) -> Self {
        Self::from_header(headers, header::ACCEPT)
    }

    pub fn content_type(self) -> &'static str {
        match self {
            BodyFormat::Json => "application/json",
            BodyFormat::Xml => "application/xml",
        }
    }
}

/// Response format requested by the `Accept` header.
#[derive(Clone, Copy, Debug)]
pub struct Accepts(pub BodyFormat);

#[async_trait]
impl<S> FromRequestParts<S> for Accepts
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Accepts(BodyFormat::from_accept(&parts.headers)))
    }
}

/// Request body decoded as a record. An empty body (or JSON `null`) is `None`.
#[derive(Debug)]
pub struct RecordBody<R>(pub Option<R>);

#[async_trait]
impl<S, R> FromRequest<S> for RecordBody<R>
where
    S: Send + Sync,
    R: Record,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let format = BodyFormat::from_content_type(req.headers());
        let bytes = Bytes::from_request(req, state).await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                AppError::PayloadTooLarge(e.body_text())
            } else {
                AppError::BadRequest(e.body_text())
            }
        })?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(RecordBody(None));
        }
        let record = match format {
            BodyFormat::Json => serde_json::from_slice::<Option<R>>(&bytes)
                .map_err(|e| AppError::BadRequest(format!("invalid JSON body: {}", e)))?,
            BodyFormat::Xml => {
                let text = std::str::from_utf8(&bytes)
                    .map_err(|e| AppError::BadRequest(format!("invalid XML body: {}", e)))?;
                Some(
                    quick_xml::de::from_str::<R>(text)
                        .map_err(|e| AppError::BadRequest(format!("invalid XML body: {}", e)))?,
                )
            }
        };
        Ok(RecordBody(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(name: header::HeaderName, value: &'static str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(name, HeaderValue::from_static(value));
        h
    }

    #[test]
    fn defaults_to_json() {
        assert_eq!(BodyFormat::from_accept(&HeaderMap::new()), BodyFormat::Json);
        assert_eq!(BodyFormat::from_accept(&headers(header::ACCEPT, "*/*")), BodyFormat::Json);
    }

    #[test]
    fn picks_first_named_format() {
        assert_eq!(
            BodyFormat::from_accept(&headers(header::ACCEPT, "application/xml, application/json")),
            BodyFormat::Xml
        );
        assert_eq!(
            BodyFormat::from_accept(&headers(header::ACCEPT, "application/json;q=0.9, text/xml")),
            BodyFormat::Json
        );
        assert_eq!(
            BodyFormat::from_content_type(&headers(header::CONTENT_TYPE, "text/xml; charset=utf-8")),
            BodyFormat::Xml
        );
    }
}
