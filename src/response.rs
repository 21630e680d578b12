//! Engine results and their rendering as JSON or XML HTTP responses.

use crate::error::{AppError, ErrorBody, ErrorDetail};
use crate::extractors::BodyFormat;
use crate::record::RecordType;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, PartialEq)]
pub enum Payload<R> {
    Empty,
    /// Human-readable explanation of a rejected call.
    Message(String),
    One(R),
    Many(Vec<R>),
}

/// Outcome of one CRUD operation: status, optional `Location`, payload.
#[derive(Debug, PartialEq)]
pub struct CrudResponse<R> {
    pub status: StatusCode,
    pub location: Option<String>,
    pub payload: Payload<R>,
}

impl<R> CrudResponse<R> {
    pub fn empty(status: StatusCode) -> Self {
        CrudResponse {
            status,
            location: None,
            payload: Payload::Empty,
        }
    }

    pub fn message(status: StatusCode, message: impl Into<String>) -> Self {
        CrudResponse {
            status,
            location: None,
            payload: Payload::Message(message.into()),
        }
    }

    pub fn created(location: String) -> Self {
        CrudResponse {
            status: StatusCode::CREATED,
            location: Some(location),
            payload: Payload::Empty,
        }
    }

    pub fn ok_one(record: R) -> Self {
        CrudResponse {
            status: StatusCode::OK,
            location: None,
            payload: Payload::One(record),
        }
    }

    pub fn ok_many(records: Vec<R>) -> Self {
        CrudResponse {
            status: StatusCode::OK,
            location: None,
            payload: Payload::Many(records),
        }
    }
}

/// Snake-cased reason phrase, e.g. 400 -> "bad_request".
fn status_code_name(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("error")
        .to_lowercase()
        .replace(' ', "_")
}

fn xml<T: Serialize>(root: &str, value: &T) -> Result<String, AppError> {
    quick_xml::se::to_string_with_root(root, value).map_err(|e| AppError::Encode(e.to_string()))
}

impl<R: Serialize> CrudResponse<R> {
    /// Render with the negotiated format. XML roots come from the record type's names.
    pub fn render(self, format: BodyFormat, record_type: &RecordType) -> Result<Response, AppError> {
        let body = match (&self.payload, format) {
            (Payload::Empty, _) => None,
            (Payload::Message(message), BodyFormat::Json) => Some(serde_json::to_string(&ErrorBody {
                error: ErrorDetail {
                    code: status_code_name(self.status),
                    message: message.clone(),
                    details: None,
                },
            })?),
            (Payload::Message(message), BodyFormat::Xml) => Some(xml(
                "error",
                &ErrorDetail {
                    code: status_code_name(self.status),
                    message: message.clone(),
                    details: None,
                },
            )?),
            (Payload::One(record), BodyFormat::Json) => Some(serde_json::to_string(record)?),
            (Payload::One(record), BodyFormat::Xml) => Some(xml(&record_type.element_name(), record)?),
            (Payload::Many(records), BodyFormat::Json) => Some(serde_json::to_string(records)?),
            (Payload::Many(records), BodyFormat::Xml) => {
                let element = record_type.element_name();
                let mut out = format!("<{}>", record_type.path_segment());
                for record in records {
                    out.push_str(&xml(&element, record)?);
                }
                out.push_str(&format!("</{}>", record_type.path_segment()));
                Some(out)
            }
        };

        let mut response = match body {
            Some(body) => (
                self.status,
                [(header::CONTENT_TYPE, HeaderValue::from_static(format.content_type()))],
                body,
            )
                .into_response(),
            None => self.status.into_response(),
        };
        if let Some(location) = self.location {
            let value = HeaderValue::from_str(&location).map_err(|e| AppError::Encode(e.to_string()))?;
            response.headers_mut().insert(header::LOCATION, value);
        }
        Ok(response)
    }
}

/// JSON list body used by the specialized query routes.
pub fn success_many<T: Serialize>(data: Vec<T>) -> (StatusCode, Json<Vec<T>>) {
    (StatusCode::OK, Json(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Grain {
        id: Option<i64>,
        name: String,
    }

    fn grain_type() -> RecordType {
        RecordType::new("Grain")
    }

    async fn body_text(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn created_sets_location_without_body() {
        let resp = CrudResponse::<Grain>::created("/api/grains/42".into())
            .render(BodyFormat::Json, &grain_type())
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(resp.headers()[header::LOCATION], "/api/grains/42");
        assert!(body_text(resp).await.is_empty());
    }

    #[tokio::test]
    async fn message_uses_error_envelope() {
        let resp = CrudResponse::<Grain>::message(StatusCode::BAD_REQUEST, "use update instead")
            .render(BodyFormat::Json, &grain_type())
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(json["error"]["code"], "bad_request");
        assert_eq!(json["error"]["message"], "use update instead");
    }

    #[tokio::test]
    async fn xml_lists_wrap_records_in_plural_root() {
        let records = vec![
            Grain { id: Some(1), name: "Pilsner".into() },
            Grain { id: Some(2), name: "Munich".into() },
        ];
        let resp = CrudResponse::ok_many(records)
            .render(BodyFormat::Xml, &grain_type())
            .unwrap();
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/xml");
        let text = body_text(resp).await;
        assert!(text.starts_with("<grains><grain>"));
        assert!(text.contains("<name>Munich</name>"));
        assert!(text.ends_with("</grain></grains>"));
    }
}
