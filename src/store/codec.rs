use crate::case::{keys_to_camel_case, keys_to_snake_case};
use crate::error::StoreError;
use crate::record::Record;
use serde_json::{Map, Value};

/// Record -> snake_case column map.
pub fn to_columns<R: Record>(record: &R) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(record)? {
        Value::Object(body) => Ok(keys_to_snake_case(body)),
        other => Err(StoreError::Fault(format!(
            "{} must serialize to an object, got {}",
            std::any::type_name::<R>(),
            other
        ))),
    }
}

/// snake_case row -> record.
pub fn from_columns<R: Record>(row: Map<String, Value>) -> Result<R, StoreError> {
    Ok(serde_json::from_value(Value::Object(keys_to_camel_case(row)))?)
}
