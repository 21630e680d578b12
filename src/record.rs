//! Record trait and the per-type descriptor (table, columns, named queries) handed to stores.

use crate::error::StoreError;
use crate::sql::NamedQuery;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Store-assigned identifier of a record.
pub type RecordId = i64;

/// Name of the identifier column and of the identifier field in record bodies.
pub const ID_COLUMN: &str = "id";

/// A persisted entity managed by the generic CRUD engine.
///
/// The engine only ever looks at the identifier; every other field travels through serde.
/// Fields serialize in camelCase, columns are the snake_case form of the same names.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    fn id(&self) -> Option<RecordId>;
    fn set_id(&mut self, id: RecordId);
    /// Descriptor used to route store operations for this type.
    fn record_type() -> RecordType;
}

#[derive(Clone, Debug)]
pub struct Column {
    pub name: &'static str,
    /// PostgreSQL type name for SQL casts (e.g. "date") when binding JSON values.
    pub pg_type: Option<&'static str>,
}

/// Runtime descriptor of one record type: the token every store adapter is opened with.
#[derive(Clone, Debug)]
pub struct RecordType {
    name: &'static str,
    schema: Option<String>,
    table: String,
    columns: Vec<Column>,
    named_queries: HashMap<String, Arc<NamedQuery>>,
}

impl RecordType {
    /// New descriptor stored in the table named after the lower-cased type name.
    pub fn new(name: &'static str) -> Self {
        RecordType {
            name,
            schema: None,
            table: name.to_lowercase(),
            columns: Vec::new(),
            named_queries: HashMap::new(),
        }
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Declare a non-identifier column.
    pub fn column(mut self, name: &'static str, pg_type: Option<&'static str>) -> Self {
        self.columns.push(Column { name, pg_type });
        self
    }

    pub fn named_query(mut self, query: NamedQuery) -> Self {
        self.named_queries.insert(query.name().to_string(), Arc::new(query));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn schema_name(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Lower-cased type name, used as the XML element of a single record.
    pub fn element_name(&self) -> String {
        self.name.to_lowercase()
    }

    /// Collection path segment: lower-cased type name with an `s` appended ("Brew" -> "brews").
    pub fn path_segment(&self) -> String {
        format!("{}s", self.element_name())
    }

    /// Collection path, e.g. `/api/brews`.
    pub fn collection_path(&self) -> String {
        format!("/api/{}", self.path_segment())
    }

    /// Location of a stored record, e.g. `/api/brews/42`.
    pub fn location(&self, id: RecordId) -> String {
        format!("{}/{}", self.collection_path(), id)
    }

    pub fn query(&self, name: &str) -> Result<Arc<NamedQuery>, StoreError> {
        self.named_queries
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::UnknownQuery(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yeast() -> RecordType {
        RecordType::new("Yeast")
            .column("name", None)
            .column("attenuation", Some("numeric"))
            .named_query(NamedQuery::new("Yeast.findByName", "\"name\" = :name"))
    }

    #[test]
    fn paths_use_lower_cased_plural_name() {
        let ty = yeast();
        assert_eq!(ty.table_name(), "yeast");
        assert_eq!(ty.path_segment(), "yeasts");
        assert_eq!(ty.collection_path(), "/api/yeasts");
        assert_eq!(ty.location(42), "/api/yeasts/42");
    }

    #[test]
    fn unknown_query_is_an_error() {
        let ty = yeast();
        assert!(ty.query("Yeast.findByName").is_ok());
        let err = ty.query("Yeast.findByFlocculation").unwrap_err();
        assert!(matches!(err, StoreError::UnknownQuery(ref n) if n == "Yeast.findByFlocculation"));
    }
}
