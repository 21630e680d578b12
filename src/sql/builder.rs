//! Builds parameterized SELECT, INSERT, UPDATE, DELETE for a record type.

use crate::error::StoreError;
use crate::record::{RecordId, RecordType, ID_COLUMN};
use crate::sql::BoundQuery;
use serde_json::{Map, Value};

/// Quote identifier for PostgreSQL (safe: only from record type definitions).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name; unqualified when no schema applies.
fn qualified_table(schema: Option<&str>, table: &str) -> String {
    match schema {
        Some(schema) => format!("{}.{}", quoted(schema), quoted(table)),
        None => quoted(table),
    }
}

/// Resolve schema: override if present, else the record type's schema.
fn resolve_table(ty: &RecordType, schema_override: Option<&str>) -> String {
    qualified_table(schema_override.or(ty.schema_name()), ty.table_name())
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }
}

/// SELECT list: id first, then declared columns. numeric is read back as float8 so it decodes as a JSON number.
fn select_column_list(ty: &RecordType) -> String {
    let mut cols = vec![quoted(ID_COLUMN)];
    cols.extend(ty.columns().iter().map(|c| {
        let q = quoted(c.name);
        if c.pg_type == Some("numeric") {
            format!("{}::float8 AS {}", q, q)
        } else {
            q
        }
    }));
    cols.join(", ")
}

fn placeholder(n: u32, pg_type: Option<&str>) -> String {
    pg_type
        .map(|t| format!("${}::{}", n, t))
        .unwrap_or_else(|| format!("${}", n))
}

/// SELECT by id. Id is the sole param.
pub fn select_by_id(ty: &RecordType, id: RecordId, schema_override: Option<&str>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(Value::from(id));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = ${}",
        select_column_list(ty),
        resolve_table(ty, schema_override),
        quoted(ID_COLUMN),
        n
    );
    q
}

/// SELECT every row, ORDER BY id.
pub fn select_all(ty: &RecordType, schema_override: Option<&str>) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {} ORDER BY {}",
        select_column_list(ty),
        resolve_table(ty, schema_override),
        quoted(ID_COLUMN)
    );
    q
}

/// SELECT rows matching a bound named query. Falls back to ORDER BY id when the query names no order.
pub fn select_named(ty: &RecordType, bound: &BoundQuery, schema_override: Option<&str>) -> Result<QueryBuf, StoreError> {
    let mut q = QueryBuf::new();
    q.params = bound.positional()?;
    let named = bound.query();
    let order = named
        .order()
        .map(|o| o.to_string())
        .unwrap_or_else(|| quoted(ID_COLUMN));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} ORDER BY {}",
        select_column_list(ty),
        resolve_table(ty, schema_override),
        named.sql(),
        order
    );
    Ok(q)
}

/// INSERT every declared column (missing fields bind NULL), RETURNING id.
/// Uses SQL casts (e.g. $n::date) so string values bind correctly.
pub fn insert(ty: &RecordType, body: &Map<String, Value>, schema_override: Option<&str>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in ty.columns() {
        let val = body.get(c.name).cloned().unwrap_or(Value::Null);
        let n = q.push_param(val);
        cols.push(quoted(c.name));
        placeholders.push(placeholder(n, c.pg_type));
    }
    let table = resolve_table(ty, schema_override);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, quoted(ID_COLUMN))
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            cols.join(", "),
            placeholders.join(", "),
            quoted(ID_COLUMN)
        )
    };
    q
}

/// UPDATE by id, replacing every declared column with the body's value (NULL when missing).
pub fn update(ty: &RecordType, id: RecordId, body: &Map<String, Value>, schema_override: Option<&str>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = resolve_table(ty, schema_override);
    let mut sets = Vec::new();
    for c in ty.columns() {
        let val = body.get(c.name).cloned().unwrap_or(Value::Null);
        let n = q.push_param(val);
        sets.push(format!("{} = {}", quoted(c.name), placeholder(n, c.pg_type)));
    }
    let id_param = q.push_param(Value::from(id));
    if sets.is_empty() {
        sets.push(format!("{} = {}", quoted(ID_COLUMN), quoted(ID_COLUMN)));
    }
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ${}",
        table,
        sets.join(", "),
        quoted(ID_COLUMN),
        id_param
    );
    q
}

/// DELETE by id.
pub fn delete(ty: &RecordType, id: RecordId, schema_override: Option<&str>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(Value::from(id));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = ${}",
        resolve_table(ty, schema_override),
        quoted(ID_COLUMN),
        n
    );
    q
}
