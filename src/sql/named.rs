//! Named queries: fixed criteria with `:name` placeholders, bound by name before execution.

use crate::error::StoreError;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Placeholder name -> value for one query execution.
pub type Parameters = HashMap<String, Value>;

/// In-memory evaluation of a named query against a record (JSON, camelCase keys).
pub type Matcher = fn(&Value, &Parameters) -> bool;

/// Matches string literals and `::` casts first so their contents are left alone.
fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"'(?:[^']|'')*'|::|:([A-Za-z_][A-Za-z0-9_]*)").expect("placeholder pattern is valid")
    })
}

/// A query registered on a record type under a stable name.
///
/// `criteria` is a SQL boolean expression over the record's columns. Placeholders are rewritten to
/// `$n` once, at construction; a name used twice shares one position.
#[derive(Clone, Debug)]
pub struct NamedQuery {
    name: String,
    sql: String,
    placeholders: Vec<String>,
    order_by: Option<String>,
    matcher: Option<Matcher>,
}

impl NamedQuery {
    pub fn new(name: impl Into<String>, criteria: impl Into<String>) -> Self {
        let criteria: String = criteria.into();
        let mut placeholders: Vec<String> = Vec::new();
        let sql = placeholder_re()
            .replace_all(&criteria, |caps: &Captures| match caps.get(1) {
                Some(m) => {
                    let pos = match placeholders.iter().position(|p| p == m.as_str()) {
                        Some(i) => i + 1,
                        None => {
                            placeholders.push(m.as_str().to_string());
                            placeholders.len()
                        }
                    };
                    format!("${}", pos)
                }
                None => caps[0].to_string(),
            })
            .into_owned();
        NamedQuery {
            name: name.into(),
            sql,
            placeholders,
            order_by: None,
            matcher: None,
        }
    }

    /// ORDER BY clause (without the keywords), e.g. `"date_brewed" DESC`.
    pub fn order_by(mut self, order: impl Into<String>) -> Self {
        self.order_by = Some(order.into());
        self
    }

    /// Predicate used by the in-memory store instead of parameter equality.
    pub fn matching(mut self, matcher: Matcher) -> Self {
        self.matcher = Some(matcher);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Criteria with positional `$n` placeholders.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    pub fn order(&self) -> Option<&str> {
        self.order_by.as_deref()
    }

    pub fn matcher(&self) -> Option<Matcher> {
        self.matcher
    }
}

/// A named query plus the values bound to it for one execution.
#[derive(Clone, Debug)]
pub struct BoundQuery {
    query: Arc<NamedQuery>,
    values: Parameters,
}

impl BoundQuery {
    pub fn new(query: Arc<NamedQuery>) -> Self {
        BoundQuery {
            query,
            values: HashMap::new(),
        }
    }

    pub fn query(&self) -> &NamedQuery {
        &self.query
    }

    pub fn set_parameter(&mut self, name: &str, value: Value) -> Result<&mut Self, StoreError> {
        if !self.query.placeholders.iter().any(|p| p == name) {
            return Err(StoreError::UnknownParameter {
                query: self.query.name.clone(),
                name: name.to_string(),
            });
        }
        self.values.insert(name.to_string(), value);
        Ok(self)
    }

    pub fn parameters(&self) -> &Parameters {
        &self.values
    }

    /// Values in `$n` order. Every placeholder must be bound.
    pub fn positional(&self) -> Result<Vec<Value>, StoreError> {
        self.query
            .placeholders
            .iter()
            .map(|p| {
                self.values.get(p).cloned().ok_or_else(|| StoreError::UnboundParameter {
                    query: self.query.name.clone(),
                    name: p.clone(),
                })
            })
            .collect()
    }
}

/// Bind every entry of `parameters` to `query` by name. `None` and an empty map bind nothing.
pub fn bind_parameters(query: &mut BoundQuery, parameters: Option<&Parameters>) -> Result<(), StoreError> {
    let Some(parameters) = parameters else {
        return Ok(());
    };
    for (name, value) in parameters {
        query.set_parameter(name, value.clone())?;
    }
    Ok(())
}
