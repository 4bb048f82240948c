//! Backend-neutral row query (filters, ordering, paging)
//!
//! A `Query` is rendered to PostgREST query parameters by the Supabase
//! backend and evaluated directly by the in-memory backend, so both see the
//! same filter semantics.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// A single row predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Column equals value
    Eq(String, Value),
    /// Column differs from value
    Neq(String, Value),
    /// Column is one of the values
    In(String, Vec<Value>),
    /// Case-insensitive substring match over any of the columns
    ContainsAny { columns: Vec<String>, needle: String },
}

/// Row query against a single table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Vec<(String, SortOrder)>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Serialize) -> Self {
        self.filters
            .push(Filter::Eq(column.to_string(), to_filter_value(value)));
        self
    }

    pub fn neq(mut self, column: &str, value: impl Serialize) -> Self {
        self.filters
            .push(Filter::Neq(column.to_string(), to_filter_value(value)));
        self
    }

    pub fn one_of<T: Serialize>(mut self, column: &str, values: &[T]) -> Self {
        let values = values.iter().map(to_filter_value).collect();
        self.filters.push(Filter::In(column.to_string(), values));
        self
    }

    /// Case-insensitive substring search across `columns`.
    /// `*` is PostgREST's wildcard, so it is dropped from the needle for every
    /// backend. Blank needles add no filter.
    pub fn contains_any(mut self, columns: &[&str], needle: &str) -> Self {
        let needle = needle.replace('*', "");
        let needle = needle.trim();
        if !needle.is_empty() {
            self.filters.push(Filter::ContainsAny {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                needle: needle.to_string(),
            });
        }
        self
    }

    pub fn order_by(mut self, column: &str, order: SortOrder) -> Self {
        self.order.push((column.to_string(), order));
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Render as PostgREST query parameters
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();

        for filter in &self.filters {
            match filter {
                Filter::Eq(column, value) => {
                    params.push((column.clone(), format!("eq.{}", value_to_param(value))));
                }
                Filter::Neq(column, value) => {
                    params.push((column.clone(), format!("neq.{}", value_to_param(value))));
                }
                Filter::In(column, values) => {
                    let list = values
                        .iter()
                        .map(|v| quote(&value_to_param(v)))
                        .collect::<Vec<_>>()
                        .join(",");
                    params.push((column.clone(), format!("in.({})", list)));
                }
                Filter::ContainsAny { columns, needle } => {
                    let pattern = quote(&format!("*{}*", escape_like(needle)));
                    let clauses = columns
                        .iter()
                        .map(|c| format!("{}.ilike.{}", c, pattern))
                        .collect::<Vec<_>>()
                        .join(",");
                    params.push(("or".to_string(), format!("({})", clauses)));
                }
            }
        }

        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|(c, o)| format!("{}.{}", c, o.as_str()))
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order".to_string(), order));
        }

        if let Some(offset) = self.offset {
            params.push(("offset".to_string(), offset.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        params
    }
}

fn to_filter_value(value: impl Serialize) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn value_to_param(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Double-quote a PostgREST list/logic operand so reserved characters survive
fn quote(raw: &str) -> String {
    let escaped = raw.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// `%`/`_` are LIKE wildcards and must not leak from user input into the pattern
fn escape_like(needle: &str) -> String {
    needle
        .replace('%', "\\%")
        .replace('_', "\\_")
}
