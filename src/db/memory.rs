//! In-memory backend for local development and testing

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use super::backend::{Backend, DbError};
use super::query::{Filter, Query, SortOrder};

/// Tables held as insertion-ordered JSON rows
#[derive(Default)]
pub struct MemoryBackend {
    tables: DashMap<String, Vec<Value>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn matching(&self, table: &str, query: &Query) -> Vec<Value> {
        let mut rows: Vec<Value> = self
            .tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filters.iter().all(|f| matches(row, f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if !query.order.is_empty() {
            rows.sort_by(|a, b| compare_rows(a, b, &query.order));
        }
        rows
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, DbError> {
        Ok(page(self.matching(table, query), query))
    }

    async fn select_page(&self, table: &str, query: &Query) -> Result<(Vec<Value>, u64), DbError> {
        let rows = self.matching(table, query);
        let total = rows.len() as u64;
        Ok((page(rows, query), total))
    }

    async fn count(&self, table: &str, query: &Query) -> Result<u64, DbError> {
        Ok(self.matching(table, query).len() as u64)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, DbError> {
        if !row.is_object() {
            return Err(DbError::Api {
                status: 400,
                body: "row must be a JSON object".to_string(),
            });
        }

        debug!(table, "Memory insert");
        let mut rows = self.tables.entry(table.to_string()).or_default();
        if let Some(id) = row.get("id") {
            if rows.iter().any(|existing| existing.get("id") == Some(id)) {
                return Err(DbError::Api {
                    status: 409,
                    body: format!("duplicate key value violates unique constraint \"{}_pkey\"", table),
                });
            }
        }
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, query: &Query, patch: Value) -> Result<Vec<Value>, DbError> {
        let Value::Object(patch) = patch else {
            return Err(DbError::Api {
                status: 400,
                body: "patch must be a JSON object".to_string(),
            });
        };

        let mut updated = Vec::new();
        if let Some(mut rows) = self.tables.get_mut(table) {
            for row in rows.iter_mut() {
                if !query.filters.iter().all(|f| matches(row, f)) {
                    continue;
                }
                if let Value::Object(fields) = &mut *row {
                    for (column, value) in &patch {
                        fields.insert(column.clone(), value.clone());
                    }
                }
                updated.push(row.clone());
            }
        }

        debug!(table, rows = updated.len(), "Memory update");
        Ok(updated)
    }
}

fn page(rows: Vec<Value>, query: &Query) -> Vec<Value> {
    let offset = query.offset.unwrap_or(0) as usize;
    let limit = query.limit.map(|l| l as usize).unwrap_or(usize::MAX);
    rows.into_iter().skip(offset).take(limit).collect()
}

static NULL: Value = Value::Null;

fn column<'a>(row: &'a Value, name: &str) -> &'a Value {
    row.get(name).unwrap_or(&NULL)
}

fn matches(row: &Value, filter: &Filter) -> bool {
    match filter {
        Filter::Eq(name, value) => column(row, name) == value,
        Filter::Neq(name, value) => column(row, name) != value,
        Filter::In(name, values) => values.contains(column(row, name)),
        Filter::ContainsAny { columns, needle } => {
            let needle = needle.to_lowercase();
            columns.iter().any(|name| {
                column(row, name)
                    .as_str()
                    .map(|s| s.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
        }
    }
}

fn compare_rows(a: &Value, b: &Value, order: &[(String, SortOrder)]) -> Ordering {
    for (name, direction) in order {
        let left = column(a, name);
        let right = column(b, name);
        let ordering = match direction {
            SortOrder::Asc => compare_values(left, right),
            SortOrder::Desc => compare_values(right, left),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Nulls sort first, timestamps chronologically, text case-insensitively
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::String(x), Value::String(y)) => {
            match (
                DateTime::<FixedOffset>::parse_from_rfc3339(x),
                DateTime::<FixedOffset>::parse_from_rfc3339(y),
            ) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x
                    .to_lowercase()
                    .cmp(&y.to_lowercase())
                    .then_with(|| x.cmp(y)),
            }
        }
        _ => a.to_string().cmp(&b.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn seeded() -> MemoryBackend {
        let backend = MemoryBackend::new();
        for row in [
            json!({"id": "1", "name": "banana bread", "kind": "food", "price": 4}),
            json!({"id": "2", "name": "Apple Cider", "kind": "drink", "price": 6}),
            json!({"id": "3", "name": "cherry pie", "kind": "food", "price": null}),
        ] {
            backend.insert("Item", row).await.unwrap();
        }
        backend
    }

    fn ids(rows: &[Value]) -> Vec<&str> {
        rows.iter().map(|r| r["id"].as_str().unwrap()).collect()
    }

    #[tokio::test]
    async fn test_filters_and_case_insensitive_sort() {
        let backend = seeded().await;

        let rows = backend
            .select("Item", &Query::new().order_by("name", SortOrder::Asc))
            .await
            .unwrap();
        assert_eq!(ids(&rows), vec!["2", "1", "3"]);

        let rows = backend
            .select("Item", &Query::new().eq("kind", "food").neq("id", "3"))
            .await
            .unwrap();
        assert_eq!(ids(&rows), vec!["1"]);

        let rows = backend
            .select("Item", &Query::new().one_of("id", &["1", "3"]))
            .await
            .unwrap();
        assert_eq!(ids(&rows), vec!["1", "3"]);
    }

    #[tokio::test]
    async fn test_contains_any_ignores_case() {
        let backend = seeded().await;
        let rows = backend
            .select("Item", &Query::new().contains_any(&["name", "kind"], "CIDER"))
            .await
            .unwrap();
        assert_eq!(ids(&rows), vec!["2"]);

        let rows = backend
            .select("Item", &Query::new().contains_any(&["name"], "cher*ry"))
            .await
            .unwrap();
        assert_eq!(ids(&rows), vec!["3"]);
    }

    #[tokio::test]
    async fn test_duplicate_id_conflicts() {
        let backend = seeded().await;
        let err = backend
            .insert("Item", json!({"id": "1", "name": "again"}))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(backend.count("Item", &Query::new()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_select_page_counts_before_paging() {
        let backend = seeded().await;
        let query = Query::new()
            .order_by("price", SortOrder::Desc)
            .offset(1)
            .limit(1);
        let (rows, total) = backend.select_page("Item", &query).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(ids(&rows), vec!["1"]);
    }

    #[tokio::test]
    async fn test_timestamps_sort_chronologically() {
        let backend = MemoryBackend::new();
        backend
            .insert("Log", json!({"id": "whole", "at": "2026-01-01T00:00:00Z"}))
            .await
            .unwrap();
        backend
            .insert("Log", json!({"id": "half", "at": "2026-01-01T00:00:00.5Z"}))
            .await
            .unwrap();
        let rows = backend
            .select("Log", &Query::new().order_by("at", SortOrder::Asc))
            .await
            .unwrap();
        // lexically "...00.5Z" < "...00Z"
        assert_eq!(ids(&rows), vec!["whole", "half"]);
    }

    #[tokio::test]
    async fn test_update_merges_columns() {
        let backend = seeded().await;
        let updated = backend
            .update("Item", &Query::new().eq("id", "3"), json!({"price": 9}))
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0]["name"], "cherry pie");
        assert_eq!(updated[0]["price"], 9);
        assert_eq!(backend.count("Item", &Query::new().eq("price", 9)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_table_is_empty() {
        let backend = MemoryBackend::new();
        assert!(backend.select("Nope", &Query::new()).await.unwrap().is_empty());
        assert_eq!(backend.count("Nope", &Query::new()).await.unwrap(), 0);
    }
}
