//! Supabase REST (PostgREST) backend using the service_role key

use async_trait::async_trait;
use reqwest::{header::CONTENT_RANGE, Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::debug;

use super::backend::{Backend, DbError};
use super::query::Query;
use crate::config::SupabaseConfig;

/// Supabase client for server-side database operations
/// Uses service_role key which bypasses RLS - every data function
/// enforces ownership itself.
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_role_key: String,
}

impl SupabaseClient {
    pub fn new(config: &SupabaseConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            service_role_key: config.service_role_key.clone(),
        }
    }

    /// Get the REST API URL for a table
    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Authenticated request builder for a table
    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, self.rest_url(table))
            .header("apikey", &self.service_role_key)
            .header("Authorization", format!("Bearer {}", self.service_role_key))
            .header("Content-Type", "application/json")
    }

    async fn send(builder: RequestBuilder) -> Result<Response, DbError> {
        let response = builder.send().await.map_err(DbError::Request)?;
        Self::check(response).await
    }

    async fn check(response: Response) -> Result<Response, DbError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DbError::Api { status: status.as_u16(), body });
        }

        Ok(response)
    }

    async fn rows(response: Response) -> Result<Vec<Value>, DbError> {
        response.json().await.map_err(DbError::Request)
    }
}

#[async_trait]
impl Backend for SupabaseClient {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, DbError> {
        debug!(table, "PostgREST select");
        let response = Self::send(self.request(Method::GET, table).query(&query.to_params())).await?;
        Self::rows(response).await
    }

    async fn select_page(&self, table: &str, query: &Query) -> Result<(Vec<Value>, u64), DbError> {
        debug!(table, "PostgREST select with count");
        let response = self
            .request(Method::GET, table)
            .header("Prefer", "count=exact")
            .query(&query.to_params())
            .send()
            .await
            .map_err(DbError::Request)?;

        if let Some(total) = past_last_page_total(response.status(), content_range(&response)) {
            debug!(table, total, "Offset past the last row, returning an empty page");
            return Ok((Vec::new(), total));
        }

        let response = Self::check(response).await?;
        let total = content_range_total(&response).ok_or(DbError::MissingCount)?;
        let rows = Self::rows(response).await?;
        Ok((rows, total))
    }

    async fn count(&self, table: &str, query: &Query) -> Result<u64, DbError> {
        let mut params = query.to_params();
        params.push(("select".to_string(), "id".to_string()));

        let response = Self::send(
            self.request(Method::HEAD, table)
                .header("Prefer", "count=exact")
                .query(&params),
        )
        .await?;

        content_range_total(&response).ok_or(DbError::MissingCount)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, DbError> {
        debug!(table, "PostgREST insert");
        let response = Self::send(
            self.request(Method::POST, table)
                .header("Prefer", "return=representation")
                .json(&row),
        )
        .await?;

        // PostgREST returns an array, get first element
        Self::rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or(DbError::NoRowReturned)
    }

    async fn update(&self, table: &str, query: &Query, patch: Value) -> Result<Vec<Value>, DbError> {
        debug!(table, "PostgREST update");
        let response = Self::send(
            self.request(Method::PATCH, table)
                .header("Prefer", "return=representation")
                .query(&query.to_params())
                .json(&patch),
        )
        .await?;

        Self::rows(response).await
    }
}

fn content_range(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
}

fn content_range_total(response: &Response) -> Option<u64> {
    content_range(response).and_then(parse_content_range_total)
}

/// PostgREST answers `416` with `Content-Range: */<total>` when the offset
/// lies past the last matching row; that is an empty page, not a failure.
fn past_last_page_total(status: StatusCode, content_range: Option<&str>) -> Option<u64> {
    if status != StatusCode::RANGE_NOT_SATISFIABLE {
        return None;
    }
    content_range.and_then(parse_content_range_total)
}

/// Total from a PostgREST `Content-Range` value such as `0-9/42` or `*/0`
pub fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_range_total() {
        assert_eq!(parse_content_range_total("0-9/42"), Some(42));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-9/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }

    #[test]
    fn test_offset_past_last_row_is_an_empty_page() {
        assert_eq!(
            past_last_page_total(StatusCode::RANGE_NOT_SATISFIABLE, Some("*/7")),
            Some(7)
        );
        assert_eq!(
            past_last_page_total(StatusCode::RANGE_NOT_SATISFIABLE, None),
            None
        );
        assert_eq!(past_last_page_total(StatusCode::OK, Some("0-2/7")), None);
        assert_eq!(
            past_last_page_total(StatusCode::INTERNAL_SERVER_ERROR, Some("*/7")),
            None
        );
    }

    #[test]
    fn test_rest_url_strips_trailing_slash() {
        let client = SupabaseClient::new(&SupabaseConfig {
            url: "https://project.supabase.co/".to_string(),
            service_role_key: "key".to_string(),
        });
        assert_eq!(
            client.rest_url("Store"),
            "https://project.supabase.co/rest/v1/Store"
        );
    }
}
