//! Typed API client with a keyed read cache
//!
//! Reads go through [`QueryCache`] under keys such as `stores:list:<query>`,
//! `stores:<id>` and `profile:me:<scope>`. Reads that depend on the caller
//! carry a scope derived from the bearer token, so clones signed in as
//! different users never share those entries. Mutations always hit the
//! server and leave the cache alone; call [`AdscodClient::invalidate`] with
//! a key prefix once a write should be visible to later reads.

pub mod cache;

pub use cache::QueryCache;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use crate::http::ApiResponse;
use crate::models::{
    ApplicationStatus, ApplicationView, Campaign, CampaignDetails, CampaignListParams, CampaignPatch,
    CampaignStatus, NewCampaign, NewStore, Profile, ProfilePatch, Store, StoreDetails,
    StoreListParams, StorePatch,
};
use crate::services::{CampaignPage, StorePage};

const DEFAULT_STALE_TIME: Duration = Duration::from_secs(60);
const ANONYMOUS_SCOPE: &str = "anon";

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Client for the Adscod API; clones share one cache
#[derive(Clone)]
pub struct AdscodClient {
    http: Client,
    base_url: String,
    token: Option<String>,
    scope: String,
    cache: Arc<QueryCache>,
}

impl AdscodClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            scope: ANONYMOUS_SCOPE.to_string(),
            cache: Arc::new(QueryCache::new(DEFAULT_STALE_TIME)),
        }
    }

    /// Replace the cache with one using `stale_time`
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.cache = Arc::new(QueryCache::new(stale_time));
        self
    }

    /// Send `token` as the bearer session on every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.scope = token_scope(&token);
        self.token = Some(token);
        self
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Drop cached reads whose key starts with `prefix`
    pub fn invalidate(&self, prefix: &str) -> usize {
        self.cache.invalidate(prefix)
    }

    // ------------------------------------------------------------------
    // Stores
    // ------------------------------------------------------------------

    pub async fn list_stores(&self, params: &StoreListParams) -> Result<StorePage, ClientError> {
        let key = list_key("stores", params)?;
        self.cached(key, || self.request(Method::GET, "/api/stores").query(params))
            .await
    }

    pub async fn get_store(&self, id: Uuid) -> Result<StoreDetails, ClientError> {
        let path = format!("/api/stores/{}", id);
        self.cached(format!("stores:{}", id), || self.request(Method::GET, &path))
            .await
    }

    pub async fn my_stores(&self) -> Result<Vec<Store>, ClientError> {
        self.cached(self.scoped("stores:mine"), || {
            self.request(Method::GET, "/api/stores/mine")
        })
        .await
    }

    pub async fn create_store(&self, input: &NewStore) -> Result<Store, ClientError> {
        self.send(self.request(Method::POST, "/api/stores").json(input))
            .await
    }

    pub async fn update_store(&self, id: Uuid, patch: &StorePatch) -> Result<Store, ClientError> {
        let path = format!("/api/stores/{}", id);
        self.send(self.request(Method::PATCH, &path).json(patch)).await
    }

    // ------------------------------------------------------------------
    // Campaigns
    // ------------------------------------------------------------------

    pub async fn list_campaigns(
        &self,
        params: &CampaignListParams,
    ) -> Result<CampaignPage, ClientError> {
        let key = list_key("campaigns", params)?;
        self.cached(key, || {
            self.request(Method::GET, "/api/campaigns").query(params)
        })
        .await
    }

    pub async fn get_campaign(&self, id: Uuid) -> Result<CampaignDetails, ClientError> {
        let path = format!("/api/campaigns/{}", id);
        self.cached(format!("campaigns:{}", id), || self.request(Method::GET, &path))
            .await
    }

    pub async fn store_campaigns(&self, store_id: Uuid) -> Result<Vec<Campaign>, ClientError> {
        let path = format!("/api/stores/{}/campaigns", store_id);
        self.cached(self.scoped(&format!("campaigns:store:{}", store_id)), || {
            self.request(Method::GET, &path)
        })
        .await
    }

    pub async fn create_campaign(&self, input: &NewCampaign) -> Result<Campaign, ClientError> {
        self.send(self.request(Method::POST, "/api/campaigns").json(input))
            .await
    }

    pub async fn update_campaign(
        &self,
        id: Uuid,
        patch: &CampaignPatch,
    ) -> Result<Campaign, ClientError> {
        let path = format!("/api/campaigns/{}", id);
        self.send(self.request(Method::PATCH, &path).json(patch)).await
    }

    pub async fn set_campaign_status(
        &self,
        id: Uuid,
        status: CampaignStatus,
    ) -> Result<Campaign, ClientError> {
        let path = format!("/api/campaigns/{}/status", id);
        self.send(
            self.request(Method::PUT, &path)
                .json(&json!({ "status": status })),
        )
        .await
    }

    // ------------------------------------------------------------------
    // Applications
    // ------------------------------------------------------------------

    pub async fn apply(
        &self,
        campaign_id: Uuid,
        message: Option<&str>,
    ) -> Result<ApplicationView, ClientError> {
        let path = format!("/api/campaigns/{}/applications", campaign_id);
        self.send(
            self.request(Method::POST, &path)
                .json(&json!({ "message": message })),
        )
        .await
    }

    pub async fn campaign_applications(
        &self,
        campaign_id: Uuid,
    ) -> Result<Vec<ApplicationView>, ClientError> {
        let path = format!("/api/campaigns/{}/applications", campaign_id);
        self.cached(self.scoped(&format!("applications:campaign:{}", campaign_id)), || {
            self.request(Method::GET, &path)
        })
        .await
    }

    pub async fn my_applications(&self) -> Result<Vec<ApplicationView>, ClientError> {
        self.cached(self.scoped("applications:mine"), || {
            self.request(Method::GET, "/api/applications/mine")
        })
        .await
    }

    pub async fn set_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> Result<ApplicationView, ClientError> {
        let path = format!("/api/applications/{}/status", id);
        self.send(
            self.request(Method::PUT, &path)
                .json(&json!({ "status": status })),
        )
        .await
    }

    // ------------------------------------------------------------------
    // Profiles
    // ------------------------------------------------------------------

    pub async fn my_profile(&self) -> Result<Profile, ClientError> {
        self.cached(self.scoped("profile:me"), || {
            self.request(Method::GET, "/api/profile")
        })
        .await
    }

    pub async fn update_profile(&self, patch: &ProfilePatch) -> Result<Profile, ClientError> {
        self.send(self.request(Method::PATCH, "/api/profile").json(patch))
            .await
    }

    pub async fn get_profile(&self, id: Uuid) -> Result<Profile, ClientError> {
        let path = format!("/api/profiles/{}", id);
        self.cached(format!("profiles:{}", id), || self.request(Method::GET, &path))
            .await
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    /// Cache key for a read whose answer depends on who is asking
    fn scoped(&self, key: &str) -> String {
        format!("{}:{}", key, self.scope)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Serve `key` from the cache, or fetch it and cache the payload
    async fn cached<T, F>(&self, key: String, build: F) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        F: FnOnce() -> RequestBuilder,
    {
        if let Some(value) = self.cache.get(&key) {
            debug!(key = %key, "Cache hit");
            return Ok(serde_json::from_value(value)?);
        }

        let value: Value = self.send(build()).await?;
        let decoded = serde_json::from_value(value.clone())?;
        self.cache.put(key, value);
        Ok(decoded)
    }

    /// Send a request and unwrap the `{success, data}` envelope
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        let envelope: ApiResponse<Value> = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(ClientError::Api {
                    status: status.as_u16(),
                    message: String::from_utf8_lossy(&body).into_owned(),
                })
            }
            Err(err) => return Err(err.into()),
        };

        if !envelope.success || !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: envelope
                    .error
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string()),
            });
        }

        Ok(serde_json::from_value(
            envelope.data.unwrap_or(Value::Null),
        )?)
    }
}

/// Short digest of a bearer token; the token itself never lands in a key
fn token_scope(token: &str) -> String {
    Sha256::digest(token.as_bytes())
        .iter()
        .take(8)
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

/// Cache key for a list read; the serialized params tell pages apart
fn list_key<P: Serialize>(prefix: &str, params: &P) -> Result<String, ClientError> {
    Ok(format!("{}:list:{}", prefix, serde_json::to_string(params)?))
}
