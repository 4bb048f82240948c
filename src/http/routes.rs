//! HTTP route definitions

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, Method},
    middleware,
    response::{Json, Response},
    routing::{get, put},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::{resolve_session, MaybeSession};
use crate::config::DataBackend;
use crate::error::AppError;
use crate::http::response::{created, ApiResponse};
use crate::models::{
    ApplicationStatus, ApplicationView, Campaign, CampaignDetails, CampaignListParams,
    CampaignPatch, CampaignStatus, NewApplication, NewCampaign, NewStore, Profile, ProfilePatch,
    Store, StoreDetails, StoreListParams, StorePatch,
};
use crate::services::{CampaignPage, StorePage};
use crate::util::rate_limit::limit_writes;
use crate::util::time::uptime_secs;

type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::PUT,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    // Sessions are resolved for every API route; each data function decides
    // whether it needs one. Layers run bottom-up, so sessions resolve before
    // the write limiter looks the caller up.
    let api_routes = Router::new()
        .route("/stores", get(list_stores_handler).post(create_store_handler))
        .route("/stores/mine", get(my_stores_handler))
        .route("/stores/:id", get(get_store_handler).patch(patch_store_handler))
        .route("/stores/:id/campaigns", get(store_campaigns_handler))
        .route(
            "/campaigns",
            get(list_campaigns_handler).post(create_campaign_handler),
        )
        .route(
            "/campaigns/:id",
            get(get_campaign_handler).patch(patch_campaign_handler),
        )
        .route("/campaigns/:id/status", put(campaign_status_handler))
        .route(
            "/campaigns/:id/applications",
            get(campaign_applications_handler).post(apply_handler),
        )
        .route("/applications/mine", get(my_applications_handler))
        .route("/applications/:id/status", put(application_status_handler))
        .route("/profile", get(my_profile_handler).patch(patch_profile_handler))
        .route("/profiles/:id", get(get_profile_handler))
        .layer(middleware::from_fn_with_state(state.clone(), limit_writes))
        .layer(middleware::from_fn_with_state(state.clone(), resolve_session));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api_routes)
        .layer(TimeoutLayer::new(state.config.request_timeout))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Unwrap a JSON body, reporting decode failures in the error envelope
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::validation(rejection.body_text()))
}

fn path_id(id: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, AppError> {
    id.map(|Path(id)| id)
        .map_err(|rejection| AppError::validation(rejection.body_text()))
}

fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    params
        .map(|Query(params)| params)
        .map_err(|rejection| AppError::validation(rejection.body_text()))
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    backend: &'static str,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        backend: match state.config.data_backend {
            DataBackend::Supabase => "supabase",
            DataBackend::Memory => "memory",
        },
    })
}

// ============================================================================
// Store endpoints
// ============================================================================

async fn list_stores_handler(
    State(state): State<AppState>,
    params: Result<Query<StoreListParams>, QueryRejection>,
) -> ApiResult<StorePage> {
    let page = state.services.stores.get_stores(query_params(params)?).await?;
    Ok(ApiResponse::ok(page))
}

async fn create_store_handler(
    State(state): State<AppState>,
    session: MaybeSession,
    payload: Result<Json<NewStore>, JsonRejection>,
) -> Result<Response, AppError> {
    let store = state
        .services
        .stores
        .create_store(session.session(), json_body(payload)?)
        .await?;
    Ok(created(store))
}

async fn my_stores_handler(
    State(state): State<AppState>,
    session: MaybeSession,
) -> ApiResult<Vec<Store>> {
    let stores = state
        .services
        .stores
        .get_all_user_stores(session.session())
        .await?;
    Ok(ApiResponse::ok(stores))
}

async fn get_store_handler(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StoreDetails> {
    let id = path_id(id)?;
    let store = state
        .services
        .stores
        .get_store_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("store {}", id)))?;
    Ok(ApiResponse::ok(store))
}

async fn patch_store_handler(
    State(state): State<AppState>,
    session: MaybeSession,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<StorePatch>, JsonRejection>,
) -> ApiResult<Store> {
    let id = path_id(id)?;
    let store = state
        .services
        .stores
        .append_store_details(session.session(), id, json_body(payload)?)
        .await?;
    Ok(ApiResponse::ok(store))
}

async fn store_campaigns_handler(
    State(state): State<AppState>,
    session: MaybeSession,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Vec<Campaign>> {
    let id = path_id(id)?;
    let campaigns = state
        .services
        .campaigns
        .get_store_campaigns(session.session(), id)
        .await?;
    Ok(ApiResponse::ok(campaigns))
}

// ============================================================================
// Campaign endpoints
// ============================================================================

#[derive(Deserialize)]
struct CampaignStatusRequest {
    status: CampaignStatus,
}

async fn list_campaigns_handler(
    State(state): State<AppState>,
    params: Result<Query<CampaignListParams>, QueryRejection>,
) -> ApiResult<CampaignPage> {
    let page = state
        .services
        .campaigns
        .get_campaigns(query_params(params)?)
        .await?;
    Ok(ApiResponse::ok(page))
}

async fn create_campaign_handler(
    State(state): State<AppState>,
    session: MaybeSession,
    payload: Result<Json<NewCampaign>, JsonRejection>,
) -> Result<Response, AppError> {
    let campaign = state
        .services
        .campaigns
        .create_campaign(session.session(), json_body(payload)?)
        .await?;
    Ok(created(campaign))
}

async fn get_campaign_handler(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<CampaignDetails> {
    let id = path_id(id)?;
    let campaign = state
        .services
        .campaigns
        .get_campaign_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("campaign {}", id)))?;
    Ok(ApiResponse::ok(campaign))
}

async fn patch_campaign_handler(
    State(state): State<AppState>,
    session: MaybeSession,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CampaignPatch>, JsonRejection>,
) -> ApiResult<Campaign> {
    let id = path_id(id)?;
    let campaign = state
        .services
        .campaigns
        .append_campaign_details(session.session(), id, json_body(payload)?)
        .await?;
    Ok(ApiResponse::ok(campaign))
}

async fn campaign_status_handler(
    State(state): State<AppState>,
    session: MaybeSession,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CampaignStatusRequest>, JsonRejection>,
) -> ApiResult<Campaign> {
    let id = path_id(id)?;
    let CampaignStatusRequest { status } = json_body(payload)?;
    let campaign = state
        .services
        .campaigns
        .update_campaign_status(session.session(), id, status)
        .await?;
    Ok(ApiResponse::ok(campaign))
}

// ============================================================================
// Application endpoints
// ============================================================================

#[derive(Deserialize)]
struct ApplicationStatusRequest {
    #[serde(alias = "applicationStatus")]
    status: ApplicationStatus,
}

async fn apply_handler(
    State(state): State<AppState>,
    session: MaybeSession,
    campaign_id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<NewApplication>, JsonRejection>,
) -> Result<Response, AppError> {
    let campaign_id = path_id(campaign_id)?;
    let application = state
        .services
        .applications
        .apply_to_campaign(session.session(), campaign_id, json_body(payload)?)
        .await?;
    Ok(created(application))
}

async fn campaign_applications_handler(
    State(state): State<AppState>,
    session: MaybeSession,
    campaign_id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Vec<ApplicationView>> {
    let campaign_id = path_id(campaign_id)?;
    let applications = state
        .services
        .applications
        .get_campaign_applications(session.session(), campaign_id)
        .await?;
    Ok(ApiResponse::ok(applications))
}

async fn my_applications_handler(
    State(state): State<AppState>,
    session: MaybeSession,
) -> ApiResult<Vec<ApplicationView>> {
    let applications = state
        .services
        .applications
        .get_my_applications(session.session())
        .await?;
    Ok(ApiResponse::ok(applications))
}

async fn application_status_handler(
    State(state): State<AppState>,
    session: MaybeSession,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ApplicationStatusRequest>, JsonRejection>,
) -> ApiResult<ApplicationView> {
    let id = path_id(id)?;
    let ApplicationStatusRequest { status } = json_body(payload)?;
    let application = state
        .services
        .applications
        .update_application_status(session.session(), id, status)
        .await?;
    Ok(ApiResponse::ok(application))
}

// ============================================================================
// Profile endpoints
// ============================================================================

async fn my_profile_handler(
    State(state): State<AppState>,
    session: MaybeSession,
) -> ApiResult<Profile> {
    let profile = state
        .services
        .profiles
        .ensure_profile(session.session())
        .await?;
    Ok(ApiResponse::ok(profile))
}

async fn patch_profile_handler(
    State(state): State<AppState>,
    session: MaybeSession,
    payload: Result<Json<ProfilePatch>, JsonRejection>,
) -> ApiResult<Profile> {
    let profile = state
        .services
        .profiles
        .update_profile(session.session(), json_body(payload)?)
        .await?;
    Ok(ApiResponse::ok(profile))
}

async fn get_profile_handler(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Profile> {
    let id = path_id(id)?;
    let profile = state
        .services
        .profiles
        .get_profile(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("profile {}", id)))?;
    Ok(ApiResponse::ok(profile))
}
