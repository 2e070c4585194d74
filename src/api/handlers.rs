use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::model::{AlertRule, Target};
use crate::persistence::{ConfigPaths, LayoutError};
use crate::prometheus::{AlertInstance, QueryData, RemoteError};
use crate::render::{RenderError, RenderedConfig};
use crate::source::{MemorySource, RecordSource, SourceError};
use crate::sync::{SyncError, SyncOutcome, Synchronizer};

/// Application state shared across handlers
pub struct AppState {
    pub synchronizer: Synchronizer,
    pub source: Arc<MemorySource>,
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Render / Sync
// ============================================================================

#[derive(Deserialize)]
pub struct RecordsRequest {
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default)]
    pub rules: Vec<AlertRule>,
}

#[derive(Deserialize)]
pub struct SyncRequest {
    pub tenant: Option<String>,
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default)]
    pub rules: Vec<AlertRule>,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub outcome: &'static str,
    pub message: String,
    pub config: RenderedConfig,
    pub paths: ConfigPaths,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reload_error: Option<String>,
}

impl TryFrom<SyncOutcome> for SyncResponse {
    type Error = ApiError;

    fn try_from(outcome: SyncOutcome) -> Result<Self, ApiError> {
        let kind = outcome.kind();
        match outcome {
            SyncOutcome::FullySynced { config, paths } => Ok(Self {
                outcome: kind,
                message: "Configuration written and Prometheus reloaded".to_string(),
                config,
                paths,
                reload_error: None,
            }),
            SyncOutcome::WrittenNotReloaded {
                config,
                paths,
                error,
            } => Ok(Self {
                outcome: kind,
                message: "Configuration written but Prometheus did not reload; retry POST /reload"
                    .to_string(),
                config,
                paths,
                reload_error: Some(error.to_string()),
            }),
            SyncOutcome::Failed(e) => Err(e.into()),
        }
    }
}

/// Preview the rendered documents without writing them
pub async fn render_preview(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RecordsRequest>, JsonRejection>,
) -> Result<Json<RenderedConfig>, ApiError> {
    let Json(request) = body?;
    let config = state
        .synchronizer
        .render(&request.targets, &request.rules)?;
    Ok(Json(config))
}

pub async fn sync(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SyncRequest>, JsonRejection>,
) -> Result<Json<SyncResponse>, ApiError> {
    let Json(request) = body?;
    let paths = state
        .synchronizer
        .layout()
        .resolve(request.tenant.as_deref())?;

    let outcome = state
        .synchronizer
        .synchronize_at(paths, request.targets, request.rules)
        .await;
    Ok(Json(SyncResponse::try_from(outcome)?))
}

// ============================================================================
// Tenant Records
// ============================================================================

#[derive(Serialize)]
pub struct RecordsResponse {
    pub tenant: String,
    pub targets: usize,
    pub rules: usize,
}

pub async fn put_tenant_records(
    State(state): State<Arc<AppState>>,
    Path(tenant): Path<String>,
    body: Result<Json<RecordsRequest>, JsonRejection>,
) -> Result<Json<RecordsResponse>, ApiError> {
    let Json(request) = body?;
    state.synchronizer.layout().for_tenant(&tenant)?;

    let response = RecordsResponse {
        tenant: tenant.clone(),
        targets: request.targets.len(),
        rules: request.rules.len(),
    };
    state.source.replace(&tenant, request.targets, request.rules);
    Ok(Json(response))
}

#[derive(Serialize)]
pub struct TenantsResponse {
    pub tenants: Vec<String>,
}

pub async fn list_tenants(State(state): State<Arc<AppState>>) -> Json<TenantsResponse> {
    Json(TenantsResponse {
        tenants: state.source.tenants(),
    })
}

/// Forget a tenant's records; already written files stay in place
pub async fn delete_tenant_records(
    State(state): State<Arc<AppState>>,
    Path(tenant): Path<String>,
) -> Result<StatusCode, ApiError> {
    if !state.source.remove_tenant(&tenant) {
        return Err(SourceError::UnknownTenant(tenant).into());
    }
    tracing::info!(tenant = %tenant, "Tenant records removed");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn sync_tenant(
    State(state): State<Arc<AppState>>,
    Path(tenant): Path<String>,
) -> Result<Json<SyncResponse>, ApiError> {
    let snapshot = state.source.snapshot(&tenant)?;

    let outcome = state
        .synchronizer
        .synchronize_tenant(&tenant, snapshot.targets, snapshot.rules)
        .await;
    Ok(Json(SyncResponse::try_from(outcome)?))
}

// ============================================================================
// Prometheus Pass-Through
// ============================================================================

#[derive(Deserialize)]
pub struct TenantQuery {
    pub tenant: Option<String>,
}

pub async fn reload(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>, ApiError> {
    state.synchronizer.reload().await?;
    Ok(Json(serde_json::json!({ "status": "reloaded" })))
}

pub async fn get_config(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let yaml = state.synchronizer.client().fetch_config().await?;
    Ok(Json(serde_json::json!({ "yaml": yaml })))
}

/// Upload a complete scrape document as raw YAML
pub async fn put_config(
    State(state): State<Arc<AppState>>,
    params: Result<Query<TenantQuery>, QueryRejection>,
    body: String,
) -> Result<Json<SyncResponse>, ApiError> {
    let Query(params) = params?;
    let paths = state
        .synchronizer
        .layout()
        .resolve(params.tenant.as_deref())?;

    let outcome = state.synchronizer.apply_raw(paths, body).await;
    Ok(Json(SyncResponse::try_from(outcome)?))
}

#[derive(Serialize)]
pub struct AlertsResponse {
    pub alerts: Vec<AlertInstance>,
}

pub async fn get_alerts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AlertsResponse>, ApiError> {
    let alerts = state.synchronizer.client().fetch_alerts().await?;
    Ok(Json(AlertsResponse { alerts }))
}

#[derive(Deserialize)]
pub struct InstantQuery {
    pub query: String,
    pub time: Option<String>,
}

#[derive(Deserialize)]
pub struct RangeQuery {
    pub query: String,
    pub start: String,
    pub end: String,
    pub step: String,
}

pub async fn query(
    State(state): State<Arc<AppState>>,
    params: Result<Query<InstantQuery>, QueryRejection>,
) -> Result<Json<QueryData>, ApiError> {
    let Query(params) = params?;
    require_query(&params.query)?;
    let data = state
        .synchronizer
        .client()
        .query(&params.query, params.time.as_deref())
        .await?;
    Ok(Json(data))
}

pub async fn query_range(
    State(state): State<Arc<AppState>>,
    params: Result<Query<RangeQuery>, QueryRejection>,
) -> Result<Json<QueryData>, ApiError> {
    let Query(params) = params?;
    require_query(&params.query)?;
    let data = state
        .synchronizer
        .client()
        .query_range(&params.query, &params.start, &params.end, &params.step)
        .await?;
    Ok(Json(data))
}

fn require_query(query: &str) -> Result<(), ApiError> {
    if query.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "query parameter must not be empty".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
    BadGateway(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<LayoutError> for ApiError {
    fn from(e: LayoutError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<RenderError> for ApiError {
    fn from(e: RenderError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<SourceError> for ApiError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::UnknownTenant(_) => ApiError::NotFound(e.to_string()),
        }
    }
}

impl From<RemoteError> for ApiError {
    fn from(e: RemoteError) -> Self {
        ApiError::BadGateway(e.to_string())
    }
}

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Layout(e) => e.into(),
            SyncError::Render(e) => e.into(),
            SyncError::Write(_) | SyncError::Aborted(_) => {
                tracing::error!(error = %e, "Synchronization failed");
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
