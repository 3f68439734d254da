// 🌐 Serving Boundary - HTTP routes over the Response Assembler
//
// Handlers stay thin: parse the query, ask the assembler, map ApiError to a
// status code. Snapshot bodies go out verbatim. Assembly may read snapshot
// files, so it runs on the blocking pool.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::assembler::{Assembled, ResponseAssembler};
use crate::error::{ApiError, ErrorCategory};
use crate::query::{self, EntryQuery, RawEntryParams, RawReviewParams};
use crate::query::{DEFAULT_ALL_ENTRY_LIMIT, DEFAULT_REGION_ENTRY_LIMIT};

pub const SERVICE_NAME: &str = "Region Satisfaction API";

pub const AVAILABLE_ENDPOINTS: [&str; 10] = [
    "GET /api/satisfaction/overall",
    "GET /api/satisfaction/states",
    "GET /api/satisfaction/state/:stateName",
    "GET /api/state/:stateName/entries",
    "GET /api/state/:stateName/statistics",
    "GET /api/entries/all",
    "GET /api/states/list",
    "GET /api/reviews",
    "GET /api/health",
    "POST /api/admin/reload",
];

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub assembler: Arc<ResponseAssembler>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(assembler: ResponseAssembler) -> Self {
        Self {
            assembler: Arc::new(assembler),
            started_at: Instant::now(),
        }
    }
}

// ============================================================================
// ERROR MAPPING
// ============================================================================

impl ErrorCategory {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
            ErrorCategory::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCategory::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.category().status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "Request failed");
        }
        (status, Json(self.body(Utc::now()))).into_response()
    }
}

impl<T: Serialize> IntoResponse for Assembled<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/satisfaction/overall", get(overall_handler))
        .route("/api/satisfaction/states", get(all_regions_handler))
        .route("/api/satisfaction/state/:state_name", get(region_handler))
        .route("/api/state/:state_name/entries", get(region_entries_handler))
        .route("/api/state/:state_name/statistics", get(region_statistics_handler))
        .route("/api/entries/all", get(all_entries_handler))
        .route("/api/states/list", get(region_list_handler))
        .route("/api/reviews", get(reviews_handler))
        .route("/api/health", get(health_handler))
        .route("/api/admin/reload", post(reload_handler))
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// HANDLERS
// ============================================================================

/// Run an assembler call off the async workers
async fn assemble<T, F>(state: &AppState, build: F) -> Result<T, ApiError>
where
    F: FnOnce(&ResponseAssembler) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let assembler = Arc::clone(&state.assembler);
    tokio::task::spawn_blocking(move || build(&assembler))
        .await
        .map_err(|e| ApiError::Internal(format!("Assembly task failed: {e}")))?
}

/// GET /api/satisfaction/overall
async fn overall_handler(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    assemble(&state, |a| a.overall()).await
}

/// GET /api/satisfaction/states
async fn all_regions_handler(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    assemble(&state, |a| a.all_regions()).await
}

/// GET /api/satisfaction/state/:stateName
async fn region_handler(
    State(state): State<AppState>,
    Path(state_name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    assemble(&state, move |a| a.region(&state_name)).await
}

/// GET /api/state/:stateName/entries
async fn region_entries_handler(
    State(state): State<AppState>,
    Path(state_name): Path<String>,
    Query(params): Query<RawEntryParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = EntryQuery::parse(&params, DEFAULT_REGION_ENTRY_LIMIT)?;
    assemble(&state, move |a| a.region_entries(&state_name, &query)).await
}

/// GET /api/state/:stateName/statistics
async fn region_statistics_handler(
    State(state): State<AppState>,
    Path(state_name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    assemble(&state, move |a| a.region_statistics(&state_name)).await
}

/// GET /api/entries/all
async fn all_entries_handler(
    State(state): State<AppState>,
    Query(params): Query<RawEntryParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = EntryQuery::parse(&params, DEFAULT_ALL_ENTRY_LIMIT)?;
    assemble(&state, move |a| a.all_entries(&query)).await
}

/// GET /api/states/list
async fn region_list_handler(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    assemble(&state, |a| Ok(a.region_keys())).await
}

/// GET /api/reviews
async fn reviews_handler(
    State(state): State<AppState>,
    Query(params): Query<RawReviewParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query::review_limit(params.limit.as_deref())?;
    assemble(&state, move |a| Ok(a.reviews(limit))).await
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    states_loaded: usize,
    data_load_error: Option<String>,
    timestamp: chrono::DateTime<Utc>,
    uptime: f64,
}

/// GET /api/health - 200 when data is loaded and the last load succeeded
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let health = state.assembler.registry().health();
    let status = if health.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = HealthResponse {
        status: if health.healthy { "healthy" } else { "unhealthy" },
        service: SERVICE_NAME,
        version: crate::VERSION,
        states_loaded: health.regions_loaded,
        data_load_error: health.last_error,
        timestamp: Utc::now(),
        uptime: state.started_at.elapsed().as_secs_f64(),
    };

    (status, Json(body))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReloadResponse {
    success: bool,
    message: &'static str,
    states_loaded: usize,
    error: Option<String>,
}

/// POST /api/admin/reload - always 200; `success` carries the outcome
async fn reload_handler(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let registry = Arc::clone(state.assembler.registry());

    // File reads and parsing block; keep them off the async workers
    let outcome = tokio::task::spawn_blocking(move || registry.reload())
        .await
        .map_err(|e| ApiError::Internal(format!("Reload task failed: {e}")))?;

    info!(success = outcome.success, regions = outcome.regions_loaded, "Reload requested");

    Ok(Json(ReloadResponse {
        success: outcome.success,
        message: if outcome.success {
            "Data reloaded successfully"
        } else {
            "Failed to reload data"
        },
        states_loaded: outcome.regions_loaded,
        error: outcome.error,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NotFoundResponse {
    success: bool,
    error: &'static str,
    message: String,
    available_endpoints: [&'static str; 10],
    timestamp: chrono::DateTime<Utc>,
}

async fn not_found_handler(method: Method, uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(NotFoundResponse {
            success: false,
            error: "Not found",
            message: format!("API endpoint {} {} not found", method, uri.path()),
            available_endpoints: AVAILABLE_ENDPOINTS,
            timestamp: Utc::now(),
        }),
    )
}
