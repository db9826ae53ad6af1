// =============================================================================
// REST API Endpoints — Axum 0.8
// =============================================================================
//
// All endpoints live under `/api/v1/`. Health is public; everything else
// requires the dashboard passphrase via the `DashboardAuth` extractor.
//
// Markets are always read through the cache. A batch request only fails as a
// whole when no requested ZIP produced data; partial results are returned
// as-is.
//
// CORS is permissive so the chart front end can be served from anywhere.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::api::auth::DashboardAuth;
use crate::app_state::AppState;
use crate::error::FetchError;
use crate::market::{
    bedroom_breakdown, historical_months, housing_type_breakdown, series_for_metric, MarketSource,
    MetricKey, NormalizedMarket,
};

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Public ──────────────────────────────────────────────────
        .route("/api/v1/health", get(health))
        // ── Authenticated ───────────────────────────────────────────
        .route("/api/v1/session", post(session))
        .route("/api/v1/markets", get(markets))
        .route("/api/v1/markets/{zip}", get(market))
        .route("/api/v1/markets/{zip}/housing-types", get(housing_types))
        .route("/api/v1/markets/{zip}/bedrooms", get(bedrooms))
        .route("/api/v1/markets/{zip}/history", get(history))
        .route("/api/v1/series", get(series))
        .route("/api/v1/cache/{zip}", delete(invalidate))
        .route("/api/v1/errors", get(errors))
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Errors & query helpers
// =============================================================================

/// JSON error response: `{"error": "..."}`.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }
}

impl From<&FetchError> for ApiError {
    fn from(err: &FetchError) -> Self {
        let status = if err.is_no_data() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::BAD_GATEWAY
        };
        Self { status, message: err.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

/// Split a comma-separated query value; `None` when absent or blank.
fn split_list(raw: Option<&str>) -> Option<Vec<String>> {
    let items: Vec<String> = raw?
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    (!items.is_empty()).then_some(items)
}

/// Fetch one market through the cache, recording real failures.
async fn load_market(state: &AppState, zip: &str) -> Result<NormalizedMarket, ApiError> {
    state.markets.fetch_market(zip).await.map_err(|e| {
        state.record_error(zip, &e);
        if e.is_no_data() {
            warn!(zip, "no market data returned");
        } else {
            warn!(zip, error = %e, "market fetch failed");
        }
        ApiError::from(&e)
    })
}

// =============================================================================
// Health (public)
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    server_time: i64,
    uptime_secs: u64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        server_time: chrono::Utc::now().timestamp_millis(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

// =============================================================================
// Session (authenticated)
// =============================================================================

async fn session(_auth: DashboardAuth) -> impl IntoResponse {
    Json(serde_json::json!({ "authenticated": true }))
}

// =============================================================================
// Markets (authenticated)
// =============================================================================

#[derive(Deserialize)]
struct ZipsQuery {
    #[serde(default)]
    zips: Option<String>,
}

async fn markets(
    _auth: DashboardAuth,
    State(state): State<Arc<AppState>>,
    Query(q): Query<ZipsQuery>,
) -> Response {
    let zips = split_list(q.zips.as_deref()).unwrap_or_else(|| state.config.zips.clone());
    if zips.is_empty() {
        return Json(Vec::<NormalizedMarket>::new()).into_response();
    }

    let results = state.markets.fetch_all(&zips).await;

    let mut found = Vec::with_capacity(results.len());
    for (zip, result) in results {
        match result {
            Ok(market) => found.push(market),
            Err(e) => state.record_error(&zip, &e),
        }
    }

    if found.is_empty() {
        warn!(zips = ?zips, "no data received for any requested zip");
        return ApiError {
            status: StatusCode::BAD_GATEWAY,
            message: "No data received from API".to_string(),
        }
        .into_response();
    }

    info!(requested = zips.len(), returned = found.len(), "markets served");
    Json(found).into_response()
}

async fn market(
    _auth: DashboardAuth,
    State(state): State<Arc<AppState>>,
    Path(zip): Path<String>,
) -> Result<Json<NormalizedMarket>, ApiError> {
    load_market(&state, &zip).await.map(Json)
}

// =============================================================================
// Breakdowns & history (authenticated)
// =============================================================================

#[derive(Deserialize)]
struct TypesQuery {
    #[serde(default)]
    types: Option<String>,
}

async fn housing_types(
    _auth: DashboardAuth,
    State(state): State<Arc<AppState>>,
    Path(zip): Path<String>,
    Query(q): Query<TypesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let market = load_market(&state, &zip).await?;
    let types = split_list(q.types.as_deref()).unwrap_or_else(|| state.config.housing_types.clone());
    Ok(Json(housing_type_breakdown(&market, &types)))
}

#[derive(Deserialize)]
struct CountsQuery {
    #[serde(default)]
    counts: Option<String>,
}

async fn bedrooms(
    _auth: DashboardAuth,
    State(state): State<Arc<AppState>>,
    Path(zip): Path<String>,
    Query(q): Query<CountsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let counts = match split_list(q.counts.as_deref()) {
        Some(list) => list
            .iter()
            .map(|c| {
                c.parse::<u32>()
                    .map_err(|_| ApiError::bad_request(format!("invalid bedroom count '{c}'")))
            })
            .collect::<Result<Vec<u32>, ApiError>>()?,
        None => state.config.bedroom_counts.clone(),
    };

    let market = load_market(&state, &zip).await?;
    Ok(Json(bedroom_breakdown(&market, &counts)))
}

#[derive(Deserialize)]
struct MonthsQuery {
    #[serde(default)]
    months: Option<String>,
}

async fn history(
    _auth: DashboardAuth,
    State(state): State<Arc<AppState>>,
    Path(zip): Path<String>,
    Query(q): Query<MonthsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let market = load_market(&state, &zip).await?;
    let months = split_list(q.months.as_deref()).unwrap_or_else(|| state.config.history_months.clone());
    Ok(Json(historical_months(&market, &months)))
}

// =============================================================================
// Cross-ZIP series (authenticated)
// =============================================================================

#[derive(Deserialize)]
struct SeriesQuery {
    #[serde(default)]
    zips: Option<String>,
    #[serde(default)]
    metric: Option<String>,
}

async fn series(
    _auth: DashboardAuth,
    State(state): State<Arc<AppState>>,
    Query(q): Query<SeriesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let metric = match q.metric.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        Some(name) => name.parse::<MetricKey>().map_err(ApiError::bad_request)?,
        None => MetricKey::default(),
    };
    let zips = split_list(q.zips.as_deref()).unwrap_or_else(|| state.config.zips.clone());

    let markets = state.markets.fetch_many(&zips).await;
    Ok(Json(series_for_metric(&markets, metric)))
}

// =============================================================================
// Cache control & diagnostics (authenticated)
// =============================================================================

async fn invalidate(
    _auth: DashboardAuth,
    State(state): State<Arc<AppState>>,
    Path(zip): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.markets.invalidate(&zip).map_err(|e| ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: e.to_string(),
    })?;
    info!(zip = %zip, "cache entry invalidated via API");
    Ok(Json(serde_json::json!({ "zip": zip, "removed": true })))
}

async fn errors(_auth: DashboardAuth, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.recent_errors())
}

// =============================================================================
// Tests
// =============================================================================
