use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use capquote_agent::{ConversationTurnHandler, TurnRequest, TurnResponse};
use capquote_core::cpq::repository::RefreshReport;
use capquote_core::cpq::EngineCacheStats;
use capquote_core::errors::{ApplicationError, InterfaceError, PricingError};
use capquote_core::estimate::{
    BatchEstimateRequest, BatchEstimateResponse, EstimateMode, EstimateRequest, EstimateResponse,
    EstimateService,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

pub const CORRELATION_HEADER: &str = "x-correlation-id";

#[derive(Clone)]
pub struct ApiState {
    estimates: EstimateService,
    turns: Arc<ConversationTurnHandler>,
}

impl ApiState {
    pub fn new(estimates: EstimateService, turns: Arc<ConversationTurnHandler>) -> Self {
        Self { estimates, turns }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/estimate", post(estimate))
        .route("/api/v1/estimate/batch", post(estimate_batch))
        .route("/api/v1/conversation/turn", post(conversation_turn))
        .route("/api/v1/cache/stats", get(cache_stats))
        .route("/api/v1/price-tables/refresh", post(refresh_tables))
        .with_state(state)
}

#[derive(Debug)]
pub struct ApiError(InterfaceError);

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub detail: String,
    pub correlation_id: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            success: false,
            error: self.0.user_message().to_string(),
            detail: self.0.message().to_string(),
            correlation_id: self.0.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn reject(error: PricingError, correlation_id: &str, operation: &'static str) -> ApiError {
    let error_class = error.error_class();
    let interface = ApplicationError::from(error).into_interface(correlation_id);
    warn!(
        event_name = "server.request.failed",
        correlation_id,
        operation,
        error_class,
        error = %interface,
        "request failed"
    );
    ApiError(interface)
}

fn body<T>(
    payload: Result<Json<T>, JsonRejection>,
    correlation_id: &str,
    operation: &'static str,
) -> Result<T, ApiError> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        let error = PricingError::validation("body", rejection.body_text());
        reject(error, correlation_id, operation)
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EstimateQuery {
    mode: Option<String>,
}

async fn estimate(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Query(query): Query<EstimateQuery>,
    payload: Result<Json<EstimateRequest>, JsonRejection>,
) -> Result<Json<EstimateResponse>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let request = body(payload, &correlation_id, "estimate")?;
    let mode = match query.mode.as_deref() {
        Some(raw) => raw.parse::<EstimateMode>().map_err(|message| {
            reject(PricingError::validation("mode", message), &correlation_id, "estimate")
        })?,
        None => EstimateMode::Standard,
    };

    let response = state
        .estimates
        .estimate(&request, mode)
        .await
        .map_err(|error| reject(error, &correlation_id, "estimate"))?;

    info!(
        event_name = "server.estimate.completed",
        correlation_id = %correlation_id,
        quantity = response.estimate.spec.quantity,
        subtotal = %response.estimate.subtotal,
        warnings = response.warnings.len(),
        response_time_ms = response.performance.response_time_ms,
        "estimate served"
    );
    Ok(Json(response))
}

async fn estimate_batch(
    headers: HeaderMap,
    State(state): State<ApiState>,
    payload: Result<Json<BatchEstimateRequest>, JsonRejection>,
) -> Result<Json<BatchEstimateResponse>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let request = body(payload, &correlation_id, "estimate_batch")?;

    let response = state
        .estimates
        .estimate_batch(request)
        .await
        .map_err(|error| reject(error, &correlation_id, "estimate_batch"))?;

    info!(
        event_name = "server.estimate_batch.completed",
        correlation_id = %correlation_id,
        total = response.total,
        failed = response.failed,
        response_time_ms = response.performance.response_time_ms,
        "batch estimate served"
    );
    Ok(Json(response))
}

async fn conversation_turn(
    headers: HeaderMap,
    State(state): State<ApiState>,
    payload: Result<Json<TurnRequest>, JsonRejection>,
) -> Result<Json<TurnResponse>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let request = body(payload, &correlation_id, "conversation_turn")?;

    let response = state
        .turns
        .handle(request)
        .await
        .map_err(|error| reject(error, &correlation_id, "conversation_turn"))?;

    info!(
        event_name = "server.conversation_turn.completed",
        correlation_id = %correlation_id,
        changes = response.change_log.len(),
        "conversation turn served"
    );
    Ok(Json(response))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsResponse {
    pub cache_stats: EngineCacheStats,
    pub table_version: Option<u64>,
    pub stale: bool,
    pub source: String,
}

async fn cache_stats(State(state): State<ApiState>) -> Json<CacheStatsResponse> {
    let engine = state.estimates.engine();
    let repository = engine.repository();
    Json(CacheStatsResponse {
        cache_stats: engine.cache_stats(),
        table_version: repository.snapshot().map(|catalog| catalog.version()),
        stale: repository.is_stale(),
        source: repository.source_name(),
    })
}

async fn refresh_tables(
    headers: HeaderMap,
    State(state): State<ApiState>,
) -> Result<Json<RefreshReport>, ApiError> {
    let correlation_id = correlation_id(&headers);
    let report = state
        .estimates
        .engine()
        .refresh()
        .await
        .map_err(|error| reject(error, &correlation_id, "refresh_tables"))?;

    info!(
        event_name = "server.price_tables.refreshed",
        correlation_id = %correlation_id,
        version = report.version,
        stale = report.stale,
        "price table refresh requested"
    );
    Ok(Json(report))
}
