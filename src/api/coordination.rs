use crate::coordinator::{CoordinationService, DecisionBatch, MetricsBatch};
use crate::world::{parse_snapshot, ValidationError, WorldSnapshot};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared state for the simulation-facing endpoints
pub struct AppState {
    pub service: Arc<CoordinationService>,
    pub body_size_limit: usize,
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Create router with the decision and metrics endpoints
pub fn create_coordination_router(service: Arc<CoordinationService>) -> Router {
    let body_size_limit = service.config().api.body_size_limit_bytes;
    let state = AppState {
        service,
        body_size_limit,
    };

    Router::new()
        .route("/get_decisions", post(get_decisions))
        .route("/get_metrics", post(get_metrics))
        // The extractor buffers at most one byte past the limit
        .layer(DefaultBodyLimit::max(body_size_limit.saturating_add(1)))
        .with_state(Arc::new(state))
}

/// POST /get_decisions - One decision per agent entry, in request order
async fn get_decisions(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<DecisionBatch>, AppError> {
    let snapshot = read_snapshot(&state, &body)?;
    let batch = state.service.decide(&snapshot).await;

    if batch.decisions.iter().any(|d| d.is_error()) {
        info!(batch_id = %batch.batch_id, status = ?batch.status, "Decision batch answered with errors");
    }

    Ok(Json(batch))
}

/// POST /get_metrics - Performance report for every agent entry
async fn get_metrics(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<MetricsBatch>, AppError> {
    let snapshot = read_snapshot(&state, &body)?;
    Ok(Json(state.service.report_metrics(&snapshot).await))
}

/// Size-check and parse a request body
fn read_snapshot(state: &AppState, body: &[u8]) -> Result<WorldSnapshot, AppError> {
    if body.len() > state.body_size_limit {
        return Err(AppError::PayloadTooLarge);
    }

    parse_snapshot(body).map_err(|e| {
        warn!(error = %e, "Rejected snapshot");
        AppError::from(e)
    })
}

/// Request-level failures. Per-agent problems never end up here.
#[derive(Debug)]
enum AppError {
    ValidationError(String),
    PayloadTooLarge,
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::ValidationError(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::PayloadTooLarge => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payload too large".to_string())
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
        });

        (status, body).into_response()
    }
}
