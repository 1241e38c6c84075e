use crate::coordinator::{BoardEntry, ClaimView, CoordinationService, ServiceStats};
use crate::world::AgentId;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Shared state for query API
pub struct QueryAppState {
    pub service: Arc<CoordinationService>,
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Create query API router
pub fn create_query_router(state: Arc<QueryAppState>) -> Router {
    Router::new()
        .route("/api/agents", get(list_agents))
        .route("/api/agents/:id", get(get_agent))
        .route("/api/claims", get(list_claims))
        .route("/api/stats", get(get_stats))
        .with_state(state)
}

/// GET /api/agents - Status board, ordered by agent id
async fn list_agents(State(state): State<Arc<QueryAppState>>) -> Json<Vec<BoardEntry>> {
    Json(state.service.agent_statuses())
}

/// GET /api/agents/:id - One agent's last published status
async fn get_agent(
    State(state): State<Arc<QueryAppState>>,
    Path(id): Path<String>,
) -> Result<Json<BoardEntry>, QueryError> {
    let agent_id: AgentId = id.trim().parse().map_err(|_| QueryError::NotFound)?;
    let entry = state
        .service
        .agent_status(agent_id)
        .ok_or(QueryError::NotFound)?;

    Ok(Json(entry))
}

/// GET /api/claims - Claim table, ordered by object id
async fn list_claims(State(state): State<Arc<QueryAppState>>) -> Json<Vec<ClaimView>> {
    Json(state.service.claims().await)
}

/// GET /api/stats - Service counters
async fn get_stats(State(state): State<Arc<QueryAppState>>) -> Json<ServiceStats> {
    Json(state.service.stats())
}

/// Query error types
#[derive(Debug)]
enum QueryError {
    NotFound,
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            QueryError::NotFound => (StatusCode::NOT_FOUND, "Agent not found"),
        };

        let body = Json(ErrorResponse {
            error: error_message.to_string(),
        });

        (status, body).into_response()
    }
}
