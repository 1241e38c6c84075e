use crate::config::CoordinatorConfig;
use crate::coordinator::CoordinationService;
use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// State for the admin API.
#[derive(Clone)]
pub struct AdminAppState {
    pub service: Arc<CoordinationService>,
}

#[derive(Serialize)]
struct ResetResponse {
    status: &'static str,
}

pub fn create_admin_router(state: AdminAppState) -> Router {
    Router::new()
        .route("/api/admin/config", get(get_config))
        .route("/api/admin/reset", post(reset))
        .with_state(Arc::new(state))
}

/// GET /api/admin/config - effective configuration.
async fn get_config(State(state): State<Arc<AdminAppState>>) -> Json<CoordinatorConfig> {
    Json(state.service.config().clone())
}

/// POST /api/admin/reset - forget all agents and claims.
async fn reset(State(state): State<Arc<AdminAppState>>) -> Json<ResetResponse> {
    info!("Reset requested");
    state.service.reset().await;
    Json(ResetResponse { status: "reset" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::parse_snapshot;

    #[tokio::test]
    async fn test_reset_clears_engine_state() {
        let service = Arc::new(CoordinationService::new(CoordinatorConfig::default()));
        let snapshot = parse_snapshot(
            br#"{"agentStates":[{"id":1,"state":{"position":{"x":0,"y":0,"z":0},"has_cube":false}}],
                "availableCubes":[{"id":2,"position":{"x":3,"y":0,"z":0}}]}"#,
        )
        .unwrap();
        service.decide(&snapshot).await;
        assert_eq!(service.claims().await.len(), 1);

        let state = Arc::new(AdminAppState {
            service: service.clone(),
        });
        let Json(response) = reset(State(state)).await;

        assert_eq!(response.status, "reset");
        assert!(service.claims().await.is_empty());
        assert!(service.agent_statuses().is_empty());
        assert_eq!(service.stats().counters.decision_batches, 1);
    }

    #[tokio::test]
    async fn test_get_config_returns_effective_values() {
        let mut config = CoordinatorConfig::default();
        config.agents.max_agents = 3;
        let state = Arc::new(AdminAppState {
            service: Arc::new(CoordinationService::new(config)),
        });

        let Json(config) = get_config(State(state)).await;
        assert_eq!(config.agents.max_agents, 3);
    }
}
