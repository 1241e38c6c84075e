// HTTP APIs: simulation endpoints, read-only queries, admin

pub mod admin;
pub mod coordination;
pub mod query;

pub use admin::{create_admin_router, AdminAppState};
pub use coordination::{create_coordination_router, AppState};
pub use query::{create_query_router, QueryAppState};

use crate::coordinator::CoordinationService;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Full application router
pub fn create_app(service: Arc<CoordinationService>) -> Router {
    let cors_permissive = service.config().api.cors_permissive;

    let app = Router::new()
        .merge(create_coordination_router(service.clone()))
        .merge(create_query_router(Arc::new(QueryAppState {
            service: service.clone(),
        })))
        .merge(create_admin_router(AdminAppState { service }));

    if cors_permissive {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app.layer(cors)
    } else {
        app
    }
}
