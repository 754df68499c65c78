pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::ai::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/ai/generate", post(handlers::handle_generate))
        .route("/api/v1/ai/generate-json", post(handlers::handle_generate_json))
        // Admin: provider preferences
        .route(
            "/api/v1/admin/ai-settings",
            get(handlers::handle_get_settings).put(handlers::handle_update_settings),
        )
        .route(
            "/api/v1/admin/ai-settings/test",
            post(handlers::handle_test_provider),
        )
        .with_state(state)
}
