pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use crate::http::server::AppState;
use self::handlers::*;

pub fn setup_api_router(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/config", get(export_config))
        .route("/api/config/import", post(import_config))
        .route("/api/config/validate", post(validate_config))
        .with_state(state)
}
