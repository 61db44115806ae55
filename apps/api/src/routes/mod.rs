pub mod analyze;
pub mod health;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Headroom over the file size limit for multipart boundaries and headers.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state
        .config
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        .route("/analyze", post(analyze::handle_analyze_resume))
        .route(
            "/analyze/github/:username",
            get(analyze::handle_analyze_github),
        )
        .route("/analyze/combined", post(analyze::handle_analyze_combined))
        .route("/extract-text", post(analyze::handle_extract_text))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
