use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::extract::ALLOWED_EXTENSIONS;
use crate::state::AppState;

const SERVICE_NAME: &str = "Resume Intelligence Analyzer";

/// GET /
/// Service banner.
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "status": "online",
        "version": env!("CARGO_PKG_VERSION"),
        "features": ["Resume Analysis", "GitHub Profile Analysis", "Combined Analysis"],
    }))
}

/// GET /health
/// Liveness plus the configuration facts a client needs.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "llm_model": state.llm.model(),
        "github_token_configured": state.github.has_token(),
        "upload_dir_exists": state.config.upload_dir.is_dir(),
        "supported_formats": ALLOWED_EXTENSIONS,
        "max_upload_bytes": state.config.max_upload_bytes,
    }))
}
