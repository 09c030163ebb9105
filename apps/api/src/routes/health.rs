use axum::Json;
use serde_json::{json, Value};

use crate::analysis::prompts::PROMPT_VERSION;

/// GET /
pub async fn root_handler() -> Json<Value> {
    Json(json!({ "message": "Welcome to the Resume Analyzer API" }))
}

/// GET /health
/// Returns a simple status object with service and prompt versions.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": env!("CARGO_PKG_NAME"),
        "prompt_version": PROMPT_VERSION
    }))
}
