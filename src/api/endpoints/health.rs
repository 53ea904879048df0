//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Model every analysis is sent to; `null` when not configured.
    pub model: Option<String>,
    pub configured: bool,
}

/// `GET /api/health` - liveness plus backend configuration state.
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        model: ctx.model_id(),
        configured: ctx.is_configured(),
    })
}
