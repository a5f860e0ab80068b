//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::artifacts::ArtifactInfo;
use crate::AppState;

pub const SERVICE_NAME: &str = "Fraud Detection API";

#[derive(Serialize)]
pub struct LivenessResponse {
    status: &'static str,
}

/// Static liveness probe
pub async fn root() -> Json<LivenessResponse> {
    Json(LivenessResponse { status: "API running" })
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: i64,
    model: ArtifactInfo,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
        model: state.artifacts.as_ref().clone(),
    })
}
