//! Health check endpoints

use axum::{Json, extract::State};
use chrono::Utc;
use tracing::error;

use crate::api::types::{API_VERSION, DetailedHealthResponse, HealthResponse};
use crate::api::{ApiError, ApiResult, ApiState};

fn status(state: &ApiState, status: &str) -> HealthResponse {
    HealthResponse {
        status: status.to_string(),
        timestamp: Utc::now(),
        version: API_VERSION.to_string(),
        uptime: state.uptime(),
    }
}

/// GET /health
pub async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(status(&state, "healthy"))
}

/// GET /health/ready
pub async fn readiness(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(status(&state, "ready"))
}

/// GET /health/live
pub async fn liveness(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(status(&state, "alive"))
}

/// GET /health/detailed
///
/// Adds host facts; fails with 500 when the host cannot be inspected.
pub async fn detailed(State(state): State<ApiState>) -> ApiResult<Json<DetailedHealthResponse>> {
    let report = state.system.report().await.map_err(|e| {
        error!(event = "health_check_error", error = %format!("{e:#}"), "detailed health check failed");
        ApiError::Internal(format!("Health check failed: {e}"))
    })?;

    Ok(Json(DetailedHealthResponse {
        health: status(&state, "healthy"),
        system_info: report.system_info,
        memory_usage: report.memory_usage,
        disk_usage: report.disk_usage,
    }))
}
