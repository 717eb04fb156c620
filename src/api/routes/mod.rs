pub mod health;
pub mod metrics;

use axum::Json;

use crate::api::types::{API_VERSION, Endpoints, RootResponse};

/// GET /
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Linux Resources Monitoring API".to_string(),
        version: API_VERSION.to_string(),
        endpoints: Endpoints {
            health: "/health".to_string(),
            readiness: "/health/ready".to_string(),
            liveness: "/health/live".to_string(),
            detailed_health: "/health/detailed".to_string(),
            metrics: "/api/metrics".to_string(),
        },
    })
}
