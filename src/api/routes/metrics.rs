//! Metrics ingestion endpoint

use std::net::SocketAddr;

use axum::{Json, body::Bytes, extract::ConnectInfo};
use chrono::Utc;
use tracing::info;

use crate::api::ApiResult;
use crate::api::types::{IngestResponse, MetricsPayload};

/// POST /api/metrics
///
/// The body is parsed by hand so every shape error maps to 422. The accepted
/// sample is recorded in full on the `metrics_received` event.
pub async fn ingest(
    client: Option<ConnectInfo<SocketAddr>>,
    body: Bytes,
) -> ApiResult<Json<IngestResponse>> {
    let payload: MetricsPayload = serde_json::from_slice(&body)?;
    let received_at = Utc::now();

    info!(
        event = "metrics_received",
        hostname = %payload.hostname,
        timestamp = %payload.timestamp,
        metrics = %serde_json::Value::Object(payload.metrics.clone()),
        client = ?client.map(|ConnectInfo(addr)| addr),
        "received metrics"
    );

    Ok(Json(IngestResponse {
        status: "ok".to_string(),
        received_at,
        hostname: payload.hostname,
    }))
}
