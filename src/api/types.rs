//! Request and response bodies of the ingestion API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Body of `GET /health`, `/health/ready` and `/health/live`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    /// Seconds since the server started
    pub uptime: f64,
}

/// Body of `GET /health/detailed`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetailedHealthResponse {
    #[serde(flatten)]
    pub health: HealthResponse,
    pub system_info: SystemInfo,
    pub memory_usage: MemoryUsage,
    pub disk_usage: DiskUsage,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemInfo {
    pub hostname: String,
    pub platform: String,
    pub release: String,
    pub version: String,
    pub machine: String,
    pub cpu_count: usize,
    pub cpu_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryUsage {
    pub total_gb: f64,
    pub available_gb: f64,
    pub used_gb: f64,
    pub percent: f64,
}

/// Usage of the root filesystem
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiskUsage {
    pub total_gb: f64,
    pub used_gb: f64,
    pub free_gb: f64,
    pub percent: f64,
}

/// Body of `POST /api/metrics`
///
/// `metrics` must be an object; its contents are not interpreted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsPayload {
    pub timestamp: String,
    pub hostname: String,
    pub metrics: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestResponse {
    pub status: String,
    pub received_at: DateTime<Utc>,
    pub hostname: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RootResponse {
    pub message: String,
    pub version: String,
    pub endpoints: Endpoints,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Endpoints {
    pub health: String,
    pub readiness: String,
    pub liveness: String,
    pub detailed_health: String,
    pub metrics: String,
}
