//! Integration tests for the ingestion server
//!
//! These tests verify that:
//! - Health checks answer with their fixed status strings
//! - Detailed health reports host facts and fails with 500 when it cannot
//! - Metrics payloads are accepted, malformed ones rejected with 422
//! - The optional API key guards ingestion only

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use resource_monitor::{
    api::{
        ApiConfig, ApiState, DiskUsage, HealthResponse, IngestResponse, MemoryUsage,
        SystemInfo, SystemInfoProvider, SystemReport, spawn_ingestion_server,
    },
    shutdown::ShutdownSignal,
};
use serde_json::{Value, json};

struct StaticSystemInfo;

#[async_trait]
impl SystemInfoProvider for StaticSystemInfo {
    async fn report(&self) -> anyhow::Result<SystemReport> {
        Ok(SystemReport {
            system_info: SystemInfo {
                hostname: "ingest-host".into(),
                platform: "Linux".into(),
                release: "6.1.0".into(),
                version: "Debian 12".into(),
                machine: "x86_64".into(),
                cpu_count: 8,
                cpu_percent: 12.5,
            },
            memory_usage: MemoryUsage {
                total_gb: 16.0,
                available_gb: 12.0,
                used_gb: 4.0,
                percent: 25.0,
            },
            disk_usage: DiskUsage {
                total_gb: 100.0,
                used_gb: 40.0,
                free_gb: 60.0,
                percent: 40.0,
            },
        })
    }
}

struct BrokenSystemInfo;

#[async_trait]
impl SystemInfoProvider for BrokenSystemInfo {
    async fn report(&self) -> anyhow::Result<SystemReport> {
        anyhow::bail!("root filesystem not found")
    }
}

async fn spawn_test_server(
    system: Arc<dyn SystemInfoProvider>,
    api_key: Option<&str>,
) -> (SocketAddr, ShutdownSignal) {
    let shutdown = ShutdownSignal::new();
    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(), // Random port
        api_key: api_key.map(str::to_string),
    };

    let (addr, _handle) = spawn_ingestion_server(config, ApiState::new(system), shutdown.clone())
        .await
        .unwrap();

    (addr, shutdown)
}

fn payload() -> Value {
    json!({
        "timestamp": "2024-05-01T12:00:00Z",
        "hostname": "web-1",
        "metrics": {
            "cpu": { "cpu_usage": 42.0, "cpu_count": 4, "per_core_usage": [40.0, 44.0, 41.0, 43.0] },
            "memory": { "total_gb": 16.0, "used_gb": 8.0, "free_gb": 8.0, "percent": 50.0 },
            "disk": {}
        }
    })
}

#[tokio::test]
async fn test_health_checks() {
    let (addr, _shutdown) = spawn_test_server(Arc::new(StaticSystemInfo), None).await;
    let client = reqwest::Client::new();

    for (route, status) in [("health", "healthy"), ("health/ready", "ready"), ("health/live", "alive")] {
        let response = client.get(format!("http://{addr}/{route}")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: HealthResponse = response.json().await.unwrap();
        assert_eq!(body.status, status);
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
        assert!(body.uptime >= 0.0);
    }
}

#[tokio::test]
async fn test_detailed_health_reports_host() {
    let (addr, _shutdown) = spawn_test_server(Arc::new(StaticSystemInfo), None).await;

    let body: Value = reqwest::get(format!("http://{addr}/health/detailed"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["system_info"]["hostname"], "ingest-host");
    assert_eq!(body["system_info"]["cpu_count"], 8);
    assert_eq!(body["memory_usage"]["available_gb"], 12.0);
    assert_eq!(body["disk_usage"]["percent"], 40.0);
}

#[tokio::test]
async fn test_detailed_health_failure_is_500() {
    let (addr, _shutdown) = spawn_test_server(Arc::new(BrokenSystemInfo), None).await;

    let response = reqwest::get(format!("http://{addr}/health/detailed")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "Health check failed: root filesystem not found");
}

#[tokio::test]
async fn test_root_lists_endpoints() {
    let (addr, _shutdown) = spawn_test_server(Arc::new(StaticSystemInfo), None).await;

    let body: Value = reqwest::get(format!("http://{addr}/")).await.unwrap().json().await.unwrap();

    assert_eq!(body["message"], "Linux Resources Monitoring API");
    assert_eq!(body["endpoints"]["metrics"], "/api/metrics");
    assert_eq!(body["endpoints"]["detailed_health"], "/health/detailed");
}

#[tokio::test]
async fn test_ingest_accepts_payload() {
    let (addr, _shutdown) = spawn_test_server(Arc::new(StaticSystemInfo), None).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/metrics"))
        .json(&payload())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: IngestResponse = response.json().await.unwrap();
    assert_eq!(body.status, "ok");
    assert_eq!(body.hostname, "web-1");
}

#[tokio::test]
async fn test_ingest_rejects_malformed_body() {
    let (addr, _shutdown) = spawn_test_server(Arc::new(StaticSystemInfo), None).await;
    let client = reqwest::Client::new();
    let url = format!("http://{addr}/api/metrics");

    let not_json = client.post(&url).body("not json").send().await.unwrap();
    assert_eq!(not_json.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let missing_hostname = client
        .post(&url)
        .json(&json!({ "timestamp": "2024-05-01T12:00:00Z", "metrics": {} }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing_hostname.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = missing_hostname.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().contains("hostname"));
}

#[tokio::test]
async fn test_api_key_guards_ingestion_only() {
    let (addr, _shutdown) = spawn_test_server(Arc::new(StaticSystemInfo), Some("s3cret")).await;
    let client = reqwest::Client::new();
    let url = format!("http://{addr}/api/metrics");

    let anonymous = client.post(&url).json(&payload()).send().await.unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let wrong = client
        .post(&url)
        .header("x-api-key", "guess")
        .json(&payload())
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let authorized = client
        .post(&url)
        .header("x-api-key", "s3cret")
        .json(&payload())
        .send()
        .await
        .unwrap();
    assert_eq!(authorized.status(), StatusCode::OK);

    // health stays public
    let health = client.get(format!("http://{addr}/health")).send().await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_server_stops_on_shutdown() {
    let shutdown = ShutdownSignal::new();
    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        api_key: None,
    };
    let (_, handle) = spawn_ingestion_server(config, ApiState::new(Arc::new(StaticSystemInfo)), shutdown.clone())
        .await
        .unwrap();

    shutdown.trigger("test");
    tokio::time::timeout(std::time::Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}
