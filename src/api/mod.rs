//! HTTP ingestion server
//!
//! Receives samples pushed by agents and reports its own health. It shares
//! nothing with the collection loop.
//!
//! ## Endpoints
//!
//! - `GET /` - Service description
//! - `GET /health` - Liveness summary (`healthy`)
//! - `GET /health/ready` - Readiness check (`ready`)
//! - `GET /health/live` - Liveness check (`alive`)
//! - `GET /health/detailed` - Health plus host, memory and root disk facts
//! - `POST /api/metrics` - Accept one sample; guarded by `x-api-key` when a key
//!   is configured

pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod system;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;
pub use system::{LocalSystemInfo, SystemInfoProvider, SystemReport};
pub use types::{
    DetailedHealthResponse, DiskUsage, HealthResponse, IngestResponse, MemoryUsage, MetricsPayload,
    RootResponse, SystemInfo,
};

use std::net::{SocketAddr, SocketAddrV4};
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::shutdown::ShutdownSignal;
use crate::util::{get_addr, get_api_key, get_port};

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:8000")
    pub bind_addr: SocketAddr,

    /// Required `x-api-key` for `POST /api/metrics`
    pub api_key: Option<String>,
}

impl ApiConfig {
    /// `INGEST_ADDR`, `INGEST_PORT` and `INGEST_API_KEY` with their defaults.
    pub fn from_env() -> Self {
        Self {
            bind_addr: SocketAddrV4::new(get_addr(), get_port()).into(),
            api_key: get_api_key(),
        }
    }
}

/// All routes, with the API key check applied to ingestion only.
pub fn router(state: ApiState, api_key: Option<String>) -> Router {
    let mut ingestion = Router::new().route("/api/metrics", post(routes::metrics::ingest));

    if let Some(key) = api_key {
        ingestion = ingestion.route_layer(axum::middleware::from_fn_with_state(
            Arc::<str>::from(key),
            middleware::auth::require_api_key,
        ));
    }

    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health::health))
        .route("/health/ready", get(routes::health::readiness))
        .route("/health/live", get(routes::health::liveness))
        .route("/health/detailed", get(routes::health::detailed))
        .with_state(state)
        .merge(ingestion)
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve in a background task until `shutdown` is triggered.
///
/// Returns the bound address (useful with port 0) and the server task.
pub async fn spawn_ingestion_server(
    config: ApiConfig,
    state: ApiState,
    shutdown: ShutdownSignal,
) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    let app = router(state, config.api_key);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!(event = "server_started", %addr, "ingestion server listening on {addr}");

    let handle = tokio::spawn(async move {
        let server = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { shutdown.triggered().await });

        if let Err(e) = server.await {
            error!("ingestion server error: {e}");
        }
        info!(event = "server_stopped", "ingestion server stopped");
    });

    Ok((addr, handle))
}
