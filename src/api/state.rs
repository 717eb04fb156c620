//! API shared state

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};

use super::system::{LocalSystemInfo, SystemInfoProvider};

/// Shared state passed to all API handlers
///
/// The ingestion server never touches the collection loop; it only knows when
/// it started and how to describe the host.
#[derive(Clone)]
pub struct ApiState {
    pub started_at: DateTime<Utc>,
    started: Instant,
    pub system: Arc<dyn SystemInfoProvider>,
}

impl ApiState {
    pub fn new(system: Arc<dyn SystemInfoProvider>) -> Self {
        Self {
            started_at: Utc::now(),
            started: Instant::now(),
            system,
        }
    }

    /// Seconds since the state was created
    pub fn uptime(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

impl Default for ApiState {
    fn default() -> Self {
        Self::new(Arc::new(LocalSystemInfo))
    }
}
