//! Sinks receive every successful sample
//!
//! - **InfluxSink**: InfluxDB v2 line protocol, one write per metric group
//! - **CloudSink**: JSON push to a remote collector
//!
//! Deliveries are never retried. The collection loop logs a failed write and
//! moves on to the next sink.

pub mod cloud;
pub mod error;
pub mod influx;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::HostMetrics;

pub use cloud::CloudSink;
pub use error::{SinkError, SinkResult};
pub use influx::InfluxSink;

/// A sample as delivered to sinks; also the HTTP push body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub hostname: String,
    pub metrics: HostMetrics,
}

#[async_trait]
pub trait MetricSink: Send + Sync {
    fn name(&self) -> &str;

    async fn write(&self, sample: &Sample) -> SinkResult<()>;

    /// Called once on shutdown.
    async fn close(&self) -> SinkResult<()> {
        Ok(())
    }
}
