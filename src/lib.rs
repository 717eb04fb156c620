pub mod alerts;
pub mod api;
pub mod collector;
pub mod config;
pub mod logging;
pub mod record;
pub mod sampler;
pub mod shutdown;
pub mod sinks;
pub mod util;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One normalized reading of the host, as produced by the sampler.
///
/// Byte quantities are already converted to gigabytes (rounded to two
/// decimals), percentages are passed through as reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostMetrics {
    pub cpu: CpuMetrics,
    pub memory: MemoryMetrics,
    /// Keyed by mountpoint.
    pub disk: BTreeMap<String, DiskMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuMetrics {
    pub cpu_usage: f64,
    /// Physical cores when known, logical otherwise
    pub cpu_count: usize,
    pub per_core_usage: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<CpuFrequency>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuFrequency {
    /// MHz
    pub current: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetrics {
    pub total_gb: f64,
    pub used_gb: f64,
    pub free_gb: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskMetrics {
    pub device: String,
    pub total_gb: f64,
    pub used_gb: f64,
    pub free_gb: f64,
    pub percent: f64,
}
