//! Host sampling
//!
//! A [`MetricsSource`] reports raw counters (bytes, percentages, MHz). The
//! [`Sampler`] wraps a source, converts byte quantities to gigabytes and shapes
//! the result into [`HostMetrics`].
//!
//! ```text
//! MetricsSource (sysinfo, test doubles) → Sampler → HostMetrics
//! ```

pub mod system;

use std::collections::BTreeMap;
use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::util::bytes_to_gb;
use crate::{CpuFrequency, CpuMetrics, DiskMetrics, HostMetrics, MemoryMetrics};

pub use system::SystemSource;

/// Raw CPU reading
#[derive(Debug, Clone, PartialEq)]
pub struct RawCpu {
    pub usage_percent: f32,
    pub per_core: Vec<f32>,
    /// Physical cores; `None` when the platform cannot tell
    pub physical_cores: Option<usize>,
    pub frequency_mhz: Option<u64>,
}

/// Raw memory reading (bytes)
#[derive(Debug, Clone, PartialEq)]
pub struct RawMemory {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub percent: f64,
}

/// Raw filesystem reading (bytes)
#[derive(Debug, Clone, PartialEq)]
pub struct RawPartition {
    pub device: String,
    pub mount_point: String,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub percent: f64,
}

/// A single filesystem that could not be read (e.g. permission denied)
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionError {
    pub mount_point: String,
    pub reason: String,
}

impl fmt::Display for PartitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot read {}: {}", self.mount_point, self.reason)
    }
}

impl std::error::Error for PartitionError {}

/// Capability that reports the current utilization of the host.
///
/// Each call may fail as a whole (a transient collection error). Partition
/// reads may fail individually without failing `partitions`.
#[async_trait]
pub trait MetricsSource: Send {
    /// May wait for a CPU sampling window before returning.
    async fn cpu(&mut self) -> Result<RawCpu>;

    async fn memory(&mut self) -> Result<RawMemory>;

    async fn partitions(&mut self) -> Result<Vec<Result<RawPartition, PartitionError>>>;
}

#[async_trait]
impl<S: MetricsSource + ?Sized> MetricsSource for Box<S> {
    async fn cpu(&mut self) -> Result<RawCpu> {
        (**self).cpu().await
    }

    async fn memory(&mut self) -> Result<RawMemory> {
        (**self).memory().await
    }

    async fn partitions(&mut self) -> Result<Vec<Result<RawPartition, PartitionError>>> {
        (**self).partitions().await
    }
}

/// Normalizes raw readings of a [`MetricsSource`] into [`HostMetrics`].
#[derive(Debug)]
pub struct Sampler<S> {
    source: S,
}

impl<S: MetricsSource> Sampler<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub async fn sample_cpu(&mut self) -> Result<CpuMetrics> {
        let raw = self.source.cpu().await?;
        Ok(normalize_cpu(raw))
    }

    pub async fn sample_memory(&mut self) -> Result<MemoryMetrics> {
        let raw = self.source.memory().await?;
        Ok(normalize_memory(raw))
    }

    /// Readable filesystems keyed by mountpoint; unreadable ones are skipped.
    pub async fn sample_disks(&mut self) -> Result<BTreeMap<String, DiskMetrics>> {
        let partitions = self.source.partitions().await?;

        let mut disks = BTreeMap::new();
        for partition in partitions {
            match partition {
                Ok(raw) => {
                    let (mount_point, metrics) = normalize_partition(raw);
                    disks.insert(mount_point, metrics);
                }
                Err(e) => {
                    debug!(event = "partition_skipped", mount_point = %e.mount_point, "{e}");
                }
            }
        }

        Ok(disks)
    }

    /// All three groups as one unit; the first failing group fails the sample.
    #[instrument(skip_all)]
    pub async fn sample(&mut self) -> Result<HostMetrics> {
        Ok(HostMetrics {
            cpu: self.sample_cpu().await?,
            memory: self.sample_memory().await?,
            disk: self.sample_disks().await?,
        })
    }
}

fn normalize_cpu(raw: RawCpu) -> CpuMetrics {
    CpuMetrics {
        cpu_usage: f64::from(raw.usage_percent),
        cpu_count: raw.physical_cores.unwrap_or(raw.per_core.len()),
        per_core_usage: raw.per_core.into_iter().map(f64::from).collect(),
        frequency: raw
            .frequency_mhz
            .filter(|mhz| *mhz > 0)
            .map(|mhz| CpuFrequency {
                current: mhz as f64,
            }),
    }
}

fn normalize_memory(raw: RawMemory) -> MemoryMetrics {
    MemoryMetrics {
        total_gb: bytes_to_gb(raw.total_bytes),
        used_gb: bytes_to_gb(raw.used_bytes),
        free_gb: bytes_to_gb(raw.free_bytes),
        percent: raw.percent,
    }
}

fn normalize_partition(raw: RawPartition) -> (String, DiskMetrics) {
    (
        raw.mount_point,
        DiskMetrics {
            device: raw.device,
            total_gb: bytes_to_gb(raw.total_bytes),
            used_gb: bytes_to_gb(raw.used_bytes),
            free_gb: bytes_to_gb(raw.free_bytes),
            percent: raw.percent,
        },
    )
}
