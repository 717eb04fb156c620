use anyhow::Result;
use async_trait::async_trait;
use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, RefreshKind, System};
use tracing::trace;

use super::{MetricsSource, PartitionError, RawCpu, RawMemory, RawPartition};
use crate::util::percent_of;

/// [`MetricsSource`] backed by the operating system via `sysinfo`.
pub struct SystemSource {
    sys: System,
}

impl SystemSource {
    pub fn new() -> Self {
        let sys = System::new_with_specifics(
            RefreshKind::nothing()
                .with_cpu(CpuRefreshKind::everything())
                .with_memory(MemoryRefreshKind::everything()),
        );
        Self { sys }
    }
}

impl Default for SystemSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricsSource for SystemSource {
    async fn cpu(&mut self) -> Result<RawCpu> {
        // usage is computed between two refreshes
        self.sys.refresh_cpu_all();
        tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
        self.sys.refresh_cpu_all();

        let cpus = self.sys.cpus();
        if cpus.is_empty() {
            anyhow::bail!("no CPUs reported by the operating system");
        }

        let per_core: Vec<f32> = cpus.iter().map(|cpu| cpu.cpu_usage()).collect();
        let frequency_sum: u64 = cpus.iter().map(|cpu| cpu.frequency()).sum();

        trace!("sampled {} cores", per_core.len());

        Ok(RawCpu {
            usage_percent: self.sys.global_cpu_usage(),
            physical_cores: System::physical_core_count(),
            frequency_mhz: Some(frequency_sum / cpus.len() as u64),
            per_core,
        })
    }

    async fn memory(&mut self) -> Result<RawMemory> {
        self.sys.refresh_memory();

        let total = self.sys.total_memory();
        if total == 0 {
            anyhow::bail!("total memory reported as zero");
        }
        let used = self.sys.used_memory();

        Ok(RawMemory {
            total_bytes: total,
            used_bytes: used,
            free_bytes: self.sys.free_memory(),
            percent: percent_of(used, total),
        })
    }

    async fn partitions(&mut self) -> Result<Vec<Result<RawPartition, PartitionError>>> {
        let disks = Disks::new_with_refreshed_list();

        let partitions = disks
            .iter()
            .map(|disk| {
                let mount_point = disk.mount_point().to_string_lossy().to_string();
                let total = disk.total_space();
                if total == 0 {
                    // statvfs failed or the filesystem is not accessible
                    return Err(PartitionError {
                        mount_point,
                        reason: "no usage information available".into(),
                    });
                }

                let free = disk.available_space();
                let used = total.saturating_sub(free);

                Ok(RawPartition {
                    device: disk.name().to_string_lossy().to_string(),
                    mount_point,
                    total_bytes: total,
                    used_bytes: used,
                    free_bytes: free,
                    percent: percent_of(used, total),
                })
            })
            .collect();

        Ok(partitions)
    }
}
