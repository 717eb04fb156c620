//! Host facts reported by `GET /health/detailed`

use anyhow::{Context, Result};
use async_trait::async_trait;
use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, RefreshKind, System};

use super::types::{DiskUsage, MemoryUsage, SystemInfo};
use crate::util::{bytes_to_gb, hostname, percent_of};

#[derive(Debug, Clone, PartialEq)]
pub struct SystemReport {
    pub system_info: SystemInfo,
    pub memory_usage: MemoryUsage,
    pub disk_usage: DiskUsage,
}

#[async_trait]
pub trait SystemInfoProvider: Send + Sync {
    async fn report(&self) -> Result<SystemReport>;
}

/// Reads the local host through `sysinfo`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSystemInfo;

#[async_trait]
impl SystemInfoProvider for LocalSystemInfo {
    async fn report(&self) -> Result<SystemReport> {
        let mut sys = System::new_with_specifics(
            RefreshKind::nothing()
                .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
                .with_memory(MemoryRefreshKind::nothing().with_ram()),
        );
        tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
        sys.refresh_cpu_usage();

        let total = sys.total_memory();
        let available = sys.available_memory();
        let used = total.saturating_sub(available);

        let system_info = SystemInfo {
            hostname: hostname(),
            platform: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
            release: System::kernel_version().unwrap_or_default(),
            version: System::os_version().unwrap_or_default(),
            machine: System::cpu_arch(),
            cpu_count: sys.cpus().len(),
            cpu_percent: f64::from(sys.global_cpu_usage()),
        };

        let memory_usage = MemoryUsage {
            total_gb: bytes_to_gb(total),
            available_gb: bytes_to_gb(available),
            used_gb: bytes_to_gb(used),
            percent: percent_of(used, total),
        };

        Ok(SystemReport {
            system_info,
            memory_usage,
            disk_usage: root_disk_usage()?,
        })
    }
}

fn root_disk_usage() -> Result<DiskUsage> {
    let disks = Disks::new_with_refreshed_list();
    let root = disks
        .list()
        .iter()
        .find(|disk| disk.mount_point() == std::path::Path::new("/"))
        .context("root filesystem not found")?;

    let total = root.total_space();
    let free = root.available_space();
    let used = total.saturating_sub(free);

    Ok(DiskUsage {
        total_gb: bytes_to_gb(total),
        used_gb: bytes_to_gb(used),
        free_gb: bytes_to_gb(free),
        percent: percent_of(used, total),
    })
}
