//! Flattened view of a host sample used for threshold evaluation
//!
//! A [`MetricRecord`] maps a metric name to its numeric fields. Names follow a
//! fixed convention:
//!
//! - `cpu` and `memory` for the host-wide groups
//! - `disk:{mountpoint}` for every mounted filesystem
//!
//! The part before the first `:` is the metric *family*; thresholds are
//! configured per family (`disk_threshold` applies to every filesystem) while
//! cooldowns are tracked per metric name.

use std::collections::BTreeMap;

use crate::HostMetrics;

/// Field the alert engine compares against the configured threshold.
pub const USAGE_PERCENT: &str = "usage_percent";

pub const CPU: &str = "cpu";
pub const MEMORY: &str = "memory";
pub const DISK: &str = "disk";

pub type Fields = BTreeMap<String, f64>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricRecord {
    entries: BTreeMap<String, Fields>,
}

impl MetricRecord {
    /// Build a record that only carries `usage_percent` for each metric.
    pub fn from_usages<I, K>(usages: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        usages
            .into_iter()
            .map(|(metric, usage)| (metric.into(), Fields::from([(USAGE_PERCENT.into(), usage)])))
            .collect()
    }

    pub fn get(&self, metric: &str) -> Option<&Fields> {
        self.entries.get(metric)
    }

    /// The value thresholds are compared against.
    pub fn usage(&self, metric: &str) -> Option<f64> {
        self.get(metric)?.get(USAGE_PERCENT).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Fields)> {
        self.entries
            .iter()
            .map(|(metric, fields)| (metric.as_str(), fields))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Fields)> for MetricRecord {
    fn from_iter<T: IntoIterator<Item = (String, Fields)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// `disk:/home` → `disk`, `cpu` → `cpu`
pub fn metric_family(metric: &str) -> &str {
    metric.split_once(':').map_or(metric, |(family, _)| family)
}

pub fn disk_metric_name(mount_point: &str) -> String {
    format!("{DISK}:{mount_point}")
}

impl From<&HostMetrics> for MetricRecord {
    fn from(metrics: &HostMetrics) -> Self {
        let mut entries = BTreeMap::new();

        let cpu = &metrics.cpu;
        let mut cpu_fields = Fields::from([
            (USAGE_PERCENT.to_string(), cpu.cpu_usage),
            ("cpu_count".to_string(), cpu.cpu_count as f64),
        ]);
        if let Some(frequency) = &cpu.frequency {
            cpu_fields.insert("frequency_mhz".into(), frequency.current);
        }
        entries.insert(CPU.to_string(), cpu_fields);

        let memory = &metrics.memory;
        entries.insert(
            MEMORY.to_string(),
            Fields::from([
                (USAGE_PERCENT.to_string(), memory.percent),
                ("total_gb".to_string(), memory.total_gb),
                ("used_gb".to_string(), memory.used_gb),
                ("free_gb".to_string(), memory.free_gb),
            ]),
        );

        for (mount_point, disk) in &metrics.disk {
            entries.insert(
                disk_metric_name(mount_point),
                Fields::from([
                    (USAGE_PERCENT.to_string(), disk.percent),
                    ("total_gb".to_string(), disk.total_gb),
                    ("used_gb".to_string(), disk.used_gb),
                    ("free_gb".to_string(), disk.free_gb),
                ]),
            );
        }

        Self { entries }
    }
}
