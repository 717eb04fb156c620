//! Helper functions for integration tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use resource_monitor::{
    alerts::AlertChannel,
    sampler::{MetricsSource, PartitionError, RawCpu, RawMemory, RawPartition},
    sinks::{MetricSink, Sample, SinkResult},
};

pub const GIB: u64 = 1 << 30;

/// One scripted reading: `Some(cpu percent)` or `None` for a failed sample.
pub type Step = Option<f32>;

/// Replays a script of CPU readings; repeats the last step once exhausted.
pub struct ScriptedSource {
    steps: VecDeque<Step>,
    last: Step,
    disk_percent: f64,
}

impl ScriptedSource {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            last: Some(10.0),
            disk_percent: 50.0,
        }
    }

    pub fn with_disk_percent(mut self, percent: f64) -> Self {
        self.disk_percent = percent;
        self
    }
}

#[async_trait]
impl MetricsSource for ScriptedSource {
    async fn cpu(&mut self) -> Result<RawCpu> {
        let step = self.steps.pop_front().unwrap_or(self.last);
        self.last = step;

        match step {
            Some(usage) => Ok(RawCpu {
                usage_percent: usage,
                per_core: vec![usage, usage],
                physical_cores: Some(1),
                frequency_mhz: Some(2400),
            }),
            None => anyhow::bail!("scripted sampling failure"),
        }
    }

    async fn memory(&mut self) -> Result<RawMemory> {
        Ok(RawMemory {
            total_bytes: 16 * GIB,
            used_bytes: 4 * GIB,
            free_bytes: 12 * GIB,
            percent: 25.0,
        })
    }

    async fn partitions(&mut self) -> Result<Vec<Result<RawPartition, PartitionError>>> {
        Ok(vec![
            Ok(RawPartition {
                device: "/dev/sda1".into(),
                mount_point: "/".into(),
                total_bytes: 100 * GIB,
                used_bytes: (self.disk_percent as u64) * GIB,
                free_bytes: (100 - self.disk_percent as u64) * GIB,
                percent: self.disk_percent,
            }),
            Err(PartitionError {
                mount_point: "/root/secret".into(),
                reason: "permission denied".into(),
            }),
        ])
    }
}

#[derive(Clone, Default)]
pub struct RecordingSink {
    pub samples: Arc<Mutex<Vec<Sample>>>,
}

impl RecordingSink {
    pub fn count(&self) -> usize {
        self.samples.lock().unwrap().len()
    }
}

#[async_trait]
impl MetricSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn write(&self, sample: &Sample) -> SinkResult<()> {
        self.samples.lock().unwrap().push(sample.clone());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct RecordingChannel {
    pub messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingChannel {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertChannel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, message: &str) -> Result<()> {
        self.messages.lock().unwrap().push(message.to_string());
        Ok(())
    }
}
