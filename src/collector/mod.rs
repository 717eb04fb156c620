//! The collection loop
//!
//! One task owns the sampler, the alert engine and every sink. Cycles never
//! overlap:
//!
//! ```text
//! Idle → Sampling ─ok─→ Dispatching → Sleeping → Sampling → …
//!           │ err (attempt < 3): wait 2s, sample again
//!           └ err (attempt = 3): max_retries_exceeded, skip → Sleeping
//!
//! shutdown (between cycles, during backoff or sleep)
//!   → ShuttingDown: final sample is logged, sinks closed, stats logged
//!   → Stopped
//! ```
//!
//! Nothing on this path panics or propagates an error; every failure ends up
//! as a log event.

pub mod retry;
pub mod stats;

use std::fmt;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use futures::future::join_all;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::alerts::{AlertEngine, ThresholdConfig};
use crate::record::{CPU, DISK, MEMORY, MetricRecord};
use crate::sampler::{MetricsSource, Sampler};
use crate::shutdown::ShutdownSignal;
use crate::sinks::{MetricSink, Sample};
use crate::{HostMetrics, util};

pub use retry::RetryPolicy;
pub use stats::{CollectionStats, PhaseTiming};

/// Timing key for threshold evaluation plus channel dispatch.
pub const ALERTS_PHASE: &str = "alerts";

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_STATS_EVERY: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Sampling,
    Dispatching,
    Sleeping,
    ShuttingDown,
    Stopped,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoopState::Idle => "idle",
            LoopState::Sampling => "sampling",
            LoopState::Dispatching => "dispatching",
            LoopState::Sleeping => "sleeping",
            LoopState::ShuttingDown => "shutting_down",
            LoopState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Result of a single cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Sample taken, alerts evaluated, sinks written
    Completed { alerts: usize },
    /// Every attempt failed; nothing was evaluated or written
    Skipped,
    /// Shutdown arrived while waiting between attempts
    Interrupted,
}

enum SampleOutcome {
    Sampled(HostMetrics),
    Exhausted,
    Interrupted,
}

pub struct CollectionLoop<S> {
    sampler: Sampler<S>,
    engine: AlertEngine,
    thresholds: ThresholdConfig,
    sinks: Vec<Box<dyn MetricSink>>,
    retry: RetryPolicy,
    interval: Duration,
    stats_every: u64,
    hostname: String,
    shutdown: ShutdownSignal,
    stats: CollectionStats,
    state: LoopState,
}

impl<S: MetricsSource> CollectionLoop<S> {
    pub fn new(
        source: S,
        engine: AlertEngine,
        thresholds: ThresholdConfig,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            sampler: Sampler::new(source),
            engine,
            thresholds,
            sinks: vec![],
            retry: RetryPolicy::default(),
            interval: DEFAULT_INTERVAL,
            stats_every: DEFAULT_STATS_EVERY,
            hostname: util::hostname(),
            shutdown,
            stats: CollectionStats::default(),
            state: LoopState::Idle,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn MetricSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Log statistics every `cycles` cycles (`0` disables periodic output).
    pub fn with_stats_every(mut self, cycles: u64) -> Self {
        self.stats_every = cycles;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> &CollectionStats {
        &self.stats
    }

    pub fn engine(&self) -> &AlertEngine {
        &self.engine
    }

    /// Run cycles until shutdown is requested, then run the shutdown path.
    pub async fn run(mut self) -> CollectionStats {
        info!(
            event = "collection_started",
            host = %self.hostname,
            interval_secs = self.interval.as_secs(),
            sinks = ?self.sinks.iter().map(|sink| sink.name()).collect::<Vec<_>>(),
            channels = ?self.engine.channel_names(),
            "starting collection loop"
        );

        while !self.shutdown.is_triggered() {
            if self.run_cycle().await == CycleOutcome::Interrupted {
                break;
            }

            if self.stats_every > 0 && self.stats.cycles() % self.stats_every == 0 {
                self.stats.log_summary("periodic");
            }

            if self.shutdown.is_triggered() {
                break;
            }

            self.state = LoopState::Sleeping;
            debug!("sleeping for {:?}", self.interval);
            if self.shutdown.sleep(self.interval).await {
                break;
            }
        }

        self.shut_down().await
    }

    /// Run exactly one cycle followed by the shutdown path.
    pub async fn run_once(mut self) -> CollectionStats {
        self.run_cycle().await;
        self.shut_down().await
    }

    /// Sample (with retries), evaluate alerts and write every sink.
    #[instrument(skip_all, fields(cycle = self.stats.cycles() + 1))]
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.stats.cycle_started();
        self.state = LoopState::Sampling;

        let metrics = match self.sample_with_retry().await {
            SampleOutcome::Sampled(metrics) => metrics,
            SampleOutcome::Exhausted => {
                self.stats.cycle_skipped();
                self.state = LoopState::Idle;
                return CycleOutcome::Skipped;
            }
            SampleOutcome::Interrupted => {
                info!("cycle interrupted by shutdown");
                return CycleOutcome::Interrupted;
            }
        };

        self.state = LoopState::Dispatching;
        let now = Utc::now();
        let record = MetricRecord::from(&metrics);

        let started = Instant::now();
        let alerts = self.engine.check(&record, &self.thresholds, now).await;
        self.stats.observe(ALERTS_PHASE, started.elapsed());

        let sample = Sample {
            timestamp: now,
            hostname: self.hostname.clone(),
            metrics,
        };
        self.write_sinks(&sample).await;

        self.stats.cycle_completed(alerts.len());
        info!(
            event = "cycle_completed",
            cpu_percent = sample.metrics.cpu.cpu_usage,
            memory_percent = sample.metrics.memory.percent,
            filesystems = sample.metrics.disk.len(),
            alerts = alerts.len(),
            "collected metrics"
        );

        self.state = LoopState::Idle;
        CycleOutcome::Completed {
            alerts: alerts.len(),
        }
    }

    async fn sample_with_retry(&mut self) -> SampleOutcome {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match self.sample_timed().await {
                Ok(metrics) => {
                    self.stats.attempt(false);
                    return SampleOutcome::Sampled(metrics);
                }
                Err(e) => e,
            };
            self.stats.attempt(true);

            if !self.retry.should_retry(attempt) {
                error!(
                    event = "max_retries_exceeded",
                    attempts = attempt,
                    error = %format!("{error:#}"),
                    "max retries exceeded, skipping cycle"
                );
                return SampleOutcome::Exhausted;
            }

            warn!(
                event = "sample_failed",
                attempt,
                max_attempts = self.retry.max_attempts,
                error = %format!("{error:#}"),
                "sampling failed, retrying in {:?}",
                self.retry.delay
            );

            if self.shutdown.sleep(self.retry.delay).await {
                return SampleOutcome::Interrupted;
            }
        }
    }

    async fn sample_timed(&mut self) -> Result<HostMetrics> {
        let started = Instant::now();
        let cpu = self.sampler.sample_cpu().await?;
        self.stats.observe(CPU, started.elapsed());

        let started = Instant::now();
        let memory = self.sampler.sample_memory().await?;
        self.stats.observe(MEMORY, started.elapsed());

        let started = Instant::now();
        let disk = self.sampler.sample_disks().await?;
        self.stats.observe(DISK, started.elapsed());

        Ok(HostMetrics { cpu, memory, disk })
    }

    async fn write_sinks(&mut self, sample: &Sample) {
        let results = join_all(
            self.sinks
                .iter()
                .map(|sink| async move { (sink.name(), sink.write(sample).await) }),
        )
        .await;

        for (sink, result) in results {
            match result {
                Ok(()) => debug!(event = "sink_written", sink),
                Err(e) => {
                    self.stats.sink_failed();
                    error!(
                        event = "sink_write_failed",
                        sink,
                        error = %e,
                        "failed to write sample to {sink}"
                    );
                }
            }
        }
    }

    async fn shut_down(mut self) -> CollectionStats {
        self.state = LoopState::ShuttingDown;
        info!(event = "shutdown_started", "collection loop shutting down");

        match self.sampler.sample().await {
            Ok(metrics) => info!(
                event = "final_sample",
                cpu_percent = metrics.cpu.cpu_usage,
                memory_percent = metrics.memory.percent,
                filesystems = metrics.disk.len(),
                "final sample before shutdown"
            ),
            Err(e) => warn!(event = "final_sample_failed", error = %format!("{e:#}")),
        }

        for sink in &self.sinks {
            if let Err(e) = sink.close().await {
                warn!(event = "sink_close_failed", sink = sink.name(), error = %e);
            }
        }

        self.stats.log_summary("shutdown");
        self.state = LoopState::Stopped;
        info!(event = "shutdown_complete", "collection loop stopped");

        self.stats
    }
}
