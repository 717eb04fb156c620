use std::collections::BTreeMap;
use std::time::Duration;

use tracing::info;

/// Duration statistics for one phase of a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseTiming {
    samples: u64,
    total: Duration,
    max: Duration,
}

impl PhaseTiming {
    fn observe(&mut self, elapsed: Duration) {
        self.samples += 1;
        self.total += elapsed;
        self.max = self.max.max(elapsed);
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn mean(&self) -> Duration {
        if self.samples == 0 {
            return Duration::ZERO;
        }
        self.total / self.samples as u32
    }

    pub fn max(&self) -> Duration {
        self.max
    }
}

/// Counters kept by the collection loop for the lifetime of the process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionStats {
    cycles: u64,
    completed: u64,
    skipped: u64,
    attempts: u64,
    errors: u64,
    alerts: u64,
    sink_failures: u64,
    timings: BTreeMap<&'static str, PhaseTiming>,
}

impl CollectionStats {
    pub(crate) fn cycle_started(&mut self) {
        self.cycles += 1;
    }

    pub(crate) fn cycle_completed(&mut self, alerts: usize) {
        self.completed += 1;
        self.alerts += alerts as u64;
    }

    pub(crate) fn cycle_skipped(&mut self) {
        self.skipped += 1;
    }

    pub(crate) fn attempt(&mut self, failed: bool) {
        self.attempts += 1;
        if failed {
            self.errors += 1;
        }
    }

    pub(crate) fn sink_failed(&mut self) {
        self.sink_failures += 1;
    }

    pub(crate) fn observe(&mut self, phase: &'static str, elapsed: Duration) {
        self.timings.entry(phase).or_default().observe(elapsed);
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn errors(&self) -> u64 {
        self.errors
    }

    pub fn alerts(&self) -> u64 {
        self.alerts
    }

    pub fn sink_failures(&self) -> u64 {
        self.sink_failures
    }

    pub fn timing(&self, phase: &str) -> Option<&PhaseTiming> {
        self.timings.get(phase)
    }

    /// Failed sampling attempts over all attempts, `0.0` before the first one.
    pub fn error_rate(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        self.errors as f64 / self.attempts as f64
    }

    pub fn log_summary(&self, reason: &str) {
        let timings = self
            .timings
            .iter()
            .map(|(phase, timing)| {
                format!(
                    "{phase}: n={} mean={:.1}ms max={:.1}ms",
                    timing.samples,
                    timing.mean().as_secs_f64() * 1000.0,
                    timing.max.as_secs_f64() * 1000.0,
                )
            })
            .collect::<Vec<_>>()
            .join(", ");

        info!(
            event = "collection_stats",
            reason,
            cycles = self.cycles,
            completed = self.completed,
            skipped = self.skipped,
            attempts = self.attempts,
            errors = self.errors,
            error_rate = self.error_rate(),
            alerts = self.alerts,
            sink_failures = self.sink_failures,
            timings = %timings,
            "collection statistics"
        );
    }
}
