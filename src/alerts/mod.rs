//! Threshold evaluation with per-metric cooldown suppression
//!
//! ## Evaluation
//!
//! ```text
//! usage <= threshold                      → nothing
//! usage >  threshold, inside cooldown     → suppressed
//! usage >  threshold, cooldown elapsed    → AlertEvent, AlertState[metric] = now
//! ```
//!
//! A metric whose last alert is exactly `cooldown` ago is eligible again.
//! A metric that never alerted is always eligible.
//!
//! The cooldown timestamp is recorded when the event is produced, before any
//! channel is contacted, so a failing channel can never cause a re-fire.

pub mod channels;

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use futures::future::join_all;
use tracing::{debug, error, info, instrument, trace};

use crate::config::{AlertingConfig, THRESHOLD_SUFFIX};
use crate::record::{MetricRecord, metric_family};

pub use channels::{AlertChannel, EmailChannel, LogChannel, WebhookChannel};

/// Threshold lookup key for a metric: `disk:/home` → `disk_threshold`
pub fn threshold_key(metric: &str) -> String {
    format!("{}{THRESHOLD_SUFFIX}", metric_family(metric))
}

/// Limits keyed by `{family}_threshold` plus the cooldown window.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdConfig {
    thresholds: BTreeMap<String, f64>,
    cooldown: Duration,
}

impl ThresholdConfig {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            thresholds: BTreeMap::new(),
            cooldown,
        }
    }

    /// `family` is e.g. `cpu`; stored as `cpu_threshold`.
    pub fn with_threshold(mut self, family: &str, limit: f64) -> Self {
        self.thresholds.insert(threshold_key(family), limit);
        self
    }

    pub fn limit_for(&self, metric: &str) -> Option<f64> {
        self.thresholds.get(&threshold_key(metric)).copied()
    }

    pub fn cooldown_for(&self, _metric: &str) -> Duration {
        self.cooldown
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }
}

impl From<&AlertingConfig> for ThresholdConfig {
    fn from(config: &AlertingConfig) -> Self {
        Self {
            thresholds: config.thresholds.clone(),
            cooldown: config.cooldown(),
        }
    }
}

/// Timestamp of the last alert produced per metric.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertState {
    last_alert: HashMap<String, DateTime<Utc>>,
}

impl AlertState {
    pub fn last_alert(&self, metric: &str) -> Option<DateTime<Utc>> {
        self.last_alert.get(metric).copied()
    }

    fn is_suppressed(&self, metric: &str, now: DateTime<Utc>, cooldown: Duration) -> bool {
        let Some(last) = self.last_alert(metric) else {
            return false;
        };
        let cooldown = TimeDelta::from_std(cooldown).unwrap_or(TimeDelta::MAX);
        now.signed_duration_since(last) < cooldown
    }

    fn record(&mut self, metric: &str, now: DateTime<Utc>) {
        self.last_alert.insert(metric.to_string(), now);
    }

    pub fn len(&self) -> usize {
        self.last_alert.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_alert.is_empty()
    }
}

/// A threshold breach that passed cooldown suppression.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub metric: String,
    pub value: f64,
    pub threshold: f64,
    pub triggered_at: DateTime<Utc>,
}

impl AlertEvent {
    /// Single line sent to every channel.
    pub fn message(&self) -> String {
        format!(
            "ALERT: {} is {:?}, exceeds threshold {}!",
            self.metric.to_uppercase(),
            self.value,
            self.threshold
        )
    }
}

/// Evaluates records against thresholds and fans alerts out to channels.
///
/// The engine is owned by a single collection loop; it is not shared.
pub struct AlertEngine {
    state: AlertState,
    channels: Vec<Box<dyn AlertChannel>>,
}

impl AlertEngine {
    pub fn new(channels: Vec<Box<dyn AlertChannel>>) -> Self {
        Self {
            state: AlertState::default(),
            channels,
        }
    }

    /// Engine with every channel enabled in the `alerting` section.
    pub fn from_config(config: &AlertingConfig, client: &reqwest::Client) -> anyhow::Result<Self> {
        Ok(Self::new(channels::build_channels(config, client)?))
    }

    pub fn state(&self) -> &AlertState {
        &self.state
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|channel| channel.name()).collect()
    }

    /// Compare `record` against `config` at `now`.
    ///
    /// Metrics without a configured threshold are skipped. Every returned
    /// event has already been recorded in the cooldown state.
    pub fn evaluate(
        &mut self,
        record: &MetricRecord,
        config: &ThresholdConfig,
        now: DateTime<Utc>,
    ) -> Vec<AlertEvent> {
        let mut events = vec![];

        for (metric, _) in record.iter() {
            let Some(threshold) = config.limit_for(metric) else {
                continue;
            };
            let Some(value) = record.usage(metric) else {
                continue;
            };

            if value <= threshold {
                continue;
            }

            if self
                .state
                .is_suppressed(metric, now, config.cooldown_for(metric))
            {
                trace!("{metric}: {value} > {threshold} suppressed by cooldown");
                continue;
            }

            self.state.record(metric, now);
            events.push(AlertEvent {
                metric: metric.to_string(),
                value,
                threshold,
                triggered_at: now,
            });
        }

        events
    }

    /// Send every event to every channel. Failures are logged, never retried.
    #[instrument(skip_all, fields(events = events.len()))]
    pub async fn dispatch(&self, events: &[AlertEvent]) {
        for event in events {
            let message = event.message();
            let message = message.as_str();
            info!(
                event = "alert_triggered",
                metric = %event.metric,
                value = event.value,
                threshold = event.threshold,
                "{message}"
            );

            let deliveries = join_all(
                self.channels
                    .iter()
                    .map(|channel| async move { (channel.name(), channel.send(message).await) }),
            )
            .await;

            for (channel, result) in deliveries {
                match result {
                    Ok(()) => debug!(event = "alert_delivered", channel, metric = %event.metric),
                    Err(e) => error!(
                        event = "alert_channel_failed",
                        channel,
                        metric = %event.metric,
                        error = %format!("{e:#}"),
                        "failed to send alert via {channel}"
                    ),
                }
            }
        }
    }

    /// [`evaluate`](Self::evaluate) followed by [`dispatch`](Self::dispatch).
    pub async fn check(
        &mut self,
        record: &MetricRecord,
        config: &ThresholdConfig,
        now: DateTime<Utc>,
    ) -> Vec<AlertEvent> {
        let events = self.evaluate(record, config, now);
        if !events.is_empty() {
            self.dispatch(&events).await;
        }
        events
    }
}
