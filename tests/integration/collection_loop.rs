//! End-to-end tests of the collection loop with scripted sources
//!
//! These tests verify that:
//! - Retries recover a cycle without skipping it
//! - Exhausted retries skip the cycle and write nothing
//! - Breaches reach every channel once per cooldown
//! - Shutdown stops a sleeping loop promptly

use std::time::Duration;

use resource_monitor::{
    alerts::{AlertEngine, ThresholdConfig},
    collector::{CollectionLoop, CycleOutcome, LoopState},
    shutdown::ShutdownSignal,
};
use tokio::time::Instant;

use crate::helpers::{RecordingChannel, RecordingSink, ScriptedSource, Step};

fn thresholds() -> ThresholdConfig {
    ThresholdConfig::new(Duration::from_secs(600))
        .with_threshold("cpu", 90.0)
        .with_threshold("disk", 90.0)
}

fn collector(
    steps: impl IntoIterator<Item = Step>,
    channel: &RecordingChannel,
    sink: &RecordingSink,
    shutdown: &ShutdownSignal,
) -> CollectionLoop<ScriptedSource> {
    CollectionLoop::new(
        ScriptedSource::new(steps),
        AlertEngine::new(vec![Box::new(channel.clone())]),
        thresholds(),
        shutdown.clone(),
    )
    .with_hostname("integration-host")
    .with_sink(Box::new(sink.clone()))
}

#[tokio::test(start_paused = true)]
async fn test_two_failures_then_success_completes_cycle() {
    let channel = RecordingChannel::default();
    let sink = RecordingSink::default();
    let mut collector = collector([None, None, Some(20.0)], &channel, &sink, &ShutdownSignal::new());

    let outcome = collector.run_cycle().await;

    assert_eq!(outcome, CycleOutcome::Completed { alerts: 0 });
    assert_eq!(collector.stats().errors(), 2);
    assert_eq!(collector.stats().skipped(), 0);
    assert_eq!(sink.count(), 1);
    assert_eq!(sink.samples.lock().unwrap()[0].metrics.cpu.cpu_usage, 20.0);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_skip_cycle_then_recover() {
    let channel = RecordingChannel::default();
    let sink = RecordingSink::default();
    let mut collector = collector([None, None, None, Some(20.0)], &channel, &sink, &ShutdownSignal::new());

    assert_eq!(collector.run_cycle().await, CycleOutcome::Skipped);
    assert_eq!(sink.count(), 0, "skipped cycle must not reach sinks");

    assert_eq!(collector.run_cycle().await, CycleOutcome::Completed { alerts: 0 });
    assert_eq!(sink.count(), 1);
    assert_eq!(collector.stats().cycles(), 2);
    assert_eq!(collector.stats().attempts(), 4);
    assert_eq!(collector.stats().error_rate(), 0.75);
}

#[tokio::test(start_paused = true)]
async fn test_sustained_breach_alerts_once_per_cooldown() {
    let channel = RecordingChannel::default();
    let sink = RecordingSink::default();
    let mut collector = collector([Some(95.0), Some(96.0), Some(97.0)], &channel, &sink, &ShutdownSignal::new());

    for _ in 0..3 {
        collector.run_cycle().await;
    }

    assert_eq!(channel.messages(), ["ALERT: CPU is 95.0, exceeds threshold 90!"]);
    assert_eq!(sink.count(), 3);
    assert_eq!(collector.stats().alerts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_disk_breach_names_the_filesystem() {
    let channel = RecordingChannel::default();
    let sink = RecordingSink::default();
    let mut collector = CollectionLoop::new(
        ScriptedSource::new([Some(10.0)]).with_disk_percent(95.0),
        AlertEngine::new(vec![Box::new(channel.clone())]),
        thresholds(),
        ShutdownSignal::new(),
    )
    .with_sink(Box::new(sink.clone()));

    assert_eq!(collector.run_cycle().await, CycleOutcome::Completed { alerts: 1 });
    assert_eq!(channel.messages(), ["ALERT: DISK:/ is 95.0, exceeds threshold 90!"]);

    // the unreadable partition is skipped, not fatal
    let samples = sink.samples.lock().unwrap();
    assert_eq!(samples[0].metrics.disk.keys().collect::<Vec<_>>(), ["/"]);
    assert_eq!(samples[0].metrics.disk["/"].total_gb, 100.0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_interrupts_long_sleep() {
    let channel = RecordingChannel::default();
    let sink = RecordingSink::default();
    let shutdown = ShutdownSignal::new();
    let collector = collector([Some(10.0)], &channel, &sink, &shutdown).with_interval(Duration::from_secs(300));

    let started = Instant::now();
    let handle = tokio::spawn(collector.run());

    tokio::time::sleep(Duration::from_millis(500)).await;
    shutdown.trigger("test");

    let stats = tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("loop did not stop within 1s")
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(stats.cycles(), 1);
    assert_eq!(sink.count(), 1, "final shutdown sample is not written to sinks");
}

#[tokio::test(start_paused = true)]
async fn test_loop_runs_cycles_at_interval() {
    let channel = RecordingChannel::default();
    let sink = RecordingSink::default();
    let shutdown = ShutdownSignal::new();
    let collector = collector([], &channel, &sink, &shutdown).with_interval(Duration::from_secs(60));

    let handle = tokio::spawn(collector.run());

    // cycles at t=0, 60, 120
    tokio::time::sleep(Duration::from_secs(150)).await;
    shutdown.trigger("test");

    let stats = handle.await.unwrap();
    assert_eq!(stats.cycles(), 3);
    assert_eq!(stats.completed(), 3);
    assert_eq!(sink.count(), 3);
}

#[tokio::test]
async fn test_new_loop_is_idle() {
    let collector = collector([], &RecordingChannel::default(), &RecordingSink::default(), &ShutdownSignal::new());
    assert_eq!(collector.state(), LoopState::Idle);
    assert_eq!(collector.engine().channel_names(), ["recording"]);
}
