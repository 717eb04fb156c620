//! Loading configuration files from disk

use std::io::Write;
use std::time::Duration;

use assert_matches::assert_matches;
use resource_monitor::{
    alerts::{AlertEngine, ThresholdConfig},
    config::{ConfigError, read_config_file},
    util::http_client,
};
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_minimal_file_builds_alerting_pipeline() {
    let file = write_config(
        r#"
metrics:
  interval: 15
alerting:
  cpu_threshold: 90
  disk_threshold: 85
"#,
    );

    let config = read_config_file(file.path()).unwrap();
    assert_eq!(config.metrics.interval(), Duration::from_secs(15));
    assert!(config.cloud.is_none());
    assert!(config.influxdb.is_none());

    let thresholds = ThresholdConfig::from(&config.alerting);
    assert_eq!(thresholds.limit_for("cpu"), Some(90.0));
    assert_eq!(thresholds.limit_for("disk:/var"), Some(85.0));
    assert_eq!(thresholds.limit_for("memory"), None);
    assert_eq!(thresholds.cooldown_for("cpu"), Duration::from_secs(600));

    let engine = AlertEngine::from_config(&config.alerting, &http_client().unwrap()).unwrap();
    assert_eq!(engine.channel_names(), ["log"]);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = read_config_file(dir.path().join("missing.yaml"));

    assert_matches!(result, Err(ConfigError::Io { .. }));
}

#[test]
fn test_malformed_yaml_is_parse_error() {
    let file = write_config("metrics: [interval");
    assert_matches!(read_config_file(file.path()), Err(ConfigError::Parse(_)));
}

#[test]
fn test_enabled_slack_without_url_is_rejected() {
    let file = write_config(
        r#"
alerting:
  slack:
    enabled: true
"#,
    );

    let err = read_config_file(file.path()).unwrap_err();
    assert_matches!(err, ConfigError::Invalid(_));
    assert!(err.to_string().contains("webhook_url"));
}
