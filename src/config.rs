use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::trace;

/// Suffix every threshold key in the `alerting` section carries.
pub const THRESHOLD_SUFFIX: &str = "_threshold";

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// HTTP push sink (optional)
    pub cloud: Option<CloudConfig>,

    #[serde(default)]
    pub alerting: AlertingConfig,

    /// Time-series sink (optional)
    pub influxdb: Option<InfluxConfig>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct MetricsConfig {
    /// Seconds between two collection cycles
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Log collection statistics every N cycles
    #[serde(default = "default_stats_every")]
    pub stats_every: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            stats_every: default_stats_every(),
        }
    }
}

impl MetricsConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct CloudConfig {
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct InfluxConfig {
    pub url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub org: String,
    #[serde(default)]
    pub bucket: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct AlertingConfig {
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: u64,

    pub email: Option<EmailConfig>,

    pub slack: Option<SlackConfig>,

    #[serde(default)]
    pub log: LogAlertConfig,

    /// Every remaining key, e.g. `cpu_threshold: 90`
    #[serde(flatten)]
    pub thresholds: BTreeMap<String, f64>,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: default_cooldown_seconds(),
            email: None,
            slack: None,
            log: LogAlertConfig::default(),
            thresholds: BTreeMap::new(),
        }
    }
}

impl AlertingConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub smtp_server: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub to: String,
    /// Sender address; falls back to `username`
    pub from: Option<String>,
}

impl EmailConfig {
    pub fn sender(&self) -> &str {
        self.from.as_deref().unwrap_or(&self.username)
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct SlackConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub webhook_url: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct LogAlertConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for LogAlertConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_interval() -> u64 {
    60
}

fn default_stats_every() -> u64 {
    10
}

fn default_cooldown_seconds() -> u64 {
    600
}

fn default_smtp_port() -> u16 {
    587
}

fn default_true() -> bool {
    true
}

/// Errors that can occur while loading the configuration
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read
    Io { path: PathBuf, source: std::io::Error },

    /// The file is not valid YAML or does not match the expected shape
    Parse(serde_yaml::Error),

    /// The file parsed but contains unusable values
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read configuration file {}: {}", path.display(), source)
            }
            ConfigError::Parse(err) => write!(f, "malformed configuration: {}", err),
            ConfigError::Invalid(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse(err) => Some(err),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Parse(err)
    }
}

impl Config {
    pub fn from_yaml_str(content: &str) -> Result<Config, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.metrics.interval == 0 {
            return Err(ConfigError::Invalid(
                "metrics.interval must be greater than zero".into(),
            ));
        }

        if self.metrics.stats_every == 0 {
            return Err(ConfigError::Invalid(
                "metrics.stats_every must be greater than zero".into(),
            ));
        }

        for (key, limit) in &self.alerting.thresholds {
            if !key.ends_with(THRESHOLD_SUFFIX) {
                return Err(ConfigError::Invalid(format!("unknown alerting key `{key}`")));
            }
            if !limit.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "alerting.{key} must be a finite number"
                )));
            }
        }

        if let Some(email) = &self.alerting.email
            && email.enabled
        {
            let required = [
                ("smtp_server", &email.smtp_server),
                ("username", &email.username),
                ("password", &email.password),
                ("to", &email.to),
            ];
            for (name, value) in required {
                if value.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "alerting.email.{name} is required when email alerts are enabled"
                    )));
                }
            }
        }

        if let Some(slack) = &self.alerting.slack
            && slack.enabled
            && slack.webhook_url.is_empty()
        {
            return Err(ConfigError::Invalid(
                "alerting.slack.webhook_url is required when slack alerts are enabled".into(),
            ));
        }

        if let Some(cloud) = &self.cloud
            && cloud.endpoint.is_empty()
        {
            return Err(ConfigError::Invalid("cloud.endpoint must not be empty".into()));
        }

        if let Some(influx) = &self.influxdb
            && influx.url.is_empty()
        {
            return Err(ConfigError::Invalid("influxdb.url must not be empty".into()));
        }

        Ok(())
    }
}

pub fn read_config_file(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let file_content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Config::from_yaml_str(&file_content).inspect(|config| trace!("loaded config: {config:?}"))
}
