//! Process-wide tracing setup shared by both binaries

use clap::{Args, ValueEnum};
use tracing::metadata::LevelFilter;
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// One JSON object per event
    #[default]
    Json,
    /// Human readable, multi-line
    Pretty,
}

#[derive(Debug, Clone, Args)]
pub struct LogArgs {
    /// Output format of log events
    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,

    /// Most verbose level emitted by this program (dependencies stay at INFO)
    #[arg(long, default_value_t = LevelFilter::INFO)]
    pub log_level: LevelFilter,
}

impl Default for LogArgs {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            log_level: LevelFilter::INFO,
        }
    }
}

/// Install the global subscriber, writing to stderr.
///
/// Does nothing if a subscriber is already installed.
pub fn init(args: &LogArgs) {
    let targets = filter::Targets::new()
        .with_default(LevelFilter::INFO.min(args.log_level))
        .with_target(env!("CARGO_CRATE_NAME"), args.log_level)
        .with_target("resmon_agent", args.log_level)
        .with_target("resmon_ingest", args.log_level);

    let (json, pretty) = match args.log_format {
        LogFormat::Json => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .json()
                    .flatten_event(true)
                    .with_current_span(false),
            ),
            None,
        ),
        LogFormat::Pretty => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .pretty()
                    .with_ansi(true),
            ),
        ),
    };

    let _ = tracing_subscriber::registry()
        .with(json)
        .with(pretty)
        .with(targets)
        .try_init();
}
