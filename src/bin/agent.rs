use anyhow::Context;
use clap::Parser;
use resource_monitor::{
    alerts::{AlertEngine, ThresholdConfig},
    collector::CollectionLoop,
    config::{Config, read_config_file},
    logging::{self, LogArgs},
    sampler::SystemSource,
    shutdown::{ShutdownSignal, listen_for_os_signals},
    sinks::{CloudSink, InfluxSink, MetricSink},
    util::http_client,
};
use tracing::{error, info};

#[derive(Debug, Clone, Parser)]
#[command(name = "resmon-agent", about = "Samples this host and alerts on threshold breaches")]
struct Args {
    /// Config file
    #[arg(short, long, default_value = "config.yaml")]
    file: String,

    /// Run a single collection cycle and exit
    #[arg(long)]
    once: bool,

    #[command(flatten)]
    log: LogArgs,
}

fn sinks(config: &Config, client: &reqwest::Client) -> Vec<Box<dyn MetricSink>> {
    let mut sinks: Vec<Box<dyn MetricSink>> = vec![];

    if let Some(influx) = &config.influxdb {
        sinks.push(Box::new(InfluxSink::new(influx.clone(), client.clone())));
    }
    if let Some(cloud) = &config.cloud {
        sinks.push(Box::new(CloudSink::new(cloud, client.clone())));
    }

    sinks
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    logging::init(&args.log);

    let config = match read_config_file(&args.file) {
        Ok(config) => config,
        Err(e) => {
            error!(event = "config_error", file = %args.file, "{e}");
            return Err(e).with_context(|| format!("failed to load configuration from {}", args.file));
        }
    };

    let client = http_client()?;
    let engine = AlertEngine::from_config(&config.alerting, &client)?;
    let thresholds = ThresholdConfig::from(&config.alerting);
    if thresholds.is_empty() {
        info!("no thresholds configured, alerting is inactive");
    }

    let shutdown = ShutdownSignal::new();
    let signals = listen_for_os_signals(shutdown.clone());

    let collector = sinks(&config, &client).into_iter().fold(
        CollectionLoop::new(SystemSource::new(), engine, thresholds, shutdown.clone())
            .with_interval(config.metrics.interval())
            .with_stats_every(config.metrics.stats_every),
        CollectionLoop::with_sink,
    );

    let stats = if args.once {
        collector.run_once().await
    } else {
        collector.run().await
    };

    shutdown.trigger("collection finished");
    let _ = signals.await;

    info!(
        cycles = stats.cycles(),
        completed = stats.completed(),
        skipped = stats.skipped(),
        "agent exiting"
    );
    Ok(())
}
