use clap::Parser;
use resource_monitor::{
    api::{ApiConfig, ApiState, spawn_ingestion_server},
    logging::{self, LogArgs},
    shutdown::{ShutdownSignal, listen_for_os_signals},
};
use tracing::info;

/// Bind settings come from `INGEST_ADDR`, `INGEST_PORT` and `INGEST_API_KEY`.
#[derive(Debug, Clone, Parser)]
#[command(name = "resmon-ingest", about = "Receives samples pushed by monitoring agents")]
struct Args {
    #[command(flatten)]
    log: LogArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    logging::init(&args.log);

    let config = ApiConfig::from_env();
    if config.api_key.is_none() {
        info!("INGEST_API_KEY not set, accepting unauthenticated metrics");
    }

    let shutdown = ShutdownSignal::new();
    let signals = listen_for_os_signals(shutdown.clone());

    let (_, server) = spawn_ingestion_server(config, ApiState::default(), shutdown).await?;

    server.await?;
    let _ = signals.await;
    Ok(())
}
