use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use storewatch::config::{AgentConfig, DEFAULT_CONFIG_PATH};
use storewatch::shutdown::ShutdownSignal;
use storewatch::{logging, Supervisor};

#[derive(Parser, Debug)]
#[command(name = "storewatch")]
#[command(about = "Samples MySQL and Redis runtime statistics and forwards derived metrics")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = AgentConfig::load(&args.config)?;
    let _log_guard = logging::init(&config.log)?;

    tracing::info!(
        config = %args.config.display(),
        sources = config.source_count(),
        "Starting storewatch"
    );
    if config.source_count() == 0 {
        tracing::warn!("No sources configured");
    }

    let mut signal = ShutdownSignal::install()?;
    let sink = config.sink.build();
    let flusher = sink.start();
    let supervisor = Supervisor::start(&config, &sink);

    let received = signal.recv().await?;
    tracing::info!(signal = received, "Shutting down");

    supervisor.shutdown().await;
    flusher.stop().await;
    Ok(())
}
