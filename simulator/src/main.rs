use anyhow::Context;
use clap::Parser;
use sicbo_simulator::{Api, Config, Simulator};
use std::{path::PathBuf, sync::Arc};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(short, long)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse args
    let args = Args::parse();

    // Load config
    let raw = std::fs::read_to_string(&args.config)
        .with_context(|| format!("failed to read {}", args.config.display()))?;
    let config: Config = serde_yaml::from_str(&raw).context("failed to parse config")?;
    let config = config.validate().context("invalid config")?;

    // Create logger
    let logger = tracing_subscriber::fmt().with_max_level(config.log_level);
    if config.json_logs {
        logger.json().init();
    } else {
        logger.init();
    }

    let simulator = Arc::new(Simulator::new(&config).await);
    let api = Api::new(simulator);
    let app = api.router();

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on {}", addr);
    axum::serve(listener, app)
        .await
        .context("axum server error")?;

    Ok(())
}
