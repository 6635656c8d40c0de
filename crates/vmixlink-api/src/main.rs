use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use vmixlink_api::ApiServer;
use vmixlink_config::ConfigLoader;

/// vMix profile data server
#[derive(Debug, Parser)]
#[command(name = "vmixlink-server", version, about)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding profile files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Interface to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_file(path);
    }
    if let Some(dir) = &args.data_dir {
        loader = loader.with_override("data_dir", dir.display());
    }
    if let Some(host) = &args.host {
        loader = loader.with_override("host", host);
    }
    if let Some(port) = args.port {
        loader = loader.with_override("port", port);
    }
    let config = loader.load().context("failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let server = ApiServer::new(config).await?;
    let listener = server.bind().await.context("failed to bind server address")?;
    server.serve(listener, shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
