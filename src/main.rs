//! Tedit - Collaborative Layered Canvas Editor
//!
//! CLI entry point for the tedit relay server.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod server;

use server::RelayConfig;

/// Relay server for the tedit collaborative canvas
#[derive(Debug, Parser)]
#[command(name = "tedit", version)]
struct Cli {
    /// Address to bind
    #[arg(long, env = "TEDIT_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "TEDIT_PORT", default_value_t = 3001)]
    port: u16,

    /// Origin allowed to call the HTTP API ("*" disables the restriction)
    #[arg(long, env = "TEDIT_ALLOWED_ORIGIN", default_value = "http://localhost:3000")]
    allowed_origin: String,

    /// Directory for persisted document snapshots
    #[arg(long, env = "TEDIT_DATA_DIR", default_value = ".data/canvases")]
    data_dir: std::path::PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tedit=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    info!("Starting tedit relay v{}", env!("CARGO_PKG_VERSION"));

    let config = RelayConfig {
        host: cli.host,
        port: cli.port,
        allowed_origin: cli.allowed_origin,
        data_dir: Some(cli.data_dir),
    };
    server::run(config).await
}
