//! ObservIO API Server
//!
//! Run with: cargo run -- --config config.toml
//!
//! # Configuration
//!
//! Read from `--config`, else the first of
//! `~/.config/observio/config.toml`, `/etc/observio/config.toml`,
//! `./config.toml`, then overridden by `OBSERVIO_*` environment variables.
//! `RUST_LOG` takes precedence over `logging.level`.

use anyhow::Context;
use clap::Parser;
use observio::api::{serve, AppState};
use observio::config::{generate_default_config, Config, LoggingConfig};
use observio::engine::{ClickHouseHttp, QueryEngine};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "observio")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Explore API over a ClickHouse store")]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print a commented default config file and exit
    #[arg(long)]
    print_config: bool,

    /// Host to bind to (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_config {
        print!("{}", generate_default_config());
        return Ok(());
    }

    let mut config = match args.config {
        Some(ref path) => Config::load_with_env(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::load_default(),
    };
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    init_tracing(&config.logging);

    tracing::info!("Starting ObservIO API server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        url = %config.clickhouse.url,
        database = %config.clickhouse.database,
        "Using ClickHouse"
    );

    let engine: Arc<dyn QueryEngine> = Arc::new(
        ClickHouseHttp::new(config.clickhouse.clone()).context("creating ClickHouse client")?,
    );

    match engine.ping().await {
        Ok(()) => tracing::info!("ClickHouse connection verified"),
        Err(e) => tracing::warn!("ClickHouse not available: {} (requests will fail until it is)", e),
    }

    let state = AppState::new(engine, &config);
    serve(state, &config.server).await?;

    tracing::info!("ObservIO API server stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let json = logging.format.eq_ignore_ascii_case("json");

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}
