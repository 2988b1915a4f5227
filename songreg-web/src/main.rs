//! songreg-web - Song registry web service
//!
//! Serves the registration form and song list, relays registrations to the
//! BaaS platform, and receives its transaction-complete webhooks.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use songreg_common::config::{default_config_path, TomlConfig};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use songreg_web::blockapi::BlockApiClient;
use songreg_web::config::{resolve_log_level, CliOverrides, ServiceConfig};
use songreg_web::{build_router, AppState};

/// Command-line arguments for songreg-web
#[derive(Parser, Debug)]
#[command(name = "songreg-web")]
#[command(about = "Song registry relay to a blockchain-as-a-service platform")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "SONGREG_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind to
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// BaaS API base URL
    #[arg(long)]
    blockapi_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let toml_config = TomlConfig::load(&config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;

    // RUST_LOG wins over the configured level
    let level = resolve_log_level(args.log_level.clone(), &toml_config);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "songreg_web={0},songreg_common={0},tower_http={0}",
                level
            ))
        }))
        .init();

    info!(
        "Starting Song Registry (songreg-web) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    if config_path.exists() {
        info!("Config file: {}", config_path.display());
    } else {
        warn!("Config file {} not found, using environment and defaults", config_path.display());
    }

    let cli = CliOverrides {
        host: args.host,
        port: args.port,
        blockapi_url: args.blockapi_url,
    };
    let config = ServiceConfig::resolve(cli, &toml_config).context("Invalid configuration")?;

    let blockapi = BlockApiClient::new(&config.blockapi_base_url, config.blockapi_api_key.clone())
        .context("Failed to create BaaS client")?;
    info!("BaaS endpoint: {}", blockapi.task_url());
    if let Some(url) = &config.webhook_url {
        info!("BaaS notifications expected at {}", url);
    }

    let state = AppState::new(blockapi, &config.secret_key, config.webhook_url.clone());
    let app = build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        },
    }
}
