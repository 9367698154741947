//! sockspipe - SOCKS5 proxy daemon
//!
//! Serves SOCKS5 (RFC 1928) with optional username/password authentication
//! (RFC 1929), configured from a TOML file with environment-variable and
//! command-line overrides.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sockspipe::config::ConfigManager;
use sockspipe::Server;

/// CLI arguments for sockspipe
#[derive(Parser, Debug)]
#[command(name = "sockspipe")]
#[command(about = "sockspipe - SOCKS5 proxy daemon")]
#[command(version)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Bind address (overrides config file)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long)]
    pub verbose: bool,

    /// Validate configuration and exit
    #[arg(long)]
    pub validate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    init_tracing(&args)?;

    info!("Starting sockspipe v{}", env!("CARGO_PKG_VERSION"));

    let mut config = if args.config.exists() {
        ConfigManager::load_from_file(&args.config)?
    } else {
        info!("Config file not found, checking environment variables");
        ConfigManager::load_from_env()?
    };

    if let Some(bind) = args.bind.as_deref() {
        config.server.bind_addr = bind
            .parse()
            .with_context(|| format!("Invalid bind address: {}", bind))?;
    }

    config
        .validate()
        .context("Final configuration validation failed")?;

    if args.validate_config {
        info!("Configuration is valid");
        info!("  Bind address: {}", config.server.bind_addr);
        info!(
            "  Authentication: {}",
            if config.auth.enabled { "enabled" } else { "disabled" }
        );
        return Ok(());
    }

    info!("Bind address: {}", config.server.bind_addr);
    info!(
        "Authentication: {}",
        if config.auth.enabled { "enabled" } else { "disabled" }
    );

    let server = if config.auth.enabled {
        Arc::new(Server::with_auth(config.credentials()))
    } else {
        Arc::new(Server::new())
    };

    let bind_addr = config.server.bind_addr.to_string();
    let acceptor = Arc::clone(&server);
    let server_handle = tokio::spawn(async move { acceptor.listen_and_serve(&bind_addr).await });

    wait_for_signal().await;
    info!("Initiating graceful shutdown");
    server.shutdown();

    match tokio::time::timeout(config.server.shutdown_timeout, server_handle).await {
        Ok(Ok(Ok(()))) => info!("Server shutdown complete"),
        Ok(Ok(Err(e))) => error!("Server error: {}", e),
        Ok(Err(e)) => error!("Server task failed: {}", e),
        Err(_) => warn!(
            "Shutdown timeout reached after {:?}",
            config.server.shutdown_timeout
        ),
    }

    Ok(())
}

/// Block until SIGTERM or Ctrl+C.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM"),
            _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C"),
        }
    }

    #[cfg(windows)]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl+C");
    }
}

/// Initialize tracing/logging
fn init_tracing(args: &CliArgs) -> Result<()> {
    let log_level = if args.verbose { "debug" } else { &args.log_level };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_ansi(true),
        )
        .with(env_filter)
        .init();

    Ok(())
}
