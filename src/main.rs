//! Configuration deployment service.
//!
//! # Architecture Overview
//!
//! ```text
//!   POST /api/config/import
//!   ───────────────────────▶ ┌────────┐   ┌──────────────┐   ┌─────────────┐
//!                            │  http  │──▶│ orchestrator │──▶│   staging   │ (temp dir)
//!                            │ server │   └──────┬───────┘   └──────┬──────┘
//!                            └────────┘          │                  ▼
//!                                                │           ┌─────────────┐
//!                                                │◀──report──│  validator  │ (external program)
//!                                                ▼           └─────────────┘
//!                                         ┌─────────────┐
//!                                         │ live store  │◀── watcher re-validates on change
//!                                         └─────────────┘
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use config_deployer::config::{load_config, DeployerConfig};
use config_deployer::config::watcher::LiveStoreWatcher;
use config_deployer::lifecycle::shutdown::DRAIN_TIMEOUT;
use config_deployer::observability::{logging, metrics};
use config_deployer::{AppState, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "config-deployer")]
#[command(about = "Stage, validate and promote configuration bundles", long_about = None)]
struct Args {
    /// Path to the TOML settings file (defaults are used when omitted).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => DeployerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_tracing(&config.observability);
    tracing::info!("config-deployer v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        config_dir = %config.store.config_dir.display(),
        validator_timeout_secs = config.validator.timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let shutdown = Shutdown::new();
    shutdown.listen_for_signals();

    let state = AppState::from_config(&config);

    // Held for the life of the process; dropping it stops file events
    let _watcher = if config.watcher.enabled {
        let watcher = LiveStoreWatcher::new(
            state.orchestrator.clone(),
            state.live_status.clone(),
            Duration::from_secs(config.watcher.poll_interval_secs),
        );
        match watcher.spawn(shutdown.subscribe()) {
            Ok((watcher, _task)) => Some(watcher),
            Err(e) => {
                tracing::error!(error = %e, "Failed to start live store watcher");
                None
            }
        }
    } else {
        None
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config, state);
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        result = &mut server_task => {
            result??;
        }
        _ = shutdown.wait() => {
            match tokio::time::timeout(DRAIN_TIMEOUT, server_task).await {
                Ok(result) => result??,
                Err(_) => tracing::warn!(
                    timeout_secs = DRAIN_TIMEOUT.as_secs(),
                    "Drain deadline passed, forcing exit"
                ),
            }
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
