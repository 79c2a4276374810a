//! smartupd daemon
//!
//! Tracks pending Home Assistant updates, installs them on request or on a
//! daily schedule and keeps a history of applied version changes.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use eyre::WrapErr;
use smartupd_core::{JsonFileStore, RESTART_GRACE};
use smartupd_hass::HassClient;
use tokio::sync::{broadcast, oneshot, watch};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod entry;
mod integration;
mod router;
mod state;

use crate::config::{Config, DaemonConfig, LogFormat};
use crate::entry::ConfigEntry;
use crate::integration::IntegrationContext;
use crate::state::AppState;

/// smartupd daemon
#[derive(Parser, Debug)]
#[command(name = "smartupd")]
#[command(about = "Home Assistant update tracker daemon", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the config file
    #[arg(short, long, env = "SMARTUPD_CONFIG")]
    config: Option<PathBuf>,

    /// Override the bind address
    #[arg(long)]
    bind: Option<String>,
}

fn init_tracing(daemon: &DaemonConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&daemon.log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match daemon.log_format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let mut config = Config::resolve(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.daemon.bind = bind;
    }
    init_tracing(&config.daemon);

    info!(version = env!("CARGO_PKG_VERSION"), "smartupd starting");
    match &config.source {
        Some(path) => info!(path = %path.display(), "loaded configuration"),
        None => warn!("no config file found, using defaults"),
    }

    let host = Arc::new(
        HassClient::new(&config.hass_connection()?)
            .wrap_err("failed to create Home Assistant client")?,
    );
    let storage_dir = config.daemon.storage_dir.clone();
    let entry = Arc::new(
        ConfigEntry::load(&storage_dir, config.options.clone())
            .await
            .wrap_err("failed to load options")?,
    );

    let (event_tx, _) = broadcast::channel(100);
    let (service_slot, service_rx) = watch::channel(None);

    let ctx = IntegrationContext {
        host,
        store: Arc::new(JsonFileStore::in_dir(&storage_dir)),
        aggregator: config.aggregator_settings(),
        publish: config.sensor_publish(),
        scan_interval: config.scan_interval(),
        restart_grace: RESTART_GRACE,
        event_tx: event_tx.clone(),
        service_slot: Arc::new(service_slot),
    };

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let supervisor = tokio::spawn(integration::supervise(
        ctx,
        entry.subscribe(),
        shutdown_rx,
    ));

    let state = Arc::new(AppState::new(
        service_rx,
        entry,
        event_tx,
        config.daemon.card_path.clone(),
    ));
    let app = router::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.daemon.bind)
        .await
        .wrap_err_with(|| format!("failed to bind {}", config.daemon.bind))?;
    info!(addr = %config.daemon.bind, storage = %storage_dir.display(), "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("shutting down");
    let _ = shutdown_tx.send(());
    supervisor.await?;

    Ok(())
}
