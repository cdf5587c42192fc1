//! Startup plumbing shared by the gateway and the standalone worker.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use soda_core::{
    load_config, validate_config, Broker, Config, FfmpegTranscoder, LitterboxStore, PoolSettings,
    Transcoder, WorkerPool,
};

/// Initialize logging from `RUST_LOG`.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Load and validate the file named by `SODA_CONFIG` (default `config.toml`).
pub fn load_config_from_env() -> Result<Config> {
    let config_path = std::env::var("SODA_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    Ok(config)
}

/// Build a worker pool with the ffmpeg transcoder and the litterbox store.
/// The pool is not started.
pub async fn build_worker_pool(config: &Config, broker: Arc<dyn Broker>) -> Result<WorkerPool> {
    let transcoder = FfmpegTranscoder::new(config.transcoder.clone());
    if let Err(e) = transcoder.validate().await {
        // Every job will come back empty until this is fixed.
        warn!("Transcoder {} is not usable: {}", transcoder.name(), e);
    }

    let store =
        LitterboxStore::new(config.store.clone()).context("Failed to create content store")?;

    Ok(WorkerPool::new(
        broker,
        Arc::new(transcoder),
        Arc::new(store),
        PoolSettings::from_config(config),
    ))
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
