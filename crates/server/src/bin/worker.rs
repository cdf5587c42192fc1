//! Standalone worker pool: consumes thumbnail requests from the broker
//! without serving HTTP.

use anyhow::{bail, Context, Result};
use tracing::{error, info};

use soda_core::{connect_broker, BrokerBackend};
use soda_server::bootstrap::{
    build_worker_pool, init_tracing, load_config_from_env, shutdown_signal,
};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    init_tracing();

    let config = load_config_from_env()?;
    if config.broker.backend == BrokerBackend::Memory {
        bail!("The standalone worker needs a shared broker; the memory backend only works in-process");
    }

    let broker = connect_broker(&config.broker)
        .await
        .context("Failed to connect to broker")?;

    let pool = build_worker_pool(&config, broker).await?;
    pool.start().await.context("Failed to start worker pool")?;

    shutdown_signal().await;

    info!("Worker shutting down...");
    pool.stop().await;

    let status = pool.status();
    info!(
        "Processed {} requests ({} soft failures, {} malformed)",
        status.processed, status.soft_failures, status.malformed
    );
    Ok(())
}
