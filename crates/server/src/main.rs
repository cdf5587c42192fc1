use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};

use soda_core::{connect_broker, DirectoryScraper, ThumbnailClient, TtlCache};
use soda_server::api::create_router;
use soda_server::bootstrap::{
    build_worker_pool, init_tracing, load_config_from_env, shutdown_signal,
};
use soda_server::state::AppState;

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
    info!(
        "Thumbnails {}, broker backend {:?}, in-process workers {}",
        if config.thumbnail.enabled { "enabled" } else { "disabled" },
        config.broker.backend,
        config.worker.enabled
    );

    // Thumbnail result cache
    let cache = Arc::new(TtlCache::with_max_entries(
        config.thumbnail.cache_max_entries,
    ));

    // One broker connection for the whole process; failing here is fatal
    let broker = if config.thumbnail.enabled || config.worker.enabled {
        Some(
            connect_broker(&config.broker)
                .await
                .context("Failed to connect to broker")?,
        )
    } else {
        info!("Thumbnails and workers disabled, not connecting to a broker");
        None
    };

    // Optionally host the worker pool in this process
    let worker_pool = match (&broker, config.worker.enabled) {
        (Some(broker), true) => {
            let pool = build_worker_pool(&config, Arc::clone(broker)).await?;
            pool.start().await.context("Failed to start worker pool")?;
            Some(Arc::new(pool))
        }
        _ => None,
    };

    let thumbnails = match &broker {
        Some(broker) if config.thumbnail.enabled => ThumbnailClient::new(
            Arc::clone(broker),
            Arc::clone(&cache),
            config.thumbnail.clone(),
            config.broker.work_queue.clone(),
        ),
        _ => ThumbnailClient::disabled(Arc::clone(&cache)),
    };

    let scraper = DirectoryScraper::new(&config.scraper).context("Failed to create scraper")?;

    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::new(thumbnails),
        scraper,
        worker_pool.clone(),
    ));

    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");

    if let Some(pool) = &worker_pool {
        pool.stop().await;
    }

    info!("Shutdown complete");
    Ok(())
}
