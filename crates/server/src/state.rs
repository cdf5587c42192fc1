use std::sync::Arc;
use soda_core::{Config, DirectoryScraper, SanitizedConfig, ThumbnailClient, TtlCache, WorkerPool};

/// Shared application state
pub struct AppState {
    config: Config,
    thumbnails: Arc<ThumbnailClient>,
    scraper: DirectoryScraper,
    worker_pool: Option<Arc<WorkerPool>>,
}

impl AppState {
    pub fn new(
        config: Config,
        thumbnails: Arc<ThumbnailClient>,
        scraper: DirectoryScraper,
        worker_pool: Option<Arc<WorkerPool>>,
    ) -> Self {
        Self {
            config,
            thumbnails,
            scraper,
            worker_pool,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn thumbnails(&self) -> &ThumbnailClient {
        &self.thumbnails
    }

    pub fn cache(&self) -> &Arc<TtlCache<String>> {
        self.thumbnails.cache()
    }

    pub fn scraper(&self) -> &DirectoryScraper {
        &self.scraper
    }

    /// The worker pool, when hosted in this process.
    pub fn worker_pool(&self) -> Option<&Arc<WorkerPool>> {
        self.worker_pool.as_ref()
    }
}
