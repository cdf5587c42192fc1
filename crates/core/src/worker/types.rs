//! Types for the worker pool.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::config::Config;

/// Settings the pool takes from the broker, worker and transcoder sections.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub pool_size: usize,
    pub work_queue: String,
    pub requeue_malformed: bool,
    pub reconnect_delay: Duration,
    /// Where thumbnails are written before upload.
    pub output_dir: PathBuf,
}

impl PoolSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            pool_size: config.worker.pool_size,
            work_queue: config.broker.work_queue.clone(),
            requeue_malformed: config.worker.requeue_malformed,
            reconnect_delay: Duration::from_millis(config.broker.reconnect_delay_ms),
            output_dir: config.transcoder.output_dir.clone(),
        }
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Snapshot of the pool's counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolStatus {
    pub running: bool,
    pub pool_size: usize,
    /// Workers currently processing a request.
    pub active: u64,
    /// Requests answered (including soft failures).
    pub processed: u64,
    /// Requests answered with an empty result.
    pub soft_failures: u64,
    /// Requests whose body could not be decoded.
    pub malformed: u64,
}

/// Live counters shared by the workers.
#[derive(Debug, Default)]
pub(crate) struct PoolStats {
    pub active: AtomicU64,
    pub processed: AtomicU64,
    pub soft_failures: AtomicU64,
    pub malformed: AtomicU64,
}

impl PoolStats {
    pub fn snapshot(&self, running: bool, pool_size: usize) -> PoolStatus {
        PoolStatus {
            running,
            pool_size,
            active: self.active.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            soft_failures: self.soft_failures.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
        }
    }
}
