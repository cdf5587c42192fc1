//! Worker pool answering thumbnail requests from the work queue.
//!
//! A fixed number of long-lived tasks compete on the shared work queue. Each
//! task owns its own broker channel and handles one request at a time:
//! transcode, upload, reply, and only then acknowledge. A worker that dies
//! between dequeue and acknowledgement leaves the request unacknowledged, so
//! the broker hands it to another worker.
//!
//! # Example
//!
//! ```ignore
//! use soda_core::worker::{PoolSettings, WorkerPool};
//!
//! let pool = WorkerPool::new(broker, transcoder, store, PoolSettings::from_config(&config));
//! pool.start().await?;
//! // ...
//! pool.stop().await;
//! ```

mod pool;
mod types;

pub use pool::WorkerPool;
pub use types::{PoolSettings, PoolStatus};
