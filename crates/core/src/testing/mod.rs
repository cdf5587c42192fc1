//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external capability
//! traits, so the gateway client and the worker pool can be exercised end to
//! end over a `MemoryBroker` without ffmpeg or network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use soda_core::testing::{MockContentStore, MockTranscoder};
//!
//! let transcoder = Arc::new(MockTranscoder::new());
//! let store = Arc::new(MockContentStore::with_url("https://store.example/abc.webp"));
//!
//! // Configure behavior
//! transcoder.set_delay(Duration::from_millis(200)).await;
//! store.set_fail_all(true).await;
//!
//! // Build a WorkerPool with them...
//! ```

mod mock_store;
mod mock_transcoder;

pub use mock_store::{MockContentStore, RecordedUpload};
pub use mock_transcoder::MockTranscoder;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::protocol::ThumbnailRequest;

    /// A request for a video thumbnail.
    pub fn video_request(key: &str) -> ThumbnailRequest {
        ThumbnailRequest::new(format!("http://media.example/{}.mp4", key), key)
    }
}
