//! Mock transcoder for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::transcoder::{TranscodeError, Transcoder};

/// Mock implementation of the Transcoder trait.
///
/// Provides controllable behavior for testing:
/// - Writes a small placeholder image to the requested path
/// - Simulates slow transcodes and failures
/// - Tracks how many transcodes run at the same time
///
/// # Example
///
/// ```rust,ignore
/// use soda_core::testing::MockTranscoder;
///
/// let transcoder = MockTranscoder::new();
/// transcoder.set_delay(Duration::from_millis(300)).await;
///
/// // ... run requests through a pool
///
/// assert_eq!(transcoder.max_concurrent(), 3);
/// ```
#[derive(Debug, Default)]
pub struct MockTranscoder {
    /// Source URLs of every transcode call.
    calls: Arc<RwLock<Vec<String>>>,
    /// If set, the next transcode will fail with this error.
    next_error: Arc<RwLock<Option<TranscodeError>>>,
    /// Fail every call.
    fail_all: Arc<RwLock<bool>>,
    /// Simulated transcode duration.
    delay: Arc<RwLock<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockTranscoder {
    /// Create a new mock transcoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Source URLs passed to `transcode`, in call order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }

    /// Get the number of transcodes performed.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Configure the next transcode to fail with the given error.
    pub async fn set_next_error(&self, error: TranscodeError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make every transcode fail.
    pub async fn set_fail_all(&self, fail: bool) {
        *self.fail_all.write().await = fail;
    }

    /// Set the simulated transcode duration.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Transcodes currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of transcodes seen running at once.
    pub fn max_concurrent(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn run(&self, dest: &Path) -> Result<PathBuf, TranscodeError> {
        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }
        if *self.fail_all.read().await {
            return Err(TranscodeError::failed("mock failure", None));
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, b"RIFF\0\0\0\0WEBP").await?;
        Ok(dest.to_path_buf())
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn transcode(&self, source_url: &str, dest: &Path) -> Result<PathBuf, TranscodeError> {
        self.calls.write().await.push(source_url.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let result = self.run(dest).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        result
    }

    async fn validate(&self) -> Result<(), TranscodeError> {
        Ok(())
    }
}
