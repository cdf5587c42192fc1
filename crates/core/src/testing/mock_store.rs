//! Mock content store for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::store::{ContentStore, StoreError};

/// A recorded upload for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub path: PathBuf,
    /// Whether the file existed when the upload started.
    pub existed: bool,
}

/// Mock implementation of the ContentStore trait.
///
/// Answers every upload with a fixed URL unless told to fail.
#[derive(Debug)]
pub struct MockContentStore {
    url: String,
    uploads: Arc<RwLock<Vec<RecordedUpload>>>,
    /// If set, the next upload will fail with this error.
    next_error: Arc<RwLock<Option<StoreError>>>,
    fail_all: Arc<RwLock<bool>>,
}

impl Default for MockContentStore {
    fn default() -> Self {
        Self::with_url("https://store.example/thumb.webp")
    }
}

impl MockContentStore {
    /// Create a new mock store with a default URL.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock store that answers with `url`.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            uploads: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            fail_all: Arc::new(RwLock::new(false)),
        }
    }

    /// Get all recorded uploads.
    pub async fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.read().await.clone()
    }

    /// Configure the next upload to fail with the given error.
    pub async fn set_next_error(&self, error: StoreError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make every upload fail.
    pub async fn set_fail_all(&self, fail: bool) {
        *self.fail_all.write().await = fail;
    }
}

#[async_trait]
impl ContentStore for MockContentStore {
    fn name(&self) -> &str {
        "mock"
    }

    async fn upload(&self, path: &Path) -> Result<String, StoreError> {
        let existed = tokio::fs::metadata(path).await.is_ok();
        self.uploads.write().await.push(RecordedUpload {
            path: path.to_path_buf(),
            existed,
        });

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }
        if *self.fail_all.read().await {
            return Err(StoreError::InvalidResponse("mock failure".to_string()));
        }
        if !existed {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "file to upload does not exist",
            )));
        }

        Ok(self.url.clone())
    }
}
