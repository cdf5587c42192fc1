//! Trait definitions for the store module.

use async_trait::async_trait;
use std::path::Path;

use super::error::StoreError;

/// Hosts a local file at a publicly fetchable URL.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Returns the name of this store implementation.
    fn name(&self) -> &str;

    /// Uploads the file at `path` in one shot and returns its hosted URL.
    async fn upload(&self, path: &Path) -> Result<String, StoreError>;
}
