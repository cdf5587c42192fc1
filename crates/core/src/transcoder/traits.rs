//! Trait definitions for the transcoder module.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::error::TranscodeError;

/// Produces a local thumbnail image from a media URL.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Returns the name of this transcoder implementation.
    fn name(&self) -> &str;

    /// Writes a thumbnail of `source_url` to `dest` and returns the path of
    /// the written image.
    async fn transcode(&self, source_url: &str, dest: &Path) -> Result<PathBuf, TranscodeError>;

    /// Validates that the transcoder is properly configured and ready.
    async fn validate(&self) -> Result<(), TranscodeError>;
}
