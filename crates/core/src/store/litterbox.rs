//! Litterbox (catbox.moe temporary hosting) client.

use async_trait::async_trait;
use reqwest::{multipart, Body, Client};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use super::error::StoreError;
use super::traits::ContentStore;
use crate::config::StoreConfig;

/// Uploads files to litterbox with a fixed retention.
pub struct LitterboxStore {
    client: Client,
    config: StoreConfig,
}

impl LitterboxStore {
    /// Creates a new store client.
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// Builds the upload form. The file is streamed straight into the
    /// request body.
    async fn build_form(&self, path: &Path) -> Result<multipart::Form, StoreError> {
        let file = tokio::fs::File::open(path).await?;
        let length = file.metadata().await?.len();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "thumbnail.webp".to_string());

        let part = multipart::Part::stream_with_length(Body::from(file), length)
            .file_name(file_name)
            .mime_str("image/webp")?;

        Ok(multipart::Form::new()
            .text("reqtype", "fileupload")
            .text("time", self.config.expiry.clone())
            .part("fileToUpload", part))
    }
}

/// Litterbox answers with the bare URL of the hosted file.
fn hosted_url(body: &str) -> Result<String, StoreError> {
    let url = body.trim();
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(url.to_string())
    } else {
        Err(StoreError::InvalidResponse(url.chars().take(200).collect()))
    }
}

#[async_trait]
impl ContentStore for LitterboxStore {
    fn name(&self) -> &str {
        "litterbox"
    }

    async fn upload(&self, path: &Path) -> Result<String, StoreError> {
        let form = self.build_form(path).await?;

        let response = self
            .client
            .post(&self.config.upload_url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let url = hosted_url(&body)?;
        debug!("Uploaded {} to {}", path.display(), url);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosted_url_accepts_url() {
        let url = hosted_url("https://litter.catbox.moe/abc123.webp\n").unwrap();
        assert_eq!(url, "https://litter.catbox.moe/abc123.webp");
    }

    #[test]
    fn test_hosted_url_rejects_error_text() {
        let result = hosted_url("No files given.");
        assert!(matches!(result, Err(StoreError::InvalidResponse(_))));
        assert!(hosted_url("").is_err());
    }

    #[tokio::test]
    async fn test_upload_missing_file_fails() {
        let store = LitterboxStore::new(StoreConfig::default()).unwrap();
        let result = store.upload(Path::new("/nonexistent/thumb.webp")).await;
        assert!(matches!(result, Err(StoreError::Io(_))));
    }

    #[tokio::test]
    async fn test_upload_unreachable_host_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thumb.webp");
        std::fs::write(&path, b"RIFF").unwrap();

        let store = LitterboxStore::new(StoreConfig {
            upload_url: "http://127.0.0.1:1/api.php".to_string(),
            timeout_secs: 2,
            ..Default::default()
        })
        .unwrap();

        let result = store.upload(&path).await;
        assert!(matches!(result, Err(StoreError::Http(_))));
    }
}
