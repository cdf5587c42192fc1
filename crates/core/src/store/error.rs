//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur while uploading a file.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Could not read the local file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The request did not complete.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The host answered with a non-success status.
    #[error("Upload rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The host answered 2xx but the body is not a URL.
    #[error("Unexpected upload response: {0}")]
    InvalidResponse(String),
}
