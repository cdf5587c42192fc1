//! Error types for the RPC gateway client.

use thiserror::Error;

use crate::broker::BrokerError;
use crate::protocol::ProtocolError;

/// Errors returned by `ThumbnailClient::dispatch`.
///
/// A soft failure on the worker side is not an error; it arrives as an empty
/// result.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Thumbnail generation is switched off.
    #[error("Thumbnail generation is disabled")]
    Disabled,

    /// The source extension is on the denylist.
    #[error("Unsupported format: .{extension}")]
    UnsupportedFormat { extension: String },

    /// No matching reply arrived before the deadline.
    #[error("No reply for {key} within {timeout_secs} seconds")]
    Timeout { key: String, timeout_secs: u64 },

    /// The broker could not be reached or failed mid-call.
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    /// The request could not be encoded.
    #[error("{0}")]
    Encode(#[from] ProtocolError),
}

impl RpcError {
    /// Metric label for this error.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::UnsupportedFormat { .. } => "rejected",
            Self::Timeout { .. } => "timeout",
            Self::Broker(_) | Self::Encode(_) => "error",
        }
    }
}
