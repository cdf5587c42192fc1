//! Message types of the thumbnail exchange.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::broker::Envelope;

/// Content type of a request body.
pub const REQUEST_CONTENT_TYPE: &str = "application/json";

/// Content type of a reply body.
pub const REPLY_CONTENT_TYPE: &str = "text/plain";

/// Errors encoding or decoding protocol messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to decode request: {0}")]
    Decode(#[source] serde_json::Error),
}

/// A request for the thumbnail of one media URL.
///
/// Field names are part of the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailRequest {
    pub url: String,
    pub filename: String,
}

impl ThumbnailRequest {
    pub fn new(url: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            filename: filename.into(),
        }
    }

    /// The media to take a frame from.
    pub fn source_url(&self) -> &str {
        &self.url
    }

    /// Cache key and correlation id of this request.
    pub fn key(&self) -> &str {
        &self.filename
    }

    /// Encodes the request for the work queue, addressed back to `reply_to`.
    pub fn to_envelope(&self, reply_to: &str) -> Result<Envelope, ProtocolError> {
        let body = serde_json::to_vec(self).map_err(ProtocolError::Encode)?;
        Ok(Envelope::new(body, REQUEST_CONTENT_TYPE)
            .with_correlation_id(self.key())
            .with_reply_to(reply_to))
    }

    /// Decodes a request body.
    pub fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        serde_json::from_slice(body).map_err(ProtocolError::Decode)
    }
}

/// A worker's answer to one request.
///
/// An empty `result_url` is a soft failure, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailReply {
    pub correlation_id: String,
    pub result_url: String,
}

impl ThumbnailReply {
    pub fn new(correlation_id: impl Into<String>, result_url: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            result_url: result_url.into(),
        }
    }

    /// Reply for a request the worker could not turn into a thumbnail.
    pub fn empty(correlation_id: impl Into<String>) -> Self {
        Self::new(correlation_id, String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.result_url.is_empty()
    }

    pub fn into_envelope(self) -> Envelope {
        Envelope::new(self.result_url, REPLY_CONTENT_TYPE).with_correlation_id(self.correlation_id)
    }

    /// Reads a reply back from an envelope. A missing correlation id decodes
    /// as an empty one, which matches no pending request.
    pub fn from_envelope(envelope: Envelope) -> Self {
        Self {
            correlation_id: envelope.correlation_id.unwrap_or_default(),
            result_url: String::from_utf8_lossy(&envelope.body).into_owned(),
        }
    }
}

/// Lowercase file extension of a URL's path, ignoring query and fragment.
pub fn source_extension(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let path = match path.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map(|(_, p)| p).unwrap_or(""),
        None => path,
    };
    let file = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = file.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request = ThumbnailRequest::new("http://host/video.mp4", "abc123");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"url": "http://host/video.mp4", "filename": "abc123"})
        );
    }

    #[test]
    fn test_request_envelope_carries_correlation() {
        let request = ThumbnailRequest::new("http://host/video.mp4", "abc123");
        let envelope = request.to_envelope("amq.gen-1").unwrap();

        assert_eq!(envelope.content_type, REQUEST_CONTENT_TYPE);
        assert_eq!(envelope.correlation_id.as_deref(), Some("abc123"));
        assert_eq!(envelope.reply_to.as_deref(), Some("amq.gen-1"));
        assert_eq!(ThumbnailRequest::decode(&envelope.body).unwrap(), request);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            ThumbnailRequest::decode(b"not json"),
            Err(ProtocolError::Decode(_))
        ));
        assert!(ThumbnailRequest::decode(br#"{"url": "x"}"#).is_err());
    }

    #[test]
    fn test_reply_is_raw_text() {
        let envelope = ThumbnailReply::new("abc123", "https://store.example/abc.webp").into_envelope();
        assert_eq!(envelope.body, b"https://store.example/abc.webp");
        assert_eq!(envelope.content_type, REPLY_CONTENT_TYPE);

        let reply = ThumbnailReply::from_envelope(envelope);
        assert_eq!(reply.correlation_id, "abc123");
        assert!(!reply.is_empty());
    }

    #[test]
    fn test_empty_reply() {
        let reply = ThumbnailReply::empty("abc123");
        let envelope = reply.into_envelope();
        assert!(envelope.body.is_empty());
        assert!(ThumbnailReply::from_envelope(envelope).is_empty());
    }

    #[test]
    fn test_source_extension() {
        assert_eq!(source_extension("http://host/video.mp4"), Some("mp4".into()));
        assert_eq!(source_extension("http://host/a/b/Song.OGG"), Some("ogg".into()));
        assert_eq!(source_extension("http://host/clip.ogg?sig=1.mp4"), Some("ogg".into()));
        assert_eq!(source_extension("http://host/clip.webm#t=10"), Some("webm".into()));
        assert_eq!(source_extension("http://host/stream"), None);
        assert_eq!(source_extension("http://host.example"), None);
        assert_eq!(source_extension("http://host/.hidden"), None);
    }
}
