//! Correlation protocol shared by the gateway client and the workers.
//!
//! A request travels as a JSON body on the work queue. Its `filename` field is
//! both the cache key and the correlation id of the exchange. The reply is a
//! raw text body holding the hosted URL, or nothing at all when the worker
//! could not produce a thumbnail.
//!
//! # Example
//!
//! ```ignore
//! use soda_core::protocol::{ThumbnailRequest, ThumbnailReply};
//!
//! let request = ThumbnailRequest::new("http://host/video.mp4", "abc123");
//! let envelope = request.to_envelope(&reply_to)?;
//!
//! // ... on the worker side
//! let request = ThumbnailRequest::decode(&delivery.envelope.body)?;
//! let reply = ThumbnailReply::new(request.key(), "https://store.example/abc.webp");
//! channel.publish(&reply_to, reply.into_envelope()).await?;
//! ```

mod types;

pub use types::{
    source_extension, ProtocolError, ThumbnailReply, ThumbnailRequest, REPLY_CONTENT_TYPE,
    REQUEST_CONTENT_TYPE,
};
