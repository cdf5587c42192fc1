//! RPC gateway client.
//!
//! Turns a thumbnail request into a broker round trip: publish on the work
//! queue, wait on a private reply queue for the answer carrying the request's
//! key as correlation id, cache what comes back.
//!
//! # Example
//!
//! ```ignore
//! use soda_core::rpc::ThumbnailClient;
//!
//! let client = ThumbnailClient::new(broker, cache, config.thumbnail.clone(), &config.broker.work_queue);
//! let url = client
//!     .dispatch(&ThumbnailRequest::new("http://host/video.mp4", "abc123"))
//!     .await?;
//! ```

mod client;
mod error;

pub use client::ThumbnailClient;
pub use error::RpcError;
