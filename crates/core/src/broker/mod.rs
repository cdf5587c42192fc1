//! Broker module for the request/reply transport.
//!
//! This module provides the `Broker` and `Channel` traits the RPC gateway and
//! the worker pool talk through, plus two backends:
//!
//! - `NatsBroker`: JetStream work queue with explicit acks, inbox subscriptions
//!   as reply sessions
//! - `MemoryBroker`: in-process queues with the same delivery semantics, used
//!   when the pool shares the gateway process and in tests
//!
//! A `Broker` is the process-wide connection and is shared behind an `Arc`.
//! Every unit of concurrency (one worker, one in-flight gateway call) opens its
//! own `Channel` and never shares it.
//!
//! # Example
//!
//! ```ignore
//! use soda_core::broker::{Broker, Envelope, MemoryBroker};
//!
//! let broker = MemoryBroker::new();
//! let channel = broker.open_channel().await?;
//! channel.declare_work_queue("thumbnail").await?;
//!
//! let reply_to = channel.declare_reply_queue().await?;
//! channel
//!     .publish("thumbnail", Envelope::new(body, "application/json").with_reply_to(reply_to))
//!     .await?;
//! ```

mod error;
mod memory;
mod nats;
mod traits;
mod types;

pub use error::BrokerError;
pub use memory::MemoryBroker;
pub use nats::NatsBroker;
pub use traits::{Acker, Broker, Channel};
pub use types::{Delivery, DeliveryStream, Envelope};

use std::sync::Arc;

use crate::config::{BrokerBackend, BrokerConfig};

/// Connect to the configured broker backend.
///
/// Failing to connect here is fatal to the caller; steady-state reconnection
/// is handled inside the backend.
pub async fn connect_broker(config: &BrokerConfig) -> Result<Arc<dyn Broker>, BrokerError> {
    match config.backend {
        BrokerBackend::Nats => Ok(Arc::new(NatsBroker::connect(config).await?)),
        BrokerBackend::Memory => Ok(Arc::new(MemoryBroker::new())),
    }
}
