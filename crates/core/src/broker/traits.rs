//! Trait definitions for the broker module.

use async_trait::async_trait;

use super::error::BrokerError;
use super::types::{DeliveryStream, Envelope};

/// A process-wide broker connection.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Returns the name of this broker implementation.
    fn name(&self) -> &str;

    /// Opens a new channel on the shared connection.
    async fn open_channel(&self) -> Result<Box<dyn Channel>, BrokerError>;
}

/// A session owned by exactly one unit of concurrency.
///
/// Dropping a channel releases everything it owns: reply queues it declared
/// are deleted and deliveries it never acknowledged go back to their queue.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Declares the named, shared work queue. Idempotent.
    async fn declare_work_queue(&self, name: &str) -> Result<(), BrokerError>;

    /// Declares an exclusive, auto-deleting reply queue and returns its
    /// broker-allocated address.
    async fn declare_reply_queue(&self) -> Result<String, BrokerError>;

    /// Publishes an envelope to a work queue or reply address.
    ///
    /// Publishing to an address nobody listens on is not an error; the
    /// message is dropped by the broker.
    async fn publish(&self, destination: &str, envelope: Envelope) -> Result<(), BrokerError>;

    /// Starts consuming from a queue with manual acknowledgement.
    async fn consume(&self, queue: &str) -> Result<DeliveryStream, BrokerError>;

    /// Closes the channel.
    async fn close(&self) -> Result<(), BrokerError>;
}

/// Settles a single delivery.
#[async_trait]
pub trait Acker: Send + Sync {
    /// Confirms the delivery was handled.
    async fn ack(self: Box<Self>) -> Result<(), BrokerError>;

    /// Rejects the delivery; with `requeue` the broker delivers it again.
    async fn nack(self: Box<Self>, requeue: bool) -> Result<(), BrokerError>;
}
