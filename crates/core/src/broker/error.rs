//! Error types for the broker module.

use thiserror::Error;

/// Errors that can occur while talking to the broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Could not establish or keep the broker connection.
    #[error("Broker connection failed: {0}")]
    Connection(String),

    /// Could not open or use a channel.
    #[error("Broker channel error: {0}")]
    Channel(String),

    /// Declaring a queue failed.
    #[error("Failed to declare queue {queue}: {reason}")]
    Declare { queue: String, reason: String },

    /// Publishing a message failed.
    #[error("Failed to publish to {destination}: {reason}")]
    Publish { destination: String, reason: String },

    /// Registering or reading from a consumer failed.
    #[error("Failed to consume from {queue}: {reason}")]
    Consume { queue: String, reason: String },

    /// Acknowledging a delivery failed.
    #[error("Failed to acknowledge delivery: {0}")]
    Ack(String),

    /// The queue does not exist.
    #[error("Queue not found: {0}")]
    QueueNotFound(String),

    /// The channel was closed.
    #[error("Channel closed")]
    Closed,
}

impl BrokerError {
    /// Creates a new publish error.
    pub fn publish(destination: impl Into<String>, reason: impl ToString) -> Self {
        Self::Publish {
            destination: destination.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a new consume error.
    pub fn consume(queue: impl Into<String>, reason: impl ToString) -> Self {
        Self::Consume {
            queue: queue.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a new declare error.
    pub fn declare(queue: impl Into<String>, reason: impl ToString) -> Self {
        Self::Declare {
            queue: queue.into(),
            reason: reason.to_string(),
        }
    }
}
