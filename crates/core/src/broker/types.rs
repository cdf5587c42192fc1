//! Message envelope and delivery types.

use futures::stream::BoxStream;
use std::fmt;

use super::error::BrokerError;
use super::traits::Acker;

/// A message as it travels through the broker.
///
/// A single broker hop preserves `correlation_id` and `reply_to` verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub body: Vec<u8>,
    pub content_type: String,
    pub correlation_id: Option<String>,
    pub reply_to: Option<String>,
}

impl Envelope {
    /// Creates an envelope without correlation metadata.
    pub fn new(body: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: content_type.into(),
            correlation_id: None,
            reply_to: None,
        }
    }

    /// Sets the correlation id.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Sets the reply address.
    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }
}

/// A received message that must be settled with `ack` or `nack`.
///
/// A delivery dropped without settling stays unacknowledged; the broker
/// redelivers it once the owning channel goes away.
pub struct Delivery {
    pub envelope: Envelope,
    /// Whether the broker delivered this message before.
    pub redelivered: bool,
    acker: Box<dyn Acker>,
}

impl Delivery {
    pub fn new(envelope: Envelope, redelivered: bool, acker: Box<dyn Acker>) -> Self {
        Self {
            envelope,
            redelivered,
            acker,
        }
    }

    /// Acknowledges the delivery.
    pub async fn ack(self) -> Result<(), BrokerError> {
        self.acker.ack().await
    }

    /// Negatively acknowledges the delivery.
    pub async fn nack(self, requeue: bool) -> Result<(), BrokerError> {
        self.acker.nack(requeue).await
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("envelope", &self.envelope)
            .field("redelivered", &self.redelivered)
            .finish_non_exhaustive()
    }
}

/// Stream of deliveries returned by `Channel::consume`.
pub type DeliveryStream = BoxStream<'static, Result<Delivery, BrokerError>>;
