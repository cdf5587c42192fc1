//! NATS backend: JetStream work queue, inbox subscriptions for replies.

use async_nats::jetstream::{self, consumer, stream, AckKind};
use async_nats::{Client, ConnectOptions, HeaderMap};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::error::BrokerError;
use super::traits::{Acker, Broker, Channel};
use super::types::{Delivery, DeliveryStream, Envelope};
use crate::config::BrokerConfig;

const HEADER_CONTENT_TYPE: &str = "Content-Type";
const HEADER_CORRELATION_ID: &str = "Correlation-Id";
const HEADER_REPLY_TO: &str = "Reply-To";

/// Subjects under this prefix are core NATS inboxes, not JetStream subjects.
const INBOX_PREFIX: &str = "_INBOX.";

/// Shared NATS connection.
pub struct NatsBroker {
    client: Client,
    jetstream: jetstream::Context,
    ack_wait: Duration,
}

impl NatsBroker {
    /// Connects to the server named in `config.url`.
    pub async fn connect(config: &BrokerConfig) -> Result<Self, BrokerError> {
        let client = ConnectOptions::new()
            .name("soda")
            .connect(config.url.as_str())
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;

        info!("Connected to NATS at {}", crate::config::redact_credentials(&config.url));

        let jetstream = jetstream::new(client.clone());
        Ok(Self {
            client,
            jetstream,
            ack_wait: Duration::from_secs(config.ack_wait_secs),
        })
    }
}

#[async_trait]
impl Broker for NatsBroker {
    fn name(&self) -> &str {
        "nats"
    }

    async fn open_channel(&self) -> Result<Box<dyn Channel>, BrokerError> {
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Box::new(NatsChannel {
            client: self.client.clone(),
            jetstream: self.jetstream.clone(),
            ack_wait: self.ack_wait,
            shutdown_tx,
        }))
    }
}

/// A logical session on the shared connection.
///
/// Subscriptions end when the channel is closed or dropped. Work deliveries
/// left unacknowledged are redelivered by JetStream after `ack_wait`.
pub struct NatsChannel {
    client: Client,
    jetstream: jetstream::Context,
    ack_wait: Duration,
    shutdown_tx: broadcast::Sender<()>,
}

impl NatsChannel {
    fn until_closed<S>(&self, stream: S) -> DeliveryStream
    where
        S: futures::Stream<Item = Result<Delivery, BrokerError>> + Send + 'static,
    {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        Box::pin(stream.take_until(async move {
            let _ = shutdown_rx.recv().await;
        }))
    }

    async fn consume_replies(&self, inbox: &str) -> Result<DeliveryStream, BrokerError> {
        let subscriber = self
            .client
            .subscribe(inbox.to_string())
            .await
            .map_err(|e| BrokerError::consume(inbox, e))?;

        let deliveries = subscriber.map(|message| {
            let envelope = envelope_from_parts(message.payload.to_vec(), message.headers.as_ref());
            Ok(Delivery::new(envelope, false, Box::new(NoopAcker)))
        });
        Ok(self.until_closed(deliveries))
    }

    async fn consume_work(&self, queue: &str) -> Result<DeliveryStream, BrokerError> {
        let stream = self
            .jetstream
            .get_stream(stream_name(queue))
            .await
            .map_err(|_| BrokerError::QueueNotFound(queue.to_string()))?;

        let consumer: consumer::PullConsumer = stream
            .get_or_create_consumer(
                &consumer_name(queue),
                consumer::pull::Config {
                    durable_name: Some(consumer_name(queue)),
                    ack_policy: consumer::AckPolicy::Explicit,
                    ack_wait: self.ack_wait,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| BrokerError::consume(queue, e))?;

        let messages = consumer
            .stream()
            .max_messages_per_batch(1)
            .messages()
            .await
            .map_err(|e| BrokerError::consume(queue, e))?;

        let queue_name = queue.to_string();
        let deliveries = messages.map(move |result| {
            let message = result.map_err(|e| BrokerError::consume(&queue_name, e))?;
            let redelivered = message
                .info()
                .map(|info| info.delivered > 1)
                .unwrap_or(false);
            let envelope = envelope_from_parts(message.payload.to_vec(), message.headers.as_ref());
            Ok(Delivery::new(
                envelope,
                redelivered,
                Box::new(JetStreamAcker { message }),
            ))
        });
        Ok(self.until_closed(deliveries))
    }
}

#[async_trait]
impl Channel for NatsChannel {
    async fn declare_work_queue(&self, name: &str) -> Result<(), BrokerError> {
        let config = stream::Config {
            name: stream_name(name),
            description: Some(format!("Work queue {}", name)),
            subjects: vec![name.to_string()],
            retention: stream::RetentionPolicy::WorkQueue,
            storage: stream::StorageType::Memory,
            ..Default::default()
        };

        self.jetstream
            .get_or_create_stream(config)
            .await
            .map_err(|e| BrokerError::declare(name, e))?;

        debug!("Declared work queue {}", name);
        Ok(())
    }

    async fn declare_reply_queue(&self) -> Result<String, BrokerError> {
        Ok(self.client.new_inbox())
    }

    async fn publish(&self, destination: &str, envelope: Envelope) -> Result<(), BrokerError> {
        let headers = headers_for(&envelope);
        let payload = envelope.body.into();

        if destination.starts_with(INBOX_PREFIX) {
            // Nobody subscribed means nobody hears it; core NATS drops it.
            return self
                .client
                .publish_with_headers(destination.to_string(), headers, payload)
                .await
                .map_err(|e| BrokerError::publish(destination, e));
        }

        self.jetstream
            .publish_with_headers(destination.to_string(), headers, payload)
            .await
            .map_err(|e| BrokerError::publish(destination, e))?
            .await
            .map_err(|e| BrokerError::publish(destination, e))?;
        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<DeliveryStream, BrokerError> {
        if queue.starts_with(INBOX_PREFIX) {
            self.consume_replies(queue).await
        } else {
            self.consume_work(queue).await
        }
    }

    async fn close(&self) -> Result<(), BrokerError> {
        let _ = self.shutdown_tx.send(());
        Ok(())
    }
}

impl Drop for NatsChannel {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
    }
}

struct JetStreamAcker {
    message: jetstream::Message,
}

#[async_trait]
impl Acker for JetStreamAcker {
    async fn ack(self: Box<Self>) -> Result<(), BrokerError> {
        self.message
            .ack()
            .await
            .map_err(|e| BrokerError::Ack(e.to_string()))
    }

    async fn nack(self: Box<Self>, requeue: bool) -> Result<(), BrokerError> {
        let kind = if requeue { AckKind::Nak(None) } else { AckKind::Term };
        self.message
            .ack_with(kind)
            .await
            .map_err(|e| BrokerError::Ack(e.to_string()))
    }
}

/// Core NATS messages carry no delivery state to settle.
struct NoopAcker;

#[async_trait]
impl Acker for NoopAcker {
    async fn ack(self: Box<Self>) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn nack(self: Box<Self>, _requeue: bool) -> Result<(), BrokerError> {
        Ok(())
    }
}

/// JetStream stream names may not contain subject tokens.
fn stream_name(queue: &str) -> String {
    let sanitized: String = queue
        .chars()
        .map(|c| match c {
            '.' | ' ' | '*' | '>' | '/' | '\\' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect();
    format!("SODA_{}", sanitized)
}

fn consumer_name(queue: &str) -> String {
    format!("{}_WORKERS", stream_name(queue))
}

fn headers_for(envelope: &Envelope) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(HEADER_CONTENT_TYPE, envelope.content_type.as_str());
    if let Some(correlation_id) = &envelope.correlation_id {
        headers.insert(HEADER_CORRELATION_ID, correlation_id.as_str());
    }
    if let Some(reply_to) = &envelope.reply_to {
        headers.insert(HEADER_REPLY_TO, reply_to.as_str());
    }
    headers
}

fn envelope_from_parts(body: Vec<u8>, headers: Option<&HeaderMap>) -> Envelope {
    let header = |name: &str| {
        headers
            .and_then(|h| h.get(name))
            .map(|value| value.as_str().to_string())
    };

    Envelope {
        body,
        content_type: header(HEADER_CONTENT_TYPE).unwrap_or_default(),
        correlation_id: header(HEADER_CORRELATION_ID),
        reply_to: header(HEADER_REPLY_TO),
    }
}
