//! Gateway-side thumbnail client.

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use super::error::RpcError;
use crate::broker::{Broker, BrokerError, Channel, DeliveryStream};
use crate::cache::TtlCache;
use crate::config::ThumbnailConfig;
use crate::metrics;
use crate::protocol::{source_extension, ThumbnailReply, ThumbnailRequest};

/// Synchronous-looking call surface over the broker round trip.
///
/// Cheap to share behind an `Arc`. Each cache miss opens its own channel and
/// reply queue, closed again when the call returns or times out.
pub struct ThumbnailClient {
    broker: Option<Arc<dyn Broker>>,
    cache: Arc<TtlCache<String>>,
    config: ThumbnailConfig,
    work_queue: String,
}

impl ThumbnailClient {
    /// Creates a client publishing to `work_queue` on `broker`.
    pub fn new(
        broker: Arc<dyn Broker>,
        cache: Arc<TtlCache<String>>,
        config: ThumbnailConfig,
        work_queue: impl Into<String>,
    ) -> Self {
        Self {
            broker: Some(broker),
            cache,
            config,
            work_queue: work_queue.into(),
        }
    }

    /// Creates a client that refuses every request without a broker.
    pub fn disabled(cache: Arc<TtlCache<String>>) -> Self {
        Self {
            broker: None,
            cache,
            config: ThumbnailConfig {
                enabled: false,
                ..Default::default()
            },
            work_queue: String::new(),
        }
    }

    /// Whether requests can be dispatched at all.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled && self.broker.is_some()
    }

    /// The shared result cache.
    pub fn cache(&self) -> &Arc<TtlCache<String>> {
        &self.cache
    }

    /// Returns the hosted thumbnail URL for `request`, possibly empty when the
    /// worker could not produce one.
    pub async fn dispatch(&self, request: &ThumbnailRequest) -> Result<String, RpcError> {
        let result = self.dispatch_inner(request).await;
        let outcome = match &result {
            Ok(DispatchOutcome::CacheHit(_)) => "cache_hit",
            Ok(DispatchOutcome::Replied(_)) => "replied",
            Err(e) => e.outcome_label(),
        };
        metrics::RPC_DISPATCHES.with_label_values(&[outcome]).inc();

        result.map(DispatchOutcome::into_url)
    }

    async fn dispatch_inner(&self, request: &ThumbnailRequest) -> Result<DispatchOutcome, RpcError> {
        let broker = match &self.broker {
            Some(broker) if self.config.enabled => broker,
            _ => return Err(RpcError::Disabled),
        };

        if let Some(extension) = source_extension(request.source_url()) {
            if self.is_denied(&extension) {
                info!(
                    "Rejecting thumbnail for {}: .{} is not supported",
                    request.key(),
                    extension
                );
                return Err(RpcError::UnsupportedFormat { extension });
            }
        }

        let key = request.key();
        if let Some(url) = self.cache.get(key) {
            debug!("Cache hit for {}", key);
            return Ok(DispatchOutcome::CacheHit(url));
        }

        let start = Instant::now();
        let result = self.round_trip(broker.as_ref(), request).await;
        let label = match &result {
            Ok(_) => "replied",
            Err(e) => e.outcome_label(),
        };
        metrics::RPC_ROUND_TRIP
            .with_label_values(&[label])
            .observe(start.elapsed().as_secs_f64());

        match result {
            Ok(url) => {
                if !url.is_empty() || self.config.cache_empty_results {
                    self.cache.set(
                        key,
                        url.clone(),
                        Duration::from_secs(self.config.cache_ttl_secs),
                    );
                }
                if url.is_empty() {
                    warn!("Worker returned no thumbnail for {}", key);
                } else {
                    info!("Thumbnail for {} ready in {:?}", key, start.elapsed());
                }
                Ok(DispatchOutcome::Replied(url))
            }
            Err(e) => {
                warn!("Thumbnail dispatch for {} failed: {}", key, e);
                Err(e)
            }
        }
    }

    fn is_denied(&self, extension: &str) -> bool {
        self.config
            .denied_extensions
            .iter()
            .any(|denied| denied.trim_start_matches('.').eq_ignore_ascii_case(extension))
    }

    async fn round_trip(
        &self,
        broker: &dyn Broker,
        request: &ThumbnailRequest,
    ) -> Result<String, RpcError> {
        let channel = broker.open_channel().await?;
        let result = self.exchange(channel.as_ref(), request).await;
        // Closing deletes the reply queue; a late reply is dropped by the broker.
        if let Err(e) = channel.close().await {
            debug!("Failed to close reply channel: {}", e);
        }
        result
    }

    async fn exchange(
        &self,
        channel: &dyn Channel,
        request: &ThumbnailRequest,
    ) -> Result<String, RpcError> {
        let key = request.key();
        let reply_to = channel.declare_reply_queue().await?;
        // Consume before publishing so a fast reply cannot be missed.
        let mut replies = channel.consume(&reply_to).await?;

        let envelope = request.to_envelope(&reply_to)?;
        channel.publish(&self.work_queue, envelope).await?;
        debug!("Published thumbnail request {} (reply to {})", key, reply_to);

        let deadline = Duration::from_secs(self.config.timeout_secs);
        match timeout(deadline, await_reply(&mut replies, key)).await {
            Ok(result) => result,
            Err(_) => Err(RpcError::Timeout {
                key: key.to_string(),
                timeout_secs: self.config.timeout_secs,
            }),
        }
    }
}

/// Waits for the reply correlated with `key`, dropping any other.
async fn await_reply(replies: &mut DeliveryStream, key: &str) -> Result<String, RpcError> {
    while let Some(delivery) = replies.next().await {
        let delivery = delivery?;
        let reply = ThumbnailReply::from_envelope(delivery.envelope.clone());
        if reply.correlation_id != key {
            warn!(
                "Dropping reply for {:?} while waiting on {}",
                reply.correlation_id, key
            );
            metrics::RPC_STRAY_REPLIES.inc();
            delivery.ack().await?;
            continue;
        }
        delivery.ack().await?;
        return Ok(reply.result_url);
    }
    Err(RpcError::Broker(BrokerError::Closed))
}

enum DispatchOutcome {
    CacheHit(String),
    Replied(String),
}

impl DispatchOutcome {
    fn into_url(self) -> String {
        match self {
            Self::CacheHit(url) | Self::Replied(url) => url,
        }
    }
}
