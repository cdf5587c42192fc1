//! Worker pool runner.

use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::types::{PoolSettings, PoolStats, PoolStatus};
use crate::broker::{Broker, BrokerError, Channel, Delivery};
use crate::metrics;
use crate::protocol::{ThumbnailReply, ThumbnailRequest};
use crate::store::ContentStore;
use crate::transcoder::Transcoder;

/// Everything a worker task needs, shared by all of them.
struct WorkerContext {
    broker: Arc<dyn Broker>,
    transcoder: Arc<dyn Transcoder>,
    store: Arc<dyn ContentStore>,
    settings: PoolSettings,
    stats: Arc<PoolStats>,
}

/// Fixed-size pool of workers competing on the work queue.
pub struct WorkerPool {
    context: Arc<WorkerContext>,

    // Runtime state
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Create a new pool. Nothing runs until `start`.
    pub fn new(
        broker: Arc<dyn Broker>,
        transcoder: Arc<dyn Transcoder>,
        store: Arc<dyn ContentStore>,
        settings: PoolSettings,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            context: Arc::new(WorkerContext {
                broker,
                transcoder,
                store,
                settings,
                stats: Arc::new(PoolStats::default()),
            }),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Declare the work queue and spawn the workers.
    ///
    /// Fails if the work queue cannot be declared; later broker failures are
    /// handled inside each worker.
    pub async fn start(&self) -> Result<(), BrokerError> {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Worker pool already running");
            return Ok(());
        }

        let settings = &self.context.settings;
        info!(
            "Starting worker pool: {} workers on {} ({})",
            settings.pool_size,
            settings.work_queue,
            self.context.broker.name()
        );

        if let Err(e) = self.declare_work_queue().await {
            self.running.store(false, Ordering::SeqCst);
            return Err(e);
        }

        let mut handles = self.handles.lock().await;
        for id in 0..settings.pool_size {
            let context = Arc::clone(&self.context);
            let shutdown_rx = self.shutdown_tx.subscribe();
            handles.push(tokio::spawn(run_worker(id, context, shutdown_rx)));
        }

        info!("Worker pool started");
        Ok(())
    }

    /// Stop the pool and wait for every worker to finish its current request.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Worker pool not running");
            return;
        }

        info!("Stopping worker pool");

        // Signal shutdown to all workers
        let _ = self.shutdown_tx.send(());

        let handles: Vec<_> = self.handles.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                error!("Worker task failed: {}", e);
            }
        }

        info!("Worker pool stopped");
    }

    /// Get current pool status.
    pub fn status(&self) -> PoolStatus {
        self.context.stats.snapshot(
            self.running.load(Ordering::Relaxed),
            self.context.settings.pool_size,
        )
    }

    async fn declare_work_queue(&self) -> Result<(), BrokerError> {
        let channel = self.context.broker.open_channel().await?;
        channel
            .declare_work_queue(&self.context.settings.work_queue)
            .await?;
        channel.close().await
    }
}

/// One pool slot: consume until shutdown, reopening the channel on failure.
async fn run_worker(
    id: usize,
    context: Arc<WorkerContext>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    info!("Worker {} started", id);
    loop {
        match serve(id, &context, &mut shutdown_rx).await {
            Ok(()) => break,
            Err(e) => {
                warn!(
                    "Worker {} lost its channel: {}; reconnecting in {:?}",
                    id, e, context.settings.reconnect_delay
                );
                metrics::WORKER_RECONNECTS.inc();
            }
        }

        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = tokio::time::sleep(context.settings.reconnect_delay) => {}
        }
    }
    info!("Worker {} stopped", id);
}

/// Runs one channel session until shutdown. Shutdown is only observed
/// between requests.
async fn serve(
    id: usize,
    context: &WorkerContext,
    shutdown_rx: &mut broadcast::Receiver<()>,
) -> Result<(), BrokerError> {
    let queue = &context.settings.work_queue;
    let channel = context.broker.open_channel().await?;
    channel.declare_work_queue(queue).await?;
    let mut deliveries = channel.consume(queue).await?;
    debug!("Worker {} consuming from {}", id, queue);

    loop {
        let next = tokio::select! {
            _ = shutdown_rx.recv() => {
                let _ = channel.close().await;
                return Ok(());
            }
            next = deliveries.next() => next,
        };

        let delivery = match next {
            Some(delivery) => delivery?,
            None => return Err(BrokerError::Closed),
        };
        handle_delivery(id, context, channel.as_ref(), delivery).await?;
    }
}

/// Handles one request: decode, produce, reply, then acknowledge.
async fn handle_delivery(
    id: usize,
    context: &WorkerContext,
    channel: &dyn Channel,
    delivery: Delivery,
) -> Result<(), BrokerError> {
    let stats = &context.stats;

    let request = match ThumbnailRequest::decode(&delivery.envelope.body) {
        Ok(request) => request,
        Err(e) => {
            let requeue = context.settings.requeue_malformed && !delivery.redelivered;
            warn!(
                "Worker {} got a malformed request ({}); {}",
                id,
                e,
                if requeue { "requeueing once" } else { "dropping it" }
            );
            stats.malformed.fetch_add(1, Ordering::Relaxed);
            metrics::WORKER_JOBS.with_label_values(&["malformed"]).inc();
            return delivery.nack(requeue).await;
        }
    };

    let Some(reply_to) = delivery.envelope.reply_to.clone() else {
        warn!(
            "Worker {} got request {} without a reply address, dropping it",
            id,
            request.key()
        );
        metrics::WORKER_JOBS.with_label_values(&["no_reply_to"]).inc();
        return delivery.ack().await;
    };
    let correlation_id = delivery
        .envelope
        .correlation_id
        .clone()
        .unwrap_or_else(|| request.key().to_string());

    info!("Worker {} processing {} ({})", id, request.key(), request.source_url());
    stats.active.fetch_add(1, Ordering::Relaxed);
    metrics::WORKER_BUSY.inc();
    let result_url = produce(context, &request).await;
    stats.active.fetch_sub(1, Ordering::Relaxed);
    metrics::WORKER_BUSY.dec();

    let reply = ThumbnailReply::new(correlation_id, result_url);
    let soft_failure = reply.is_empty();
    if let Err(e) = channel.publish(&reply_to, reply.into_envelope()).await {
        // Not answered, so not acknowledged: let another worker retry it.
        warn!("Worker {} failed to reply for {}: {}", id, request.key(), e);
        let _ = delivery.nack(true).await;
        return Err(e);
    }
    delivery.ack().await?;

    stats.processed.fetch_add(1, Ordering::Relaxed);
    if soft_failure {
        stats.soft_failures.fetch_add(1, Ordering::Relaxed);
        metrics::WORKER_JOBS.with_label_values(&["soft_failure"]).inc();
    } else {
        metrics::WORKER_JOBS.with_label_values(&["success"]).inc();
    }
    Ok(())
}

/// Transcode and upload. Any failure yields an empty result.
async fn produce(context: &WorkerContext, request: &ThumbnailRequest) -> String {
    let dest = thumbnail_path(&context.settings.output_dir, request.key());

    let start = Instant::now();
    let transcoded = context.transcoder.transcode(request.source_url(), &dest).await;
    record_call("transcoder", start, transcoded.is_ok());
    let image = match transcoded {
        Ok(image) => image,
        Err(e) => {
            warn!("Transcoding {} failed: {}", request.source_url(), e);
            // ffmpeg may leave a partial file behind
            let _ = tokio::fs::remove_file(&dest).await;
            return String::new();
        }
    };

    let start = Instant::now();
    let uploaded = context.store.upload(&image).await;
    record_call("store", start, uploaded.is_ok());
    let url = match uploaded {
        Ok(url) => url,
        Err(e) => {
            warn!("Uploading {} failed: {}", image.display(), e);
            String::new()
        }
    };

    if let Err(e) = tokio::fs::remove_file(&image).await {
        warn!("Failed to remove {}: {}", image.display(), e);
    }

    url
}

fn record_call(capability: &str, start: Instant, success: bool) {
    metrics::EXTERNAL_CALL_DURATION
        .with_label_values(&[capability])
        .observe(start.elapsed().as_secs_f64());
    metrics::EXTERNAL_CALLS
        .with_label_values(&[capability, if success { "success" } else { "error" }])
        .inc();
}

/// A unique local path for a key's thumbnail, so duplicate in-flight
/// requests for one key never share a file.
fn thumbnail_path(output_dir: &Path, key: &str) -> PathBuf {
    let stem: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(64)
        .collect();
    output_dir.join(format!("{}-{}.webp", stem, Uuid::new_v4().simple()))
}
