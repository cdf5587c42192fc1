//! Deadline and cache-expiry behavior of the thumbnail client.
//!
//! Time is paused in the deadline tests, so the responder is a plain task
//! answering over the in-process broker instead of a worker pool touching
//! the filesystem. The cache keeps wall-clock time, so its expiry test runs
//! unpaused with a one-second TTL.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use soda_core::{
    config::ThumbnailConfig, testing::fixtures, Broker, MemoryBroker, RpcError,
    ThumbnailClient, ThumbnailReply, ThumbnailRequest, TtlCache,
};

const QUEUE: &str = "thumbnail";

fn client(broker: &MemoryBroker, config: ThumbnailConfig) -> ThumbnailClient {
    ThumbnailClient::new(
        Arc::new(broker.clone()),
        Arc::new(TtlCache::new()),
        config,
        QUEUE,
    )
}

async fn declare_queue(broker: &MemoryBroker) {
    let channel = broker.open_channel().await.unwrap();
    channel.declare_work_queue(QUEUE).await.unwrap();
    channel.close().await.unwrap();
}

/// Answers every request with `url`, optionally tagging replies with a
/// foreign correlation id first.
fn spawn_responder(broker: &MemoryBroker, url: &'static str, stray_first: bool) -> JoinHandle<()> {
    let broker = broker.clone();
    tokio::spawn(async move {
        let channel = broker.open_channel().await.unwrap();
        channel.declare_work_queue(QUEUE).await.unwrap();
        let mut deliveries = channel.consume(QUEUE).await.unwrap();

        while let Some(Ok(delivery)) = deliveries.next().await {
            let request = ThumbnailRequest::decode(&delivery.envelope.body).unwrap();
            let reply_to = delivery.envelope.reply_to.clone().unwrap();
            if stray_first {
                let stray = ThumbnailReply::new("someone-else", "https://store.example/wrong.webp");
                channel.publish(&reply_to, stray.into_envelope()).await.unwrap();
            }
            let reply = ThumbnailReply::new(request.key(), url);
            channel.publish(&reply_to, reply.into_envelope()).await.unwrap();
            delivery.ack().await.unwrap();
        }
    })
}

#[tokio::test(start_paused = true)]
async fn test_timeout_never_fires_early() {
    let broker = MemoryBroker::new();
    declare_queue(&broker).await;
    let client = client(&broker, ThumbnailConfig::default());

    let start = Instant::now();
    let result = client.dispatch(&fixtures::video_request("nobody")).await;

    assert!(matches!(
        result,
        Err(RpcError::Timeout { timeout_secs: 60, .. })
    ));
    assert!(start.elapsed() >= Duration::from_secs(60));
    // The request itself was sent and is still waiting for a worker.
    assert_eq!(broker.queue_depth(QUEUE), 1);
    assert!(client.cache().get("nobody").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_missing_work_queue_times_out() {
    let broker = MemoryBroker::new();
    let client = client(
        &broker,
        ThumbnailConfig {
            timeout_secs: 5,
            ..Default::default()
        },
    );

    let result = client.dispatch(&fixtures::video_request("lost")).await;

    assert!(matches!(result, Err(RpcError::Timeout { .. })));
    assert_eq!(broker.published_count(QUEUE), 1);
}

#[tokio::test]
async fn test_cached_result_expires() {
    let broker = MemoryBroker::new();
    declare_queue(&broker).await;
    let responder = spawn_responder(&broker, "https://store.example/a.webp", false);
    let config = ThumbnailConfig {
        cache_ttl_secs: 1,
        ..ThumbnailConfig::default()
    };
    let client = client(&broker, config);
    let request = fixtures::video_request("expiring");

    assert_eq!(
        client.dispatch(&request).await.unwrap(),
        "https://store.example/a.webp"
    );
    assert_eq!(broker.published_count(QUEUE), 1);

    client.dispatch(&request).await.unwrap();
    assert_eq!(broker.published_count(QUEUE), 1);

    // The cache runs on wall-clock time, so this test does not pause it.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    client.dispatch(&request).await.unwrap();
    assert_eq!(broker.published_count(QUEUE), 2);

    responder.abort();
}

#[tokio::test(start_paused = true)]
async fn test_foreign_correlation_id_is_skipped() {
    let broker = MemoryBroker::new();
    declare_queue(&broker).await;
    let responder = spawn_responder(&broker, "https://store.example/right.webp", true);
    let client = client(&broker, ThumbnailConfig::default());

    let url = client
        .dispatch(&fixtures::video_request("mine"))
        .await
        .unwrap();

    assert_eq!(url, "https://store.example/right.webp");
    responder.abort();
}

#[tokio::test(start_paused = true)]
async fn test_empty_results_can_skip_the_cache() {
    let broker = MemoryBroker::new();
    declare_queue(&broker).await;
    let responder = spawn_responder(&broker, "", false);
    let client = client(
        &broker,
        ThumbnailConfig {
            cache_empty_results: false,
            ..Default::default()
        },
    );
    let request = fixtures::video_request("empty");

    assert_eq!(client.dispatch(&request).await.unwrap(), "");
    assert_eq!(client.dispatch(&request).await.unwrap(), "");
    assert_eq!(broker.published_count(QUEUE), 2);
    assert!(client.cache().is_empty());
    responder.abort();
}
