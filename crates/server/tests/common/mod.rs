//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process router
//! backed by the in-memory broker and a worker pool with mocked transcoder
//! and content store, so no broker server or ffmpeg is needed.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use soda_core::{
    config::{ThumbnailConfig, WorkerConfig},
    testing::{MockContentStore, MockTranscoder},
    BrokerBackend, Config, DirectoryScraper, MemoryBroker, PoolSettings, ThumbnailClient,
    TtlCache, WorkerPool,
};

pub const HOSTED_URL: &str = "https://store.example/thumb.webp";

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_thumbnail() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/api/thumbnail", json!({
///         "url": "http://host/video.mp4",
///         "filename": "video"
///     })).await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// In-process broker shared by client and pool
    pub broker: MemoryBroker,
    /// Mock transcoder - control delays and failures
    pub transcoder: Arc<MockTranscoder>,
    /// Mock content store - inspect uploads
    pub store: Arc<MockContentStore>,
    /// Worker pool, when enabled
    pub pool: Option<Arc<WorkerPool>>,
    /// Temporary directory for thumbnails
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with workers and thumbnails enabled.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let transcoder = Arc::new(MockTranscoder::new());
        let store = Arc::new(MockContentStore::with_url(HOSTED_URL));
        let broker = MemoryBroker::new();

        let mut config = Config::default();
        config.broker.backend = BrokerBackend::Memory;
        config.thumbnail = ThumbnailConfig {
            enabled: test_config.thumbnails_enabled,
            timeout_secs: test_config.timeout_secs,
            ..Default::default()
        };
        config.worker = WorkerConfig {
            enabled: test_config.workers_enabled,
            ..Default::default()
        };
        config.transcoder.output_dir = temp_dir.path().to_path_buf();

        let pool = if test_config.workers_enabled {
            let pool = WorkerPool::new(
                Arc::new(broker.clone()),
                transcoder.clone(),
                store.clone(),
                PoolSettings::from_config(&config),
            );
            pool.start().await.expect("Failed to start worker pool");
            Some(Arc::new(pool))
        } else {
            None
        };

        let cache = Arc::new(TtlCache::new());
        let thumbnails = if test_config.thumbnails_enabled {
            ThumbnailClient::new(
                Arc::new(broker.clone()),
                cache,
                config.thumbnail.clone(),
                config.broker.work_queue.clone(),
            )
        } else {
            ThumbnailClient::disabled(cache)
        };

        let scraper = DirectoryScraper::new(&config.scraper).expect("Failed to create scraper");

        let state = Arc::new(soda_server::state::AppState::new(
            config,
            Arc::new(thumbnails),
            scraper,
            pool.clone(),
        ));
        let router = soda_server::api::create_router(state);

        Self {
            router,
            broker,
            transcoder,
            store,
            pool,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await.0
    }

    /// Send a GET request and return the raw body text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let (response, bytes) = self.send(request).await;
        (response.status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        self.send(request).await.0
    }

    async fn send(&self, request: Request<Body>) -> (TestResponse, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        (TestResponse { status, body }, body_bytes.to_vec())
    }

    /// Stop the worker pool, if any.
    pub async fn shutdown(&self) {
        if let Some(pool) = &self.pool {
            pool.stop().await;
        }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    pub thumbnails_enabled: bool,
    pub workers_enabled: bool,
    pub timeout_secs: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            thumbnails_enabled: true,
            workers_enabled: true,
            timeout_secs: 10,
        }
    }
}

impl TestConfig {
    /// Thumbnails switched off entirely.
    pub fn disabled() -> Self {
        Self {
            thumbnails_enabled: false,
            workers_enabled: false,
            ..Default::default()
        }
    }

    /// Thumbnails enabled but nobody consuming, with a short deadline.
    pub fn without_workers() -> Self {
        Self {
            workers_enabled: false,
            timeout_secs: 1,
            ..Default::default()
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
