//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - RPC gateway client (dispatch outcomes, round-trip latency)
//! - Worker pool (jobs by outcome, busy workers, reconnects)
//! - External capabilities (transcoder and content store)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// RPC Gateway Client
// =============================================================================

/// Dispatch calls total by outcome.
pub static RPC_DISPATCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("soda_rpc_dispatches_total", "Total thumbnail dispatch calls"),
        &["outcome"], // "cache_hit", "replied", "timeout", "rejected", "disabled", "error"
    )
    .unwrap()
});

/// Broker round-trip duration in seconds (cache misses only).
pub static RPC_ROUND_TRIP: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "soda_rpc_round_trip_seconds",
            "Duration of a broker round trip",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0]),
        &["outcome"],
    )
    .unwrap()
});

/// Replies discarded because their correlation id matched no pending call.
pub static RPC_STRAY_REPLIES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "soda_rpc_stray_replies_total",
        "Replies dropped for a mismatched correlation id",
    )
    .unwrap()
});

// =============================================================================
// Worker Pool
// =============================================================================

/// Jobs handled total by outcome.
pub static WORKER_JOBS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("soda_worker_jobs_total", "Total thumbnail jobs handled"),
        &["outcome"], // "success", "soft_failure", "malformed", "no_reply_to"
    )
    .unwrap()
});

/// Workers currently processing a job.
pub static WORKER_BUSY: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("soda_worker_busy", "Workers currently processing a job").unwrap()
});

/// Channel reopen attempts after a broker failure.
pub static WORKER_RECONNECTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "soda_worker_reconnects_total",
        "Worker channel reopen attempts",
    )
    .unwrap()
});

// =============================================================================
// External Capabilities
// =============================================================================

/// Transcoder and store call duration.
pub static EXTERNAL_CALL_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "soda_external_call_duration_seconds",
            "Duration of transcoder and content store calls",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["capability"], // "transcoder", "store"
    )
    .unwrap()
});

/// Transcoder and store calls total by result.
pub static EXTERNAL_CALLS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "soda_external_calls_total",
            "Total transcoder and content store calls",
        ),
        &["capability", "result"], // result: "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // RPC
        Box::new(RPC_DISPATCHES.clone()),
        Box::new(RPC_ROUND_TRIP.clone()),
        Box::new(RPC_STRAY_REPLIES.clone()),
        // Worker pool
        Box::new(WORKER_JOBS.clone()),
        Box::new(WORKER_BUSY.clone()),
        Box::new(WORKER_RECONNECTS.clone()),
        // External capabilities
        Box::new(EXTERNAL_CALL_DURATION.clone()),
        Box::new(EXTERNAL_CALLS.clone()),
    ]
}
