//! Process-local TTL cache.
//!
//! Expiry is passive: an entry past its deadline reads as absent. Reclaiming
//! memory is left to the underlying cache's housekeeping.
//!
//! # Example
//!
//! ```ignore
//! use soda_core::cache::TtlCache;
//!
//! let cache = Arc::new(TtlCache::with_max_entries(100_000));
//! cache.set("abc123", "https://store.example/abc.webp".to_string(), Duration::from_secs(82800));
//! assert!(cache.get("abc123").is_some());
//! ```

mod ttl;

pub use ttl::TtlCache;
