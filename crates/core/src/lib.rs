pub mod broker;
pub mod cache;
pub mod config;
pub mod metrics;
pub mod protocol;
pub mod rpc;
pub mod scraper;
pub mod store;
pub mod testing;
pub mod transcoder;
pub mod worker;

pub use broker::{
    connect_broker, Broker, BrokerError, Channel, Delivery, Envelope, MemoryBroker, NatsBroker,
};
pub use cache::TtlCache;
pub use config::{
    load_config, load_config_from_str, validate_config, BrokerBackend, Config, ConfigError,
    SanitizedConfig,
};
pub use protocol::{ThumbnailReply, ThumbnailRequest};
pub use rpc::{RpcError, ThumbnailClient};
pub use scraper::{Contents, DirectoryScraper, ScrapeError, ScrapeRequest};
pub use store::{ContentStore, LitterboxStore, StoreError};
pub use transcoder::{FfmpegTranscoder, TranscodeError, Transcoder};
pub use worker::{PoolSettings, PoolStatus, WorkerPool};
