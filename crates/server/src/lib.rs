pub mod api;
pub mod bootstrap;
pub mod metrics;
pub mod state;
