//! HTTP wiring for a single binary agreement node: config parsing, the
//! `reqwest`-backed broadcaster, Prometheus metrics, and the `axum` routes
//! spec.md §6 describes. `abft-core` owns the protocol; this crate owns
//! the process.

pub mod api;
pub mod broadcaster;
pub mod config;
pub mod error;
pub mod observability;

pub use api::{create_router, AppState};
pub use broadcaster::{probe_until_ready, HttpBroadcaster};
pub use config::{ConfigError, NodeConfig};
pub use error::ApiError;
pub use observability::NodeMetrics;
