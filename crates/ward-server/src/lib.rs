//! HTTP surface of Ward Station.
//!
//! Wraps a [`WardEngine`](ward_engine::WardEngine) in an axum router and hosts
//! the background tasks that run next to it: the escalation sweep and, when
//! enabled, notification delivery.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod state;
pub mod sweeper;

pub use config::{AppConfig, LoggingConfig, ServerConfig, SweepConfig};
pub use error::ApiError;
pub use observability::init_tracing;
pub use server::{ServerBuilder, WardServer, build_app};
pub use state::AppState;
pub use sweeper::Sweeper;
