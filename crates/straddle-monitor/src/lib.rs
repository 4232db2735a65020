//! Live SPX straddle monitor.
//!
//! Wires the components together:
//! - WebSocket client to the upstream data service
//! - Reconciliation coordinator (diff, highlights, connection state)
//! - Dashboard server
//! - Metrics recorded from every processed event

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::{AppConfig, ConfigSource, TelemetryConfig, UpstreamConfig};
pub use error::{AppError, AppResult};
