//! Prometheus metrics and structured logging for the straddle monitor.
//!
//! - Prometheus metrics for connection state, snapshot reconciliation and
//!   highlight churn
//! - Structured logging with tracing (JSON in production)

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, init_logging_with};
pub use metrics::Metrics;
