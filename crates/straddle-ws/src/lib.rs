//! WebSocket client for the upstream straddle data service.
//!
//! Provides:
//! - Automatic reconnection with exponential backoff and jitter
//! - Transport lifecycle events (attempt, connected, failed, closed)
//! - Heartbeat monitoring (ping after silence, pong timeout detection)
//! - Envelope decoding into [`straddle_core::InboundEvent`]s, forwarded in
//!   arrival order over a bounded channel

pub mod connection;
pub mod error;
pub mod heartbeat;
pub mod message;

pub use connection::{ConnectionConfig, ConnectionManager};
pub use error::{WsError, WsResult};
pub use heartbeat::{HeartbeatMonitor, HeartbeatStats};
pub use message::{parse_frame, Envelope, StatusPayload, DATA_UPDATE, STATUS_UPDATE};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any WebSocket connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
