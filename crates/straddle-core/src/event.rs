//! Events delivered by the transport to the reconciliation engine.

use serde_json::Value;

/// One inbound event, processed strictly in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// A dial to the upstream service is starting.
    ConnectAttempt,
    /// Transport established (`connect`).
    Connected,
    /// Dial failed before the transport was established.
    ConnectFailed { message: String },
    /// Transport lost or closed (`disconnect`).
    Disconnected,
    /// Explicit upstream status (`status_update`).
    StatusUpdate {
        status: String,
        message: Option<String>,
    },
    /// Full snapshot payload (`data_update`), not yet validated.
    DataUpdate(Value),
}

impl InboundEvent {
    /// Short name for logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectAttempt => "connect_attempt",
            Self::Connected => "connect",
            Self::ConnectFailed { .. } => "connect_failed",
            Self::Disconnected => "disconnect",
            Self::StatusUpdate { .. } => "status_update",
            Self::DataUpdate(_) => "data_update",
        }
    }
}
