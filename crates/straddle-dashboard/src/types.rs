//! Dashboard API types.
//!
//! Messages pushed to WebSocket clients. Every message carries one full
//! published display state; clients replace their view wholesale.

use serde::Serialize;
use straddle_engine::DisplayState;

/// WebSocket message sent to dashboard clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardMessage<'a> {
    /// Current state, sent once when a client connects.
    Snapshot(&'a DisplayState),
    /// A newly published state.
    Update(&'a DisplayState),
}

impl DashboardMessage<'_> {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
