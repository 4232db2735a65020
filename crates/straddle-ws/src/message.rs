//! Upstream envelope types.
//!
//! Every text frame from the data service is an envelope
//! `{"event": <name>, "data": <payload>}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use straddle_core::InboundEvent;
use tracing::debug;

use crate::error::{WsError, WsResult};

/// Event name carrying a full snapshot.
pub const DATA_UPDATE: &str = "data_update";
/// Event name carrying an explicit connection status.
pub const STATUS_UPDATE: &str = "status_update";

/// Envelope for one upstream event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// `status_update` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Envelope {
    pub fn data_update(snapshot: Value) -> Self {
        Self {
            event: DATA_UPDATE.to_string(),
            data: snapshot,
        }
    }

    pub fn status_update(status: impl Into<String>, message: Option<String>) -> Self {
        let payload = StatusPayload {
            status: status.into(),
            message,
        };
        Self {
            event: STATUS_UPDATE.to_string(),
            data: serde_json::to_value(payload).unwrap_or(Value::Null),
        }
    }

    /// Serialize for sending as a text frame.
    pub fn to_text(&self) -> WsResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Convert into an inbound event.
    ///
    /// Returns `Ok(None)` for event names this client does not consume.
    pub fn into_event(self) -> WsResult<Option<InboundEvent>> {
        match self.event.as_str() {
            DATA_UPDATE => Ok(Some(InboundEvent::DataUpdate(self.data))),
            STATUS_UPDATE => {
                let payload: StatusPayload = serde_json::from_value(self.data).map_err(|e| {
                    WsError::ParseError(format!("invalid status_update payload: {e}"))
                })?;
                Ok(Some(InboundEvent::StatusUpdate {
                    status: payload.status,
                    message: payload.message,
                }))
            }
            other => {
                debug!(event = other, "Ignoring unknown upstream event");
                Ok(None)
            }
        }
    }
}

/// Parse one text frame into an inbound event.
pub fn parse_frame(text: &str) -> WsResult<Option<InboundEvent>> {
    let envelope: Envelope = serde_json::from_str(text)?;
    envelope.into_event()
}
