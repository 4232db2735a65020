//! WebSocket broadcast.
//!
//! [`Broadcaster`] is registered on the coordinator as a display observer:
//! every published state is serialized once and fanned out to all connected
//! WebSocket clients. Sending never blocks; a slow client skips ahead.

use std::sync::Arc;

use straddle_engine::{DisplayObserver, DisplayState};
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::types::DashboardMessage;

/// Display observer feeding the dashboard broadcast channel.
#[derive(Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<String>,
}

impl Broadcaster {
    /// Create a broadcaster buffering `capacity` messages per client.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn sender(&self) -> broadcast::Sender<String> {
        self.tx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

impl DisplayObserver for Broadcaster {
    fn on_display(&self, state: &Arc<DisplayState>) {
        let json = match DashboardMessage::Update(state).to_json() {
            Ok(json) => json,
            Err(e) => {
                debug!(error = %e, "Failed to serialize dashboard update");
                return;
            }
        };

        // No receivers is normal when no clients are connected.
        match self.tx.send(json) {
            Ok(n) => trace!(receivers = n, sequence = state.sequence, "Broadcast update sent"),
            Err(_) => trace!("No WebSocket receivers connected"),
        }
    }
}
