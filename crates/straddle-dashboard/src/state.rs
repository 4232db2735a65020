//! Dashboard state access.

use std::sync::Arc;

use straddle_engine::DisplayState;
use tokio::sync::watch;

/// Read handle on the latest published display state.
#[derive(Clone)]
pub struct DashboardState {
    display: watch::Receiver<Arc<DisplayState>>,
}

impl DashboardState {
    pub fn new(display: watch::Receiver<Arc<DisplayState>>) -> Self {
        Self { display }
    }

    /// Latest published state.
    pub fn collect_snapshot(&self) -> Arc<DisplayState> {
        self.display.borrow().clone()
    }
}
