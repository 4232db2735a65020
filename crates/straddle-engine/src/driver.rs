//! Async driver for the coordinator.
//!
//! Serializes inbound events and highlight countdowns onto one task, so
//! every state mutation happens in arrival order on a single owner.

use straddle_core::InboundEvent;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::coordinator::{Coordinator, Report};

/// Run the coordinator until the event channel closes or `shutdown` fires.
///
/// `on_report` is invoked after every processed event and every fired
/// countdown. On exit the coordinator clears highlights, publishes a final
/// state and is handed back to the caller.
pub async fn run_coordinator<F>(
    mut coordinator: Coordinator,
    mut events: mpsc::Receiver<InboundEvent>,
    shutdown: CancellationToken,
    mut on_report: F,
) -> Coordinator
where
    F: FnMut(&Report),
{
    info!("Coordinator started");

    loop {
        let deadline = coordinator.next_deadline();

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                debug!("Coordinator shutdown requested");
                break;
            }

            event = events.recv() => {
                let Some(event) = event else {
                    debug!("Event channel closed");
                    break;
                };
                let report = coordinator.handle(event, Instant::now());
                on_report(&report);
            }

            _ = sleep_until(deadline) => {
                let report = coordinator.on_timer(Instant::now());
                on_report(&report);
            }
        }
    }

    coordinator.shutdown();
    info!("Coordinator stopped");
    coordinator
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
