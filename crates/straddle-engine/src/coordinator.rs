//! Reconciliation coordinator.
//!
//! Owns the current snapshot, the highlight scheduler and the connection
//! state machine, and publishes one [`DisplayState`] per processed event.
//! Observers only ever receive immutable, shared published states.

use std::sync::Arc;

use chrono::Utc;
use serde::{Serialize, Serializer};
use straddle_core::{ChangeSet, ConnectionState, InboundEvent, Snapshot};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::connection::{ConnectionInput, ConnectionMachine, Transition};
use crate::diff::diff;
use crate::highlight::{HighlightConfig, HighlightScheduler};

/// `Report::kind` of a fired highlight countdown.
pub const HIGHLIGHT_TIMER: &str = "highlight_timer";

/// Published, read-only view consumed by renderers.
#[derive(Debug, Clone, Serialize)]
pub struct DisplayState {
    /// Latest snapshot; `None` until the first `data_update`.
    #[serde(serialize_with = "serialize_snapshot")]
    pub snapshot: Option<Arc<Snapshot>>,
    /// Fields currently flagged for transient emphasis.
    pub active_highlights: ChangeSet,
    pub connection_state: ConnectionState,
    /// Detail attached to the last connection input (e.g. an error reason).
    pub status_message: Option<String>,
    /// Monotonic publication counter.
    pub sequence: u64,
    /// Publication time (Unix milliseconds).
    pub published_at_ms: i64,
}

fn serialize_snapshot<S: Serializer>(
    snapshot: &Option<Arc<Snapshot>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    snapshot.as_deref().serialize(serializer)
}

impl DisplayState {
    fn initial() -> Self {
        Self {
            snapshot: None,
            active_highlights: ChangeSet::new(),
            connection_state: ConnectionState::default(),
            status_message: None,
            sequence: 0,
            published_at_ms: Utc::now().timestamp_millis(),
        }
    }

    /// Whether any snapshot has been received yet.
    pub fn has_data(&self) -> bool {
        self.snapshot.is_some()
    }
}

/// Synchronous consumer of published display states.
#[cfg_attr(test, mockall::automock)]
pub trait DisplayObserver: Send + Sync {
    fn on_display(&self, state: &Arc<DisplayState>);
}

/// What processing one event did, for metrics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    /// Label of the processed event (see `InboundEvent::kind`), or
    /// `highlight_timer` for a fired countdown.
    pub kind: &'static str,
    /// Size of the change set computed for a snapshot.
    pub changed_fields: usize,
    /// Fields repaired while decoding a snapshot.
    pub repaired_fields: usize,
    /// Connection transition applied, if any.
    pub transition: Option<Transition>,
    /// Whether an expiring countdown cleared the highlights.
    pub highlights_cleared: bool,
    /// Whether a display state was published.
    pub published: bool,
}

/// Reconciliation coordinator.
pub struct Coordinator {
    current: Option<Arc<Snapshot>>,
    scheduler: HighlightScheduler,
    connection: ConnectionMachine,
    observers: Vec<Box<dyn DisplayObserver>>,
    tx: watch::Sender<Arc<DisplayState>>,
    sequence: u64,
}

impl Coordinator {
    pub fn new(config: &HighlightConfig) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(DisplayState::initial()));
        Self {
            current: None,
            scheduler: HighlightScheduler::new(config),
            connection: ConnectionMachine::new(),
            observers: Vec::new(),
            tx,
            sequence: 0,
        }
    }

    /// Register a synchronous observer. Observers are invoked in
    /// registration order, before `handle` returns.
    pub fn register(&mut self, observer: Box<dyn DisplayObserver>) {
        self.observers.push(observer);
    }

    /// Subscribe to published states.
    pub fn subscribe(&self) -> watch::Receiver<Arc<DisplayState>> {
        self.tx.subscribe()
    }

    /// Last published state.
    pub fn display(&self) -> Arc<DisplayState> {
        self.tx.borrow().clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn current_snapshot(&self) -> Option<&Snapshot> {
        self.current.as_deref()
    }

    /// Earliest pending highlight countdown.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Process one inbound event and publish the resulting state.
    pub fn handle(&mut self, event: InboundEvent, now: Instant) -> Report {
        trace!(kind = event.kind(), "Inbound event");
        let mut report = Report {
            kind: event.kind(),
            highlights_cleared: self.scheduler.expire(now),
            ..Default::default()
        };

        match event {
            InboundEvent::ConnectAttempt => {
                report.transition = Some(self.connection.apply(ConnectionInput::ConnectAttempt));
            }
            InboundEvent::Connected => {
                report.transition = Some(self.connection.apply(ConnectionInput::ConnectSuccess));
            }
            InboundEvent::ConnectFailed { message } => {
                report.transition = Some(self.connection.apply(ConnectionInput::ConnectFailure {
                    message: Some(message),
                }));
            }
            InboundEvent::Disconnected => {
                report.transition = Some(self.connection.apply(ConnectionInput::TransportClosed));
            }
            InboundEvent::StatusUpdate { status, message } => match status.parse() {
                Ok(state) => {
                    report.transition =
                        Some(self.connection.apply(ConnectionInput::StatusOverride {
                            state,
                            message,
                        }));
                }
                Err(e) => {
                    warn!(error = %e, "Ignoring status update");
                }
            },
            InboundEvent::DataUpdate(payload) => {
                let decoded = Snapshot::decode(&payload);
                for issue in &decoded.issues {
                    warn!(field = %issue.path, reason = %issue.reason, "Malformed snapshot field, using default");
                }
                report.repaired_fields = decoded.issues.len();
                let data = self.reconcile(decoded.snapshot, now);
                report.changed_fields = data.changed_fields;
                report.transition = data.transition;
            }
        }

        self.publish();
        report.published = true;
        report
    }

    /// Fire due highlight countdowns; publishes only if the set was cleared.
    pub fn on_timer(&mut self, now: Instant) -> Report {
        let cleared = self.scheduler.expire(now);
        if cleared {
            self.publish();
        }
        Report {
            kind: HIGHLIGHT_TIMER,
            highlights_cleared: cleared,
            published: cleared,
            ..Default::default()
        }
    }

    /// Teardown: drop highlights and pending countdowns, publish once more.
    pub fn shutdown(&mut self) {
        debug!("Coordinator shutting down, clearing highlights");
        self.scheduler.clear();
        self.publish();
    }

    fn reconcile(&mut self, next: Snapshot, now: Instant) -> Report {
        let upstream_at = next.last_update_at();
        if upstream_at.is_none() {
            if let Some(raw) = &next.last_update {
                warn!(last_update = %raw, "Unparseable snapshot timestamp");
            }
        }

        let changes = diff(self.current.as_deref(), &next);
        let changed_fields = changes.len();
        if changed_fields > 0 {
            debug!(
                changed = changed_fields,
                rows = next.rows.len(),
                upstream_at = ?upstream_at,
                "Snapshot changed"
            );
        }
        self.scheduler.activate(changes, now);

        let status = next.status;
        self.current = Some(Arc::new(next));

        let transition = status.map(|state| {
            self.connection.apply(ConnectionInput::StatusOverride {
                state,
                message: None,
            })
        });

        Report {
            changed_fields,
            transition,
            ..Default::default()
        }
    }

    fn publish(&mut self) {
        self.sequence += 1;
        let state = Arc::new(DisplayState {
            snapshot: self.current.clone(),
            active_highlights: self.scheduler.active().clone(),
            connection_state: self.connection.state(),
            status_message: self.connection.message().map(str::to_string),
            sequence: self.sequence,
            published_at_ms: Utc::now().timestamp_millis(),
        });

        for observer in &self.observers {
            observer.on_display(&state);
        }
        self.tx.send_replace(state);
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("connection_state", &self.connection.state())
            .field("has_snapshot", &self.current.is_some())
            .field("active_highlights", &self.scheduler.active().len())
            .field("observers", &self.observers.len())
            .field("sequence", &self.sequence)
            .finish()
    }
}
