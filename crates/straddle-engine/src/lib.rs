//! Streaming snapshot reconciliation engine.
//!
//! Turns the ordered stream of transport events into published display
//! states:
//!
//! ```text
//! InboundEvent ──► Coordinator ──► diff(prev, next) ──► HighlightScheduler
//!                      │                                      │
//!                      ├──► ConnectionMachine                 │
//!                      ▼                                      ▼
//!              DisplayState { snapshot, active_highlights, connection_state }
//!                      │
//!                      ├──► DisplayObserver (sync, in registration order)
//!                      └──► watch::Receiver<Arc<DisplayState>>
//! ```
//!
//! Everything except [`run_coordinator`] is synchronous and takes the
//! current time as an argument, so the timing rules are testable without a
//! runtime.

pub mod connection;
pub mod coordinator;
pub mod diff;
pub mod driver;
pub mod highlight;

pub use connection::{ConnectionInput, ConnectionMachine, InputSource, Transition};
pub use coordinator::{Coordinator, DisplayObserver, DisplayState, Report, HIGHLIGHT_TIMER};
pub use diff::diff;
pub use driver::run_coordinator;
pub use highlight::{
    HighlightConfig, HighlightScheduler, TimerMode, DEFAULT_HIGHLIGHT_WINDOW_MS,
    MAX_HIGHLIGHT_WINDOW_MS,
};
