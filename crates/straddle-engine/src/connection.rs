//! Connection lifecycle state machine.
//!
//! Two independent input channels feed one machine:
//! - transport lifecycle events (attempt, success, failure, close)
//! - upstream status overrides carried by `status_update` or a snapshot's
//!   `status` field
//!
//! No transition is rejected. Precedence between the channels is "last
//! write wins": whichever input was applied most recently decides the state.

use straddle_core::ConnectionState;
use tracing::{debug, info};

/// Which channel an input arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Transport,
    Upstream,
}

/// Input to the connection state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionInput {
    ConnectAttempt,
    ConnectSuccess,
    ConnectFailure { message: Option<String> },
    TransportClosed,
    StatusOverride {
        state: ConnectionState,
        message: Option<String>,
    },
}

impl ConnectionInput {
    pub fn source(&self) -> InputSource {
        match self {
            Self::StatusOverride { .. } => InputSource::Upstream,
            _ => InputSource::Transport,
        }
    }

    /// State this input moves the machine to, from any state.
    pub fn target(&self) -> ConnectionState {
        match self {
            Self::ConnectAttempt => ConnectionState::Connecting,
            Self::ConnectSuccess => ConnectionState::Connected,
            Self::ConnectFailure { .. } => ConnectionState::Error,
            Self::TransportClosed => ConnectionState::Disconnected,
            Self::StatusOverride { state, .. } => *state,
        }
    }

    fn message(&self) -> Option<&str> {
        match self {
            Self::ConnectFailure { message } | Self::StatusOverride { message, .. } => {
                message.as_deref()
            }
            _ => None,
        }
    }
}

/// Result of applying one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ConnectionState,
    pub to: ConnectionState,
    pub source: InputSource,
}

impl Transition {
    pub fn is_change(&self) -> bool {
        self.from != self.to
    }
}

/// Connection state machine.
#[derive(Debug, Default)]
pub struct ConnectionMachine {
    state: ConnectionState,
    /// Detail attached by the last input (failure reason, upstream message).
    message: Option<String>,
}

impl ConnectionMachine {
    /// Create a machine in `disconnected`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Apply an input. Always succeeds.
    pub fn apply(&mut self, input: ConnectionInput) -> Transition {
        let transition = Transition {
            from: self.state,
            to: input.target(),
            source: input.source(),
        };

        self.state = transition.to;
        self.message = input.message().map(str::to_string);

        if transition.is_change() {
            info!(
                from = %transition.from,
                to = %transition.to,
                source = ?transition.source,
                message = self.message.as_deref().unwrap_or(""),
                "Connection state changed"
            );
        } else {
            debug!(state = %transition.to, source = ?transition.source, "Connection state reaffirmed");
        }

        transition
    }
}
