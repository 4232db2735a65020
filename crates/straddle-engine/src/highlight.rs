//! Transient highlight scheduling.
//!
//! The scheduler holds the change set currently shown as "active" and
//! guarantees it reverts to empty once its display window elapses. It does
//! not own a timer: callers pass the current time in, read
//! [`HighlightScheduler::next_deadline`] to know when to wake up, and call
//! [`HighlightScheduler::expire`] when they do.

use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use straddle_core::ChangeSet;
use tokio::time::Instant;
use tracing::trace;

/// Default highlight display window.
pub const DEFAULT_HIGHLIGHT_WINDOW_MS: u64 = 1000;

/// Longest accepted display window.
pub const MAX_HIGHLIGHT_WINDOW_MS: u64 = 60_000;

static NO_HIGHLIGHTS: ChangeSet = ChangeSet::new();

/// What happens to a pending countdown when a new set is activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    /// Every activation arms its own countdown. An earlier countdown still
    /// fires on its original schedule and clears whichever set is active at
    /// that moment, so rapid updates can shorten a flash.
    LetExpire,
    /// A new activation cancels the pending countdown; the active set always
    /// stays visible for the full window.
    #[default]
    Restart,
}

/// Highlight scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighlightConfig {
    /// Display window in milliseconds.
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    /// Countdown semantics under rapid updates.
    #[serde(default)]
    pub timer_mode: TimerMode,
}

fn default_window_ms() -> u64 {
    DEFAULT_HIGHLIGHT_WINDOW_MS
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            timer_mode: TimerMode::default(),
        }
    }
}

impl HighlightConfig {
    /// Display window, capped at [`MAX_HIGHLIGHT_WINDOW_MS`].
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms.min(MAX_HIGHLIGHT_WINDOW_MS))
    }
}

/// Owner of the active highlight set.
#[derive(Debug)]
pub struct HighlightScheduler {
    window: Duration,
    mode: TimerMode,
    active: ChangeSet,
    /// Pending clear deadlines, ascending.
    pending: VecDeque<Instant>,
}

impl HighlightScheduler {
    pub fn new(config: &HighlightConfig) -> Self {
        Self {
            window: config.window(),
            mode: config.timer_mode,
            active: ChangeSet::new(),
            pending: VecDeque::new(),
        }
    }

    /// Replace the active set with `changes` and arm a countdown.
    ///
    /// An empty `changes` has no effect and arms nothing. Returns whether the
    /// active set changed (including via an expiry due at `now`).
    pub fn activate(&mut self, changes: ChangeSet, now: Instant) -> bool {
        let expired = self.expire(now);
        if changes.is_empty() {
            return expired;
        }

        if self.mode == TimerMode::Restart {
            self.pending.clear();
        }
        let deadline = now + self.window;
        let at = self.pending.partition_point(|d| *d <= deadline);
        self.pending.insert(at, deadline);

        trace!(
            fields = changes.len(),
            pending = self.pending.len(),
            "Highlights activated"
        );
        self.active = changes;
        true
    }

    /// Fire every countdown due at `now`.
    ///
    /// Returns true if a non-empty active set was cleared.
    pub fn expire(&mut self, now: Instant) -> bool {
        let mut fired = false;
        while self.pending.front().is_some_and(|deadline| *deadline <= now) {
            self.pending.pop_front();
            fired = true;
        }

        if fired && !self.active.is_empty() {
            trace!("Highlights expired");
            self.active = ChangeSet::new();
            true
        } else {
            false
        }
    }

    /// Drop the active set and every pending countdown.
    pub fn clear(&mut self) {
        self.active = ChangeSet::new();
        self.pending.clear();
    }

    /// Active set as last updated by `activate` / `expire` / `clear`.
    pub fn active(&self) -> &ChangeSet {
        &self.active
    }

    /// Active set as it reads at `now`, counting countdowns that are due but
    /// have not been fired yet.
    pub fn active_at(&self, now: Instant) -> &ChangeSet {
        match self.pending.front() {
            Some(deadline) if *deadline <= now => &NO_HIGHLIGHTS,
            _ => &self.active,
        }
    }

    /// Earliest pending countdown.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.front().copied()
    }
}
