//! Heartbeat monitoring for the upstream connection.
//!
//! Tracks frame activity and ping/pong timing. A ping is due after
//! `interval` of silence; the session is considered dead when its pong does
//! not arrive within `timeout`.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
struct HeartbeatState {
    last_ping: Option<Instant>,
    last_pong: Option<Instant>,
    last_message: Instant,
    waiting_for_pong: bool,
}

/// Heartbeat monitor for one websocket session.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    interval: Duration,
    timeout: Duration,
    state: Mutex<HeartbeatState>,
}

impl HeartbeatMonitor {
    pub fn new(interval_ms: u64, timeout_ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms),
            timeout: Duration::from_millis(timeout_ms),
            state: Mutex::new(HeartbeatState {
                last_ping: None,
                last_pong: None,
                last_message: Instant::now(),
                waiting_for_pong: false,
            }),
        }
    }

    /// Reset state (called when a session starts).
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.last_ping = None;
        state.last_pong = None;
        state.last_message = Instant::now();
        state.waiting_for_pong = false;
    }

    pub fn record_ping(&self) {
        let mut state = self.state.lock();
        state.last_ping = Some(Instant::now());
        state.waiting_for_pong = true;
        debug!("Recorded ping");
    }

    pub fn record_pong(&self) {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.last_pong = Some(now);
        state.waiting_for_pong = false;
        state.last_message = now;

        if let Some(ping) = state.last_ping {
            debug!(rtt_ms = (now - ping).as_millis() as u64, "Received pong");
        }
    }

    /// Record that any frame was received.
    pub fn record_message(&self) {
        self.state.lock().last_message = Instant::now();
    }

    /// Whether the outstanding ping went unanswered for longer than the timeout.
    pub fn is_timed_out(&self) -> bool {
        let state = self.state.lock();
        match (state.waiting_for_pong, state.last_ping) {
            (true, Some(ping)) => ping.elapsed() > self.timeout,
            _ => false,
        }
    }

    /// Whether a ping should be sent now.
    pub fn should_send_heartbeat(&self) -> bool {
        let state = self.state.lock();
        !state.waiting_for_pong && state.last_message.elapsed() >= self.interval
    }

    /// Wait for the next heartbeat check.
    pub async fn wait_for_check(&self) {
        tokio::time::sleep(self.check_period()).await;
    }

    fn check_period(&self) -> Duration {
        (self.interval / 2).min(self.timeout / 2).max(Duration::from_millis(10))
    }

    pub fn stats(&self) -> HeartbeatStats {
        let state = self.state.lock();
        HeartbeatStats {
            waiting_for_pong: state.waiting_for_pong,
            since_last_message: state.last_message.elapsed(),
            last_rtt: match (state.last_ping, state.last_pong) {
                (Some(ping), Some(pong)) if pong >= ping => Some(pong - ping),
                _ => None,
            },
        }
    }
}

/// Heartbeat statistics.
#[derive(Debug, Clone)]
pub struct HeartbeatStats {
    pub waiting_for_pong: bool,
    pub since_last_message: Duration,
    pub last_rtt: Option<Duration>,
}
