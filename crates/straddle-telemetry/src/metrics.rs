//! Prometheus metrics for the straddle monitor.
//!
//! Covers:
//! - Connection state and reconnects
//! - Inbound events and snapshot reconciliation
//! - Highlight activation / expiry
//! - Dashboard clients
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a startup bug; it only happens during
//! static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_gauge_vec, register_histogram,
    register_int_gauge, Counter, CounterVec, Encoder, GaugeVec, Histogram, IntGauge, TextEncoder,
};
use straddle_core::ConnectionState;

use crate::error::TelemetryResult;

/// Connection state (1 = active state, 0 = inactive).
/// Labels: state (disconnected/connecting/connected/error)
pub static CONNECTION_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "straddle_connection_state",
        "Connection state machine current state (1=active, 0=inactive)",
        &["state"]
    )
    .unwrap()
});

/// Total reconnection attempts against the upstream service.
pub static RECONNECT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "straddle_reconnect_total",
        "Total upstream reconnection attempts",
        &["reason"]
    )
    .unwrap()
});

/// Inbound events processed, by kind.
pub static EVENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "straddle_events_total",
        "Inbound events processed by the coordinator",
        &["kind"]
    )
    .unwrap()
});

/// Snapshots reconciled.
pub static SNAPSHOTS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!("straddle_snapshots_total", "Snapshots reconciled").unwrap()
});

/// Fields flagged as changed per snapshot.
pub static CHANGED_FIELDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "straddle_changed_fields",
        "Fields flagged as changed per snapshot",
        vec![0.0, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0]
    )
    .unwrap()
});

/// Malformed snapshot fields replaced by defaults.
pub static MALFORMED_FIELDS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "straddle_malformed_fields_total",
        "Malformed snapshot fields replaced by defaults"
    )
    .unwrap()
});

/// Highlight sets cleared by an expiring countdown.
pub static HIGHLIGHT_CLEARS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "straddle_highlight_clears_total",
        "Highlight sets cleared by an expiring countdown"
    )
    .unwrap()
});

/// Connected dashboard websocket clients.
pub static DASHBOARD_CLIENTS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "straddle_dashboard_clients",
        "Connected dashboard websocket clients"
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Set the connection state. Only the active state is 1.
    pub fn connection_state_set(state: ConnectionState) {
        for s in ConnectionState::ALL {
            CONNECTION_STATE.with_label_values(&[s.as_str()]).set(0.0);
        }
        CONNECTION_STATE
            .with_label_values(&[state.as_str()])
            .set(1.0);
    }

    /// Record a reconnection attempt.
    pub fn reconnect(reason: &str) {
        RECONNECT_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn event(kind: &str) {
        EVENTS_TOTAL.with_label_values(&[kind]).inc();
    }

    /// Record one reconciled snapshot.
    pub fn snapshot_reconciled(changed_fields: usize, malformed_fields: usize) {
        SNAPSHOTS_TOTAL.inc();
        CHANGED_FIELDS.observe(changed_fields as f64);
        if malformed_fields > 0 {
            MALFORMED_FIELDS_TOTAL.inc_by(malformed_fields as f64);
        }
    }

    pub fn highlights_cleared() {
        HIGHLIGHT_CLEARS_TOTAL.inc();
    }

    pub fn dashboard_client_connected() {
        DASHBOARD_CLIENTS.inc();
    }

    pub fn dashboard_client_disconnected() {
        DASHBOARD_CLIENTS.dec();
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }
}
