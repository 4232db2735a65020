//! Shared fixtures for integration tests.

pub mod mock_upstream;

use serde_json::{json, Value};

/// A complete snapshot payload with one 0DTE row.
pub fn snapshot_payload(spot: f64, call_bid: f64) -> Value {
    json!({
        "spot_price": spot,
        "active_strike": 5000,
        "straddles": [
            {"dte": "0DTE", "expiry": "20240119", "call_bid": call_bid, "call_ask": 4.3,
             "put_bid": 2.0, "put_ask": 2.2, "straddle_cost": 6.3,
             "iv": 0.15, "gamma": 0.02, "theta": -3.0}
        ],
        "last_update": "2024-01-19T14:30:05.123456"
    })
}
