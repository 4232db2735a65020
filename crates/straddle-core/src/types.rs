//! Snapshot types.
//!
//! A `Snapshot` always carries the complete current state of the monitored
//! values; the upstream service never sends partial deltas.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::field::RowField;

/// Connection lifecycle state shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Initial state, and the state after the transport closes.
    #[default]
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// Transport established.
    Connected,
    /// Connection attempt failed or upstream reported an error.
    Error,
}

impl ConnectionState {
    /// All states, in lifecycle order.
    pub const ALL: [ConnectionState; 4] = [
        Self::Disconnected,
        Self::Connecting,
        Self::Connected,
        Self::Error,
    ];

    /// Wire name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::UnknownStatus(s.to_string()))
    }
}

/// Active ATM strike.
///
/// Upstream sends a number; a string is tolerated and compared verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Strike {
    Number(f64),
    Text(String),
}

impl fmt::Display for Strike {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One expiration's straddle quote.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StraddleRow {
    /// Days-to-expiration label (e.g. "0DTE").
    pub dte: Option<String>,
    /// Expiration date as sent by upstream (e.g. "20240119").
    pub expiry: Option<String>,
    pub call_bid: Option<f64>,
    pub call_ask: Option<f64>,
    pub put_bid: Option<f64>,
    pub put_ask: Option<f64>,
    /// Call mid + put mid.
    pub straddle_cost: Option<f64>,
    /// Implied volatility as a fraction (0.15 = 15%).
    pub iv: Option<f64>,
    pub gamma: Option<f64>,
    pub theta: Option<f64>,
}

impl StraddleRow {
    /// Value of a numeric row field.
    pub fn value(&self, field: RowField) -> Option<f64> {
        match field {
            RowField::CallBid => self.call_bid,
            RowField::CallAsk => self.call_ask,
            RowField::PutBid => self.put_bid,
            RowField::PutAsk => self.put_ask,
            RowField::StraddleCost => self.straddle_cost,
            RowField::Iv => self.iv,
            RowField::Gamma => self.gamma,
            RowField::Theta => self.theta,
        }
    }

    pub(crate) fn slot_mut(&mut self, field: RowField) -> &mut Option<f64> {
        match field {
            RowField::CallBid => &mut self.call_bid,
            RowField::CallAsk => &mut self.call_ask,
            RowField::PutBid => &mut self.put_bid,
            RowField::PutAsk => &mut self.put_ask,
            RowField::StraddleCost => &mut self.straddle_cost,
            RowField::Iv => &mut self.iv,
            RowField::Gamma => &mut self.gamma,
            RowField::Theta => &mut self.theta,
        }
    }
}

/// One complete state of all monitored values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    /// Underlying (SPX) price.
    pub spot_price: Option<f64>,
    /// Strike the straddles are quoted at.
    pub active_strike: Option<Strike>,
    /// One row per expiration; the index is part of each field's identity.
    #[serde(rename = "straddles")]
    pub rows: Vec<StraddleRow>,
    /// Upstream-reported status, overriding the locally tracked state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ConnectionState>,
    /// Opaque upstream timestamp.
    pub last_update: Option<String>,
}

impl Snapshot {
    /// Parse `last_update`.
    ///
    /// Accepts RFC 3339 and the naive ISO-8601 form upstream emits
    /// (`2024-01-19T14:30:05.123456`), the latter interpreted as UTC.
    pub fn last_update_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.last_update.as_deref()?.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// Row at `index`, if present.
    pub fn row(&self, index: usize) -> Option<&StraddleRow> {
        self.rows.get(index)
    }
}
