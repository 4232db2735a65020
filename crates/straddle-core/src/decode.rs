//! Lenient snapshot decoding.
//!
//! Upstream payloads are decoded field by field. A field that fails
//! validation becomes absent and is reported as a [`FieldIssue`]; the rest of
//! the snapshot is kept. Decoding never fails on a JSON value.
//!
//! Field names follow the upstream wire format (snake_case, rows under
//! `straddles`); camelCase aliases (`spotPrice`, `rows`, `callBid`, ...) are
//! accepted as well.

use std::fmt;

use serde_json::{Map, Value};

use crate::field::RowField;
use crate::types::{ConnectionState, Snapshot, StraddleRow, Strike};

/// Why a field was replaced by its neutral default.
#[derive(Debug, Clone, PartialEq)]
pub enum IssueReason {
    /// Required field not present.
    Missing,
    /// Expected a number.
    NotANumber,
    /// Expected a string.
    NotAString,
    /// Expected a number or a string.
    NotAStrike,
    /// Expected an object.
    NotAnObject,
    /// Expected an array.
    NotAnArray,
    /// Status string outside the known connection states.
    UnknownStatus(String),
}

impl fmt::Display for IssueReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "missing"),
            Self::NotANumber => write!(f, "not a number"),
            Self::NotAString => write!(f, "not a string"),
            Self::NotAStrike => write!(f, "not a number or string"),
            Self::NotAnObject => write!(f, "not an object"),
            Self::NotAnArray => write!(f, "not an array"),
            Self::UnknownStatus(s) => write!(f, "unknown status {s:?}"),
        }
    }
}

/// A field that was repaired during decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldIssue {
    /// Location in the payload, e.g. `straddles[2].iv`.
    pub path: String,
    pub reason: IssueReason,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

/// Decoding result: the best-effort snapshot plus every repair made.
#[derive(Debug, Clone, Default)]
pub struct Decoded {
    pub snapshot: Snapshot,
    pub issues: Vec<FieldIssue>,
}

impl Snapshot {
    /// Decode an upstream `data_update` payload.
    pub fn decode(value: &Value) -> Decoded {
        let mut decoder = Decoder::default();
        let snapshot = decoder.snapshot(value);
        Decoded {
            snapshot,
            issues: decoder.issues,
        }
    }
}

#[derive(Default)]
struct Decoder {
    issues: Vec<FieldIssue>,
}

impl Decoder {
    fn report(&mut self, path: impl Into<String>, reason: IssueReason) {
        self.issues.push(FieldIssue {
            path: path.into(),
            reason,
        });
    }

    fn snapshot(&mut self, value: &Value) -> Snapshot {
        let Some(obj) = value.as_object() else {
            self.report("$", IssueReason::NotAnObject);
            return Snapshot::default();
        };

        let spot_price = match lookup(obj, &["spot_price", "spotPrice"]) {
            Some(v) => self.number("spot_price", v),
            None => {
                self.report("spot_price", IssueReason::Missing);
                None
            }
        };

        let active_strike = lookup(obj, &["active_strike", "activeStrike"])
            .and_then(|v| self.strike("active_strike", v));

        let rows = match lookup(obj, &["straddles", "rows"]) {
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.row(i, item))
                .collect(),
            Some(Value::Null) | None => {
                self.report("straddles", IssueReason::Missing);
                Vec::new()
            }
            Some(_) => {
                self.report("straddles", IssueReason::NotAnArray);
                Vec::new()
            }
        };

        let status = lookup(obj, &["status"]).and_then(|v| self.status(v));

        let last_update = lookup(obj, &["last_update", "lastUpdate"])
            .and_then(|v| self.text("last_update", v));

        Snapshot {
            spot_price,
            active_strike,
            rows,
            status,
            last_update,
        }
    }

    fn row(&mut self, index: usize, value: &Value) -> StraddleRow {
        let Some(obj) = value.as_object() else {
            self.report(format!("straddles[{index}]"), IssueReason::NotAnObject);
            return StraddleRow::default();
        };

        let mut row = StraddleRow {
            dte: lookup(obj, &["dte"])
                .and_then(|v| self.text(format!("straddles[{index}].dte"), v)),
            expiry: lookup(obj, &["expiry"])
                .and_then(|v| self.text(format!("straddles[{index}].expiry"), v)),
            ..Default::default()
        };

        for field in RowField::ALL {
            if let Some(v) = lookup(obj, &[field.as_str(), field.camel_name()]) {
                *row.slot_mut(field) =
                    self.number(format!("straddles[{index}].{}", field.as_str()), v);
            }
        }

        row
    }

    fn number(&mut self, path: impl Into<String>, value: &Value) -> Option<f64> {
        match value {
            Value::Null => None,
            Value::Number(n) => match n.as_f64().filter(|f| f.is_finite()) {
                Some(f) => Some(f),
                None => {
                    self.report(path, IssueReason::NotANumber);
                    None
                }
            },
            _ => {
                self.report(path, IssueReason::NotANumber);
                None
            }
        }
    }

    fn text(&mut self, path: impl Into<String>, value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            _ => {
                self.report(path, IssueReason::NotAString);
                None
            }
        }
    }

    fn strike(&mut self, path: &str, value: &Value) -> Option<Strike> {
        match value {
            Value::Null => None,
            Value::Number(n) => match n.as_f64().filter(|f| f.is_finite()) {
                Some(f) => Some(Strike::Number(f)),
                None => {
                    self.report(path, IssueReason::NotAStrike);
                    None
                }
            },
            Value::String(s) => Some(Strike::Text(s.clone())),
            _ => {
                self.report(path, IssueReason::NotAStrike);
                None
            }
        }
    }

    fn status(&mut self, value: &Value) -> Option<ConnectionState> {
        let raw = self.text("status", value)?;
        match raw.parse::<ConnectionState>() {
            Ok(state) => Some(state),
            Err(_) => {
                self.report("status", IssueReason::UnknownStatus(raw));
                None
            }
        }
    }
}

/// First present key among `keys`.
fn lookup<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn upstream_payload() -> Value {
        json!({
            "spot_price": 5012.35,
            "active_strike": 5010,
            "straddles": [
                {
                    "dte": "0DTE",
                    "expiry": "20240119",
                    "call_bid": 4.1,
                    "call_ask": 4.3,
                    "put_bid": 2.0,
                    "put_ask": 2.2,
                    "straddle_cost": 6.3,
                    "iv": 0.15,
                    "gamma": 0.021,
                    "theta": -3.2
                },
                {
                    "dte": "1DTE",
                    "expiry": "20240122",
                    "call_bid": 12.0,
                    "call_ask": 12.4,
                    "put_bid": 10.1,
                    "put_ask": 10.5,
                    "straddle_cost": 22.5,
                    "iv": 0.13,
                    "gamma": 0.009,
                    "theta": -1.4
                }
            ],
            "status": "connected",
            "last_update": "2024-01-19T14:30:05.123456"
        })
    }

    #[test]
    fn test_decode_upstream_payload() {
        let decoded = Snapshot::decode(&upstream_payload());
        assert!(decoded.issues.is_empty(), "issues: {:?}", decoded.issues);

        let snapshot = decoded.snapshot;
        assert_eq!(snapshot.spot_price, Some(5012.35));
        assert_eq!(snapshot.active_strike, Some(Strike::Number(5010.0)));
        assert_eq!(snapshot.rows.len(), 2);
        assert_eq!(snapshot.rows[0].dte.as_deref(), Some("0DTE"));
        assert_eq!(snapshot.rows[1].value(RowField::Theta), Some(-1.4));
        assert_eq!(snapshot.status, Some(ConnectionState::Connected));
        assert!(snapshot.last_update_at().is_some());
    }

    #[test]
    fn test_decode_camel_case_aliases() {
        let decoded = Snapshot::decode(&json!({
            "spotPrice": 5000.0,
            "activeStrike": "5000",
            "rows": [{"callBid": 1.5, "straddleCost": 3.0, "iv": null}],
            "lastUpdate": "2024-01-19T14:30:05Z"
        }));
        assert!(decoded.issues.is_empty(), "issues: {:?}", decoded.issues);

        let snapshot = decoded.snapshot;
        assert_eq!(snapshot.active_strike, Some(Strike::Text("5000".into())));
        assert_eq!(snapshot.rows[0].call_bid, Some(1.5));
        assert_eq!(snapshot.rows[0].straddle_cost, Some(3.0));
        assert_eq!(snapshot.rows[0].iv, None);
        assert_eq!(snapshot.status, None);
    }

    #[test]
    fn test_non_numeric_iv_becomes_absent() {
        let mut payload = upstream_payload();
        payload["straddles"][1]["iv"] = json!("n/a");

        let decoded = Snapshot::decode(&payload);
        assert_eq!(decoded.snapshot.rows[1].iv, None);
        assert_eq!(decoded.snapshot.rows[1].gamma, Some(0.009));
        assert_eq!(
            decoded.issues,
            vec![FieldIssue {
                path: "straddles[1].iv".to_string(),
                reason: IssueReason::NotANumber,
            }]
        );
    }

    #[test]
    fn test_missing_rows_becomes_empty() {
        let decoded = Snapshot::decode(&json!({"spot_price": 5000.0}));
        assert!(decoded.snapshot.rows.is_empty());
        assert!(decoded
            .issues
            .iter()
            .any(|i| i.path == "straddles" && i.reason == IssueReason::Missing));
    }

    #[test]
    fn test_non_object_row_keeps_its_index() {
        let decoded = Snapshot::decode(&json!({
            "spot_price": 5000.0,
            "straddles": [42, {"iv": 0.2}]
        }));
        assert_eq!(decoded.snapshot.rows.len(), 2);
        assert_eq!(decoded.snapshot.rows[0], StraddleRow::default());
        assert_eq!(decoded.snapshot.rows[1].iv, Some(0.2));
        assert_eq!(decoded.issues[0].path, "straddles[0]");
    }

    #[test]
    fn test_unknown_status_is_dropped() {
        let decoded = Snapshot::decode(&json!({
            "spot_price": 5000.0,
            "straddles": [],
            "status": "reconnecting"
        }));
        assert_eq!(decoded.snapshot.status, None);
        assert_eq!(
            decoded.issues[0].reason,
            IssueReason::UnknownStatus("reconnecting".into())
        );
    }

    #[test]
    fn test_non_object_payload() {
        let decoded = Snapshot::decode(&json!([1, 2, 3]));
        assert_eq!(decoded.snapshot, Snapshot::default());
        assert_eq!(decoded.issues.len(), 1);
        assert_eq!(decoded.issues[0].to_string(), "$: not an object");
    }
}
