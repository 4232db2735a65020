//! Field identifiers and change sets.
//!
//! A `FieldKey` names one displayable value: either a scalar
//! (`spot_price`, `active_strike`) or a `(row index, field)` pair.
//! Row identity is purely positional.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Serialize, Serializer};

/// Change threshold for the spot price.
pub const SPOT_PRICE_TOLERANCE: f64 = 0.01;

/// Change threshold for every numeric row field (quotes and greeks).
pub const ROW_FIELD_TOLERANCE: f64 = 0.001;

/// Scalar (snapshot-level) fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarField {
    SpotPrice,
    ActiveStrike,
}

impl ScalarField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SpotPrice => "spot_price",
            Self::ActiveStrike => "active_strike",
        }
    }
}

/// Numeric fields of a straddle row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RowField {
    CallBid,
    CallAsk,
    PutBid,
    PutAsk,
    StraddleCost,
    Iv,
    Gamma,
    Theta,
}

impl RowField {
    /// Every compared row field, in display order.
    pub const ALL: [RowField; 8] = [
        Self::CallBid,
        Self::CallAsk,
        Self::PutBid,
        Self::PutAsk,
        Self::StraddleCost,
        Self::Iv,
        Self::Gamma,
        Self::Theta,
    ];

    /// Wire (snake_case) name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CallBid => "call_bid",
            Self::CallAsk => "call_ask",
            Self::PutBid => "put_bid",
            Self::PutAsk => "put_ask",
            Self::StraddleCost => "straddle_cost",
            Self::Iv => "iv",
            Self::Gamma => "gamma",
            Self::Theta => "theta",
        }
    }

    /// camelCase alias accepted on input.
    pub fn camel_name(&self) -> &'static str {
        match self {
            Self::CallBid => "callBid",
            Self::CallAsk => "callAsk",
            Self::PutBid => "putBid",
            Self::PutAsk => "putAsk",
            Self::StraddleCost => "straddleCost",
            Self::Iv => "iv",
            Self::Gamma => "gamma",
            Self::Theta => "theta",
        }
    }
}

/// How two values of a field are compared.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tolerance {
    /// Any inequality is a change.
    Exact,
    /// Changed iff `|prev - next| > threshold`.
    Absolute(f64),
}

impl Tolerance {
    /// Whether the move from `prev` to `next` exceeds this tolerance.
    pub fn exceeded(self, prev: f64, next: f64) -> bool {
        match self {
            Self::Exact => prev != next,
            Self::Absolute(threshold) => (prev - next).abs() > threshold,
        }
    }
}

/// Identifier of one displayable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKey {
    Scalar(ScalarField),
    Row { index: usize, field: RowField },
}

impl FieldKey {
    pub const SPOT_PRICE: FieldKey = FieldKey::Scalar(ScalarField::SpotPrice);
    pub const ACTIVE_STRIKE: FieldKey = FieldKey::Scalar(ScalarField::ActiveStrike);

    pub fn row(index: usize, field: RowField) -> Self {
        Self::Row { index, field }
    }

    /// Comparison tolerance for this key.
    pub const fn tolerance(&self) -> Tolerance {
        match self {
            Self::Scalar(ScalarField::SpotPrice) => Tolerance::Absolute(SPOT_PRICE_TOLERANCE),
            Self::Scalar(ScalarField::ActiveStrike) => Tolerance::Exact,
            Self::Row { .. } => Tolerance::Absolute(ROW_FIELD_TOLERANCE),
        }
    }

    /// Row index, for row keys.
    pub fn row_index(&self) -> Option<usize> {
        match self {
            Self::Row { index, .. } => Some(*index),
            Self::Scalar(_) => None,
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(scalar) => f.write_str(scalar.as_str()),
            Self::Row { index, field } => write!(f, "{}.{}", index, field.as_str()),
        }
    }
}

impl Serialize for FieldKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Set of field keys that changed between two consecutive snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChangeSet(BTreeSet<FieldKey>);

impl ChangeSet {
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Insert a key. Returns false if it was already present.
    pub fn insert(&mut self, key: FieldKey) -> bool {
        self.0.insert(key)
    }

    pub fn contains(&self, key: &FieldKey) -> bool {
        self.0.contains(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldKey> {
        self.0.iter()
    }
}

impl FromIterator<FieldKey> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = FieldKey>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a FieldKey;
    type IntoIter = std::collections::btree_set::Iter<'a, FieldKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
