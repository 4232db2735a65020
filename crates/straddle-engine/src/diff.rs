//! Snapshot diff.
//!
//! `diff` is pure: the previous snapshot is passed in explicitly by its
//! owner, never read from shared state.

use straddle_core::{ChangeSet, FieldKey, RowField, Snapshot};

/// Compute the set of fields that changed beyond tolerance.
///
/// - No previous snapshot, or a previous snapshot without rows (nothing
///   populated yet), yields the empty set whatever `next` holds.
/// - `spot_price` uses a 0.01 absolute tolerance; `active_strike` is exact.
/// - Row fields are compared only for indices present in both snapshots,
///   with absent values treated as 0 and a 0.001 absolute tolerance.
///   Rows that newly appear in `next` are not reported.
pub fn diff(previous: Option<&Snapshot>, next: &Snapshot) -> ChangeSet {
    let mut changes = ChangeSet::new();

    let Some(prev) = previous else {
        return changes;
    };
    if prev.rows.is_empty() {
        return changes;
    }

    if FieldKey::SPOT_PRICE
        .tolerance()
        .exceeded(prev.spot_price.unwrap_or(0.0), next.spot_price.unwrap_or(0.0))
    {
        changes.insert(FieldKey::SPOT_PRICE);
    }

    if prev.active_strike != next.active_strike {
        changes.insert(FieldKey::ACTIVE_STRIKE);
    }

    for (index, (before, after)) in prev.rows.iter().zip(&next.rows).enumerate() {
        for field in RowField::ALL {
            let key = FieldKey::row(index, field);
            let old = before.value(field).unwrap_or(0.0);
            let new = after.value(field).unwrap_or(0.0);
            if key.tolerance().exceeded(old, new) {
                changes.insert(key);
            }
        }
    }

    changes
}
