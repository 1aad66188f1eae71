//! Structural field-level diffs between snapshots

use crate::snapshot::ConfigSnapshot;
use crate::value::FieldValue;
use std::fmt::{self, Display, Formatter};

/// One field whose value differs
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    /// Field key
    pub key: &'static str,
    /// Value in the `from` snapshot
    pub before: FieldValue,
    /// Value in the `to` snapshot
    pub after: FieldValue,
}

impl Display for FieldChange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.key, self.before, self.after)
    }
}

/// Field-level differences between two snapshots of the same domain
///
/// Empty iff the snapshots' fields are structurally equal.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SnapshotDiff {
    changes: Vec<FieldChange>,
}

impl SnapshotDiff {
    /// Compute the diff `from -> to`, in key order
    #[must_use]
    pub fn between(from: &ConfigSnapshot, to: &ConfigSnapshot) -> Self {
        let changes = from
            .domain()
            .fields()
            .iter()
            .filter_map(|spec| {
                let before = from.get(spec.key).cloned().unwrap_or_else(|| spec.default_value());
                let after = to.get(spec.key).cloned().unwrap_or_else(|| spec.default_value());
                (before != after).then_some(FieldChange {
                    key: spec.key,
                    before,
                    after,
                })
            })
            .collect();
        Self { changes }
    }

    /// Whether no field differs
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of differing fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// The differing fields
    #[inline]
    #[must_use]
    pub fn changes(&self) -> &[FieldChange] {
        &self.changes
    }

    /// Keys of the differing fields
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.changes.iter().map(|change| change.key)
    }

    /// Whether `key` differs
    #[must_use]
    pub fn touches(&self, key: &str) -> bool {
        self.changes.iter().any(|change| change.key == key)
    }
}
