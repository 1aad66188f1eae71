//! Transition rules trait and display types
//!
//! Provides the [`TransitionRules`] trait: pure, per-domain validation and
//! derivation applied before save and at display time.

use crate::error::{FieldIssue, IssueKind, ValidationError};
use crate::options::EntityOptions;
use cfg_snapshot::{ConfigDomain, ConfigSnapshot, SnapshotError};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Per-domain validation and derivation
///
/// # Contract
/// Implementations are pure: no I/O, no interior mutability, the same
/// snapshot always yields the same result. Nothing here mutates a snapshot;
/// derivations return new ones.
pub trait TransitionRules: Send + Sync + Debug {
    /// Domain these rules apply to
    fn domain(&self) -> ConfigDomain;

    /// Check a draft before it may be saved
    ///
    /// # Errors
    /// Returns every issue found
    fn validate(&self, draft: &ConfigSnapshot) -> Result<(), ValidationError>;

    /// Presentation fields for a snapshot
    ///
    /// Derived values only; stored values are left as they are.
    fn describe(&self, snapshot: &ConfigSnapshot, options: &EntityOptions) -> Vec<DisplayField>;

    /// Fill unset fields with suggested defaults
    ///
    /// Default implementation returns the draft unchanged.
    ///
    /// # Errors
    /// Returns error if the draft belongs to another domain
    fn suggest_defaults(
        &self,
        draft: &ConfigSnapshot,
        _options: &EntityOptions,
    ) -> Result<ConfigSnapshot, SnapshotError> {
        expect_domain(self.domain(), draft)?;
        Ok(draft.clone())
    }
}

/// One rendered value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayField {
    /// Field (or derived field) key
    pub key: String,
    /// Rendered text
    pub text: String,
}

impl DisplayField {
    /// Create new display field
    #[inline]
    #[must_use]
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
        }
    }
}

/// Find a display field by key
#[must_use]
pub fn display_text<'a>(fields: &'a [DisplayField], key: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|field| field.key == key)
        .map(|field| field.text.as_str())
}

pub(crate) fn expect_domain(
    expected: ConfigDomain,
    snapshot: &ConfigSnapshot,
) -> Result<(), SnapshotError> {
    if snapshot.domain() == expected {
        Ok(())
    } else {
        Err(SnapshotError::DomainMismatch {
            expected,
            actual: snapshot.domain(),
        })
    }
}

/// Issues for reference fields holding an empty identifier
pub(crate) fn blank_reference_issues(snapshot: &ConfigSnapshot) -> Vec<FieldIssue> {
    snapshot
        .fields()
        .iter()
        .filter_map(|(key, value)| value.as_ref_entity().map(|entity| (*key, entity)))
        .filter(|(_, entity)| entity.id().trim().is_empty())
        .map(|(key, _)| FieldIssue::new(key, IssueKind::BlankReference))
        .collect()
}
