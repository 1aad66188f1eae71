//! Validation errors
//!
//! A [`ValidationError`] collects every issue found in a draft so the caller
//! can surface them inline at once. Validation errors are local: a draft that
//! fails validation is never sent to the server.

use cfg_snapshot::{ConfigDomain, SnapshotError};
use std::fmt::{self, Display, Formatter};

/// Why a single field was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    /// Duration below zero
    NegativeDuration(i64),
    /// Required reference is null
    MissingReference,
    /// Reference with an empty identifier
    BlankReference,
    /// Field could not be read with its declared kind
    Schema(String),
}

impl Display for IssueKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeDuration(ms) => write!(f, "negative duration ({ms}ms)"),
            Self::MissingReference => f.write_str("required while access control is enabled"),
            Self::BlankReference => f.write_str("reference has an empty identifier"),
            Self::Schema(reason) => f.write_str(reason),
        }
    }
}

/// One rejected field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    /// Field key
    pub field: String,
    /// Reason
    pub kind: IssueKind,
}

impl FieldIssue {
    /// Create new issue
    #[inline]
    #[must_use]
    pub fn new(field: impl Into<String>, kind: IssueKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }
}

impl Display for FieldIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.kind)
    }
}

/// Draft rejected by its domain's rules
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{domain} draft failed validation: {}", format_issues(.issues))]
pub struct ValidationError {
    /// Domain of the rejected draft
    pub domain: ConfigDomain,
    /// Every issue found
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    /// Build from collected issues; `Ok(())` when there are none
    ///
    /// # Errors
    /// Returns error if `issues` is non-empty
    pub fn check(domain: ConfigDomain, issues: Vec<FieldIssue>) -> Result<(), Self> {
        if issues.is_empty() {
            Ok(())
        } else {
            Err(Self { domain, issues })
        }
    }

    /// Issues reported for one field
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldIssue> + 'a {
        self.issues.iter().filter(move |issue| issue.field == field)
    }
}

impl From<SnapshotError> for ValidationError {
    fn from(err: SnapshotError) -> Self {
        let field = match &err {
            SnapshotError::UnknownField { key, .. } | SnapshotError::TypeMismatch { key, .. } => {
                key.clone()
            }
            SnapshotError::DomainMismatch { .. } | SnapshotError::Malformed { .. } => {
                String::new()
            }
        };
        Self {
            domain: err.domain(),
            issues: vec![FieldIssue::new(field, IssueKind::Schema(err.to_string()))],
        }
    }
}

fn format_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_passes_without_issues() {
        assert!(ValidationError::check(ConfigDomain::Rbac, Vec::new()).is_ok());
    }

    #[test]
    fn display_lists_every_issue() {
        let err = ValidationError::check(
            ConfigDomain::Retention,
            vec![
                FieldIssue::new("readLogRetention", IssueKind::NegativeDuration(-5)),
                FieldIssue::new("deleteLogRetention", IssueKind::NegativeDuration(-1)),
            ],
        )
        .unwrap_err();

        let text = err.to_string();
        assert!(text.contains("readLogRetention: negative duration (-5ms)"));
        assert!(text.contains("deleteLogRetention"));
        assert_eq!(err.for_field("readLogRetention").count(), 1);
    }
}
