//! Error types for the configuration console
//!
//! [`GatewayError`] is what a backend reports. The console translates it
//! into the caller-facing taxonomy rooted at [`ConsoleError`]:
//! - [`LoadError`]: fetch failed, retry with a refresh
//! - [`ValidationError`]: draft failed its domain rules, nothing was sent
//! - [`ConflictError`]: optimistic-concurrency failure, resolve with a rebase
//! - [`PersistError`]: commit refused for another reason, draft kept

use crate::rebase::ConflictReport;
use cfg_rules::ValidationError;
use cfg_snapshot::{ConfigDomain, ConfigSnapshot, SnapshotError};

/// Failure reported by a [`PersistenceGateway`](crate::PersistenceGateway)
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// No configuration stored for the domain yet
    #[error("no {domain} configuration stored yet")]
    NotFound {
        /// Requested domain
        domain: ConfigDomain,
    },

    /// Backend could not be reached
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// Backend answered with data that does not decode
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Expected version no longer current
    #[error("version conflict: server holds {}", version_text(.current))]
    Conflict {
        /// Server's current snapshot
        current: ConfigSnapshot,
    },

    /// Backend refused the commit
    #[error("commit rejected: {message}")]
    Rejected {
        /// Server message
        message: String,
    },
}

impl From<SnapshotError> for GatewayError {
    fn from(err: SnapshotError) -> Self {
        Self::Malformed(err.to_string())
    }
}

fn version_text(snapshot: &ConfigSnapshot) -> String {
    snapshot
        .version()
        .map_or_else(|| "no version".to_string(), ToString::to_string)
}

/// Fetch failed; previously loaded state is kept
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to load {domain} configuration: {reason}")]
pub struct LoadError {
    /// Domain being loaded
    pub domain: ConfigDomain,
    /// Failure description
    pub reason: String,
}

impl LoadError {
    /// Create new load error
    #[inline]
    #[must_use]
    pub fn new(domain: ConfigDomain, reason: impl Into<String>) -> Self {
        Self {
            domain,
            reason: reason.into(),
        }
    }

    /// Translate a gateway failure
    #[must_use]
    pub fn from_gateway(domain: ConfigDomain, err: &GatewayError) -> Self {
        Self::new(domain, err.to_string())
    }
}

/// Commit lost an optimistic-concurrency race
#[derive(Debug, Clone, thiserror::Error)]
#[error(
    "{} configuration changed on the server ({} field(s) differ from the local draft)",
    .report.remote.domain(),
    .report.against_remote.len()
)]
pub struct ConflictError {
    /// What diverged
    pub report: Box<ConflictReport>,
}

impl ConflictError {
    /// Create new conflict error
    #[inline]
    #[must_use]
    pub fn new(report: ConflictReport) -> Self {
        Self {
            report: Box::new(report),
        }
    }
}

/// Commit refused for a reason other than a version conflict
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to save {domain} configuration: {message}")]
pub struct PersistError {
    /// Domain being saved
    pub domain: ConfigDomain,
    /// Server (or transport) message
    pub message: String,
}

impl PersistError {
    /// Translate a gateway failure
    #[must_use]
    pub fn from_gateway(domain: ConfigDomain, err: &GatewayError) -> Self {
        let message = match err {
            GatewayError::Rejected { message } => message.clone(),
            other => other.to_string(),
        };
        Self { domain, message }
    }
}

/// Console error taxonomy
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConsoleError {
    /// Fetch failed
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Draft failed its domain rules
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Server moved since the draft's base
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    /// Commit refused
    #[error(transparent)]
    Persist(#[from] PersistError),

    /// Edit does not fit the schema
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// A commit is already in flight
    #[error("a save is already in progress for {domain}")]
    SaveInProgress {
        /// Domain
        domain: ConfigDomain,
    },

    /// Save attempted before resolving a conflict
    #[error("{domain} has an unresolved conflict; rebase before saving")]
    ConflictPending {
        /// Domain
        domain: ConfigDomain,
    },

    /// Rebase attempted with no conflict pending
    #[error("no conflict to resolve for {domain}")]
    NoConflict {
        /// Domain
        domain: ConfigDomain,
    },

    /// Refresh would discard unsaved edits
    #[error("{domain} has unsaved changes; confirm discarding them to refresh")]
    UnsavedChanges {
        /// Domain
        domain: ConfigDomain,
    },

    /// Operation needs a loaded draft
    #[error("{domain} configuration has not been loaded")]
    NotLoaded {
        /// Domain
        domain: ConfigDomain,
    },
}

impl ConsoleError {
    /// Check if retrying (or rebasing) can succeed without editing the draft
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Load(_)
                | Self::Conflict(_)
                | Self::Persist(_)
                | Self::SaveInProgress { .. }
                | Self::ConflictPending { .. }
        )
    }

    /// Check if the error was raised before any network call
    #[inline]
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Snapshot(_) | Self::NotLoaded { .. }
        )
    }

    /// Pending conflict report, if this is a conflict
    #[inline]
    #[must_use]
    pub fn conflict(&self) -> Option<&ConflictReport> {
        match self {
            Self::Conflict(err) => Some(&err.report),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfg_rules::{FieldIssue, IssueKind};

    #[test]
    fn rejected_message_passes_through() {
        let err = PersistError::from_gateway(
            ConfigDomain::Rbac,
            &GatewayError::Rejected {
                message: "quota exceeded".to_string(),
            },
        );
        assert_eq!(err.message, "quota exceeded");
        assert_eq!(
            err.to_string(),
            "failed to save rbac configuration: quota exceeded"
        );
    }

    #[test]
    fn recoverability() {
        let load: ConsoleError = LoadError::new(ConfigDomain::Retention, "timeout").into();
        assert!(load.is_recoverable());
        assert!(!load.is_local());

        let validation: ConsoleError = ValidationError {
            domain: ConfigDomain::Retention,
            issues: vec![FieldIssue::new("readLogRetention", IssueKind::NegativeDuration(-1))],
        }
        .into();
        assert!(!validation.is_recoverable());
        assert!(validation.is_local());

        let busy = ConsoleError::SaveInProgress {
            domain: ConfigDomain::Rbac,
        };
        assert!(busy.is_recoverable());
        assert!(busy.conflict().is_none());
    }

    #[test]
    fn snapshot_error_becomes_malformed() {
        let err: GatewayError = SnapshotError::UnknownField {
            domain: ConfigDomain::Rbac,
            key: "nope".to_string(),
        }
        .into();
        assert!(matches!(err, GatewayError::Malformed(_)));
    }
}
