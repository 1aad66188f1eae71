//! Snapshot schema errors

use crate::domain::ConfigDomain;
use crate::value::FieldKind;

/// Errors raised when a snapshot would violate its domain schema
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    /// Key is not declared for the domain
    #[error("{domain} has no field named {key:?}")]
    UnknownField { domain: ConfigDomain, key: String },

    /// Value does not fit the declared kind
    #[error("{domain}.{key} expects a {expected} value")]
    TypeMismatch {
        domain: ConfigDomain,
        key: String,
        expected: FieldKind,
    },

    /// Snapshot belongs to another domain
    #[error("expected a {expected} snapshot, got {actual}")]
    DomainMismatch {
        expected: ConfigDomain,
        actual: ConfigDomain,
    },

    /// Payload could not be decoded
    #[error("malformed {domain} payload: {reason}")]
    Malformed { domain: ConfigDomain, reason: String },
}

impl SnapshotError {
    /// Domain the error was raised for
    #[must_use]
    pub fn domain(&self) -> ConfigDomain {
        match self {
            Self::UnknownField { domain, .. }
            | Self::TypeMismatch { domain, .. }
            | Self::Malformed { domain, .. } => *domain,
            Self::DomainMismatch { expected, .. } => *expected,
        }
    }
}
