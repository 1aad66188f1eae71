//! Immutable, versioned configuration snapshots
//!
//! A [`ConfigSnapshot`] maps every declared field of one domain to a value.
//! Snapshots are never mutated in place: [`ConfigSnapshot::with_field`]
//! returns a new snapshot that structurally shares the untouched fields.

use crate::domain::ConfigDomain;
use crate::error::SnapshotError;
use crate::value::FieldValue;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Field map keyed by declared (static) field keys
pub type Fields = im::OrdMap<&'static str, FieldValue>;

/// Opaque server-assigned version token
///
/// Only compared for equality; clients never derive meaning from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotVersion(String);

impl SnapshotVersion {
    /// Wrap a server token
    #[inline]
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SnapshotVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable configuration snapshot for one domain
///
/// # Invariants
/// - `fields` holds exactly the domain's declared keys, each matching its kind
/// - `version` is `None` only for never-committed defaults and is otherwise
///   the token a gateway assigned
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSnapshot {
    domain: ConfigDomain,
    version: Option<SnapshotVersion>,
    fields: Fields,
}

impl ConfigSnapshot {
    /// Domain defaults, never committed
    #[must_use]
    pub fn defaults(domain: ConfigDomain) -> Self {
        let fields = domain
            .fields()
            .iter()
            .map(|spec| (spec.key, spec.default_value()))
            .collect();
        Self {
            domain,
            version: None,
            fields,
        }
    }

    /// Build a committed snapshot from server data
    ///
    /// Missing declared fields take their default.
    ///
    /// # Errors
    /// Returns error if a key is undeclared or a value has the wrong kind
    pub fn committed(
        domain: ConfigDomain,
        version: SnapshotVersion,
        fields: Fields,
    ) -> Result<Self, SnapshotError> {
        let mut snapshot = Self::defaults(domain);
        for (key, value) in fields {
            snapshot.fields = snapshot.checked_insert(key, value)?;
        }
        snapshot.version = Some(version);
        Ok(snapshot)
    }

    /// Domain
    #[inline]
    #[must_use]
    pub fn domain(&self) -> ConfigDomain {
        self.domain
    }

    /// Server version (`None` for uncommitted defaults)
    #[inline]
    #[must_use]
    pub fn version(&self) -> Option<&SnapshotVersion> {
        self.version.as_ref()
    }

    /// All fields
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Value of one field
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// New snapshot with one field replaced; the version is kept
    ///
    /// # Errors
    /// Returns error if `key` is not declared or `value` has the wrong kind
    pub fn with_field(&self, key: &str, value: FieldValue) -> Result<Self, SnapshotError> {
        Ok(Self {
            domain: self.domain,
            version: self.version.clone(),
            fields: self.checked_insert(key, value)?,
        })
    }

    /// This snapshot's fields on top of `base`'s version
    ///
    /// # Errors
    /// Returns error if `base` belongs to another domain
    pub fn rebased_onto(&self, base: &ConfigSnapshot) -> Result<Self, SnapshotError> {
        if base.domain != self.domain {
            return Err(SnapshotError::DomainMismatch {
                expected: self.domain,
                actual: base.domain,
            });
        }
        Ok(Self {
            domain: self.domain,
            version: base.version.clone(),
            fields: self.fields.clone(),
        })
    }

    /// Structural field equality (versions are ignored)
    #[inline]
    #[must_use]
    pub fn same_fields(&self, other: &ConfigSnapshot) -> bool {
        self.domain == other.domain && self.fields == other.fields
    }

    fn checked_insert(&self, key: &str, value: FieldValue) -> Result<Fields, SnapshotError> {
        let spec = self
            .domain
            .field(key)
            .ok_or_else(|| SnapshotError::UnknownField {
                domain: self.domain,
                key: key.to_string(),
            })?;
        if !value.matches(spec.kind) {
            return Err(SnapshotError::TypeMismatch {
                domain: self.domain,
                key: key.to_string(),
                expected: spec.kind,
            });
        }
        Ok(self.fields.update(spec.key, value))
    }
}
