//! Configuration domains
//!
//! Each [`ConfigDomain`] is an independently persisted slice of configuration
//! with its own declared field schema.

use crate::schema::{self, FieldSpec};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// An independently persisted configuration slice
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigDomain {
    /// Default organisation handling
    Organisation,
    /// Role-based access control
    Rbac,
    /// Object and log retention policy
    Retention,
}

impl ConfigDomain {
    /// Every domain, in a stable order
    pub const ALL: [ConfigDomain; 3] = [Self::Organisation, Self::Rbac, Self::Retention];

    /// Stable lowercase identifier (also the wire name)
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Organisation => "organisation",
            Self::Rbac => "rbac",
            Self::Retention => "retention",
        }
    }

    /// Declared fields of this domain
    #[inline]
    #[must_use]
    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            Self::Organisation => schema::ORGANISATION_FIELDS,
            Self::Rbac => schema::RBAC_FIELDS,
            Self::Retention => schema::RETENTION_FIELDS,
        }
    }

    /// Look up a declared field by key
    #[must_use]
    pub fn field(self, key: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|spec| spec.key == key)
    }
}

impl Display for ConfigDomain {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a domain name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown configuration domain: {0}")]
pub struct UnknownDomain(pub String);

impl FromStr for ConfigDomain {
    type Err = UnknownDomain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|domain| domain.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownDomain(s.to_string()))
    }
}
