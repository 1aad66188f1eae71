//! Strongly typed views over domain snapshots

use crate::domain::ConfigDomain;
use crate::error::SnapshotError;
use crate::schema::{
    ADMIN_OVERRIDE, ANONYMOUS_GROUP, AUDIT_TRAILS_ENABLED, AUTO_CREATE_DEFAULT,
    DEFAULT_NEW_USER_GROUP, DEFAULT_OBJECT_OWNER, DEFAULT_ORGANISATION_ID, RBAC_ENABLED,
    RETENTION_DURATION_KEYS, SEARCH_TRAILS_ENABLED,
};
use crate::snapshot::ConfigSnapshot;
use crate::value::{EntityRef, FieldKind, FieldValue};

fn expect_domain(snapshot: &ConfigSnapshot, domain: ConfigDomain) -> Result<(), SnapshotError> {
    if snapshot.domain() == domain {
        Ok(())
    } else {
        Err(SnapshotError::DomainMismatch {
            expected: domain,
            actual: snapshot.domain(),
        })
    }
}

fn field<'a>(snapshot: &'a ConfigSnapshot, key: &str) -> Result<&'a FieldValue, SnapshotError> {
    snapshot.get(key).ok_or_else(|| SnapshotError::UnknownField {
        domain: snapshot.domain(),
        key: key.to_string(),
    })
}

fn mismatch(snapshot: &ConfigSnapshot, key: &str, expected: FieldKind) -> SnapshotError {
    SnapshotError::TypeMismatch {
        domain: snapshot.domain(),
        key: key.to_string(),
        expected,
    }
}

fn bool_field(snapshot: &ConfigSnapshot, key: &str) -> Result<bool, SnapshotError> {
    field(snapshot, key)?
        .as_bool()
        .ok_or_else(|| mismatch(snapshot, key, FieldKind::Bool))
}

fn ref_field(snapshot: &ConfigSnapshot, key: &str) -> Result<Option<EntityRef>, SnapshotError> {
    match field(snapshot, key)? {
        FieldValue::Ref(entity) => Ok(entity.clone()),
        _ => {
            let kind = snapshot
                .domain()
                .field(key)
                .map_or(FieldKind::Bool, |spec| spec.kind);
            Err(mismatch(snapshot, key, kind))
        }
    }
}

/// Organisation settings
#[derive(Debug, Clone, PartialEq)]
pub struct OrganisationSettings {
    /// Default organisation, by id
    pub default_organisation: Option<EntityRef>,
    /// Create a default organisation automatically
    pub auto_create_default: bool,
}

impl OrganisationSettings {
    /// Read from a snapshot
    ///
    /// # Errors
    /// Returns error if the snapshot is not an organisation snapshot
    pub fn from_snapshot(snapshot: &ConfigSnapshot) -> Result<Self, SnapshotError> {
        expect_domain(snapshot, ConfigDomain::Organisation)?;
        Ok(Self {
            default_organisation: ref_field(snapshot, DEFAULT_ORGANISATION_ID)?,
            auto_create_default: bool_field(snapshot, AUTO_CREATE_DEFAULT)?,
        })
    }
}

/// Role-based access control settings
#[derive(Debug, Clone, PartialEq)]
pub struct RbacSettings {
    /// RBAC switched on
    pub enabled: bool,
    /// Administrators bypass checks
    pub admin_override: bool,
    /// Group granted to anonymous visitors
    pub anonymous_group: Option<EntityRef>,
    /// Group assigned to new users
    pub default_new_user_group: Option<EntityRef>,
    /// Owner assigned to new objects
    pub default_object_owner: Option<EntityRef>,
}

impl RbacSettings {
    /// Read from a snapshot
    ///
    /// # Errors
    /// Returns error if the snapshot is not an RBAC snapshot
    pub fn from_snapshot(snapshot: &ConfigSnapshot) -> Result<Self, SnapshotError> {
        expect_domain(snapshot, ConfigDomain::Rbac)?;
        Ok(Self {
            enabled: bool_field(snapshot, RBAC_ENABLED)?,
            admin_override: bool_field(snapshot, ADMIN_OVERRIDE)?,
            anonymous_group: ref_field(snapshot, ANONYMOUS_GROUP)?,
            default_new_user_group: ref_field(snapshot, DEFAULT_NEW_USER_GROUP)?,
            default_object_owner: ref_field(snapshot, DEFAULT_OBJECT_OWNER)?,
        })
    }
}

/// Retention settings
///
/// Durations stay raw signed milliseconds here; sign checks belong to
/// validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RetentionSettings {
    /// `(key, millis)` for each of the seven durations, in display order
    pub durations: Vec<(&'static str, i64)>,
    /// Audit trails toggle
    pub audit_trails_enabled: bool,
    /// Search trails toggle
    pub search_trails_enabled: bool,
}

impl RetentionSettings {
    /// Read from a snapshot
    ///
    /// # Errors
    /// Returns error if the snapshot is not a retention snapshot
    pub fn from_snapshot(snapshot: &ConfigSnapshot) -> Result<Self, SnapshotError> {
        expect_domain(snapshot, ConfigDomain::Retention)?;
        let durations = RETENTION_DURATION_KEYS
            .iter()
            .map(|&key| {
                field(snapshot, key)?
                    .as_millis()
                    .map(|ms| (key, ms))
                    .ok_or_else(|| mismatch(snapshot, key, FieldKind::Millis))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            durations,
            audit_trails_enabled: bool_field(snapshot, AUDIT_TRAILS_ENABLED)?,
            search_trails_enabled: bool_field(snapshot, SEARCH_TRAILS_ENABLED)?,
        })
    }

    /// Milliseconds stored for one duration key
    #[must_use]
    pub fn duration(&self, key: &str) -> Option<i64> {
        self.durations
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, ms)| *ms)
    }
}
