//! Declared field schemas per domain

use crate::value::{EntityKind, EntityRef, FieldKind, FieldValue};

/// Default value of a declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    /// Boolean default
    Bool(bool),
    /// Millisecond default
    Millis(i64),
    /// Null reference
    Null,
    /// Reference to a well-known entity id
    Ref(&'static str),
}

/// A declared field: key, kind and default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Wire key (camelCase)
    pub key: &'static str,
    /// Declared kind
    pub kind: FieldKind,
    /// Value used when the server has no row yet
    pub default: FieldDefault,
}

impl FieldSpec {
    const fn new(key: &'static str, kind: FieldKind, default: FieldDefault) -> Self {
        Self { key, kind, default }
    }

    /// Materialise the default value
    #[must_use]
    pub fn default_value(&self) -> FieldValue {
        match (self.default, self.kind) {
            (FieldDefault::Bool(b), _) => FieldValue::Bool(b),
            (FieldDefault::Millis(ms), _) => FieldValue::Millis(ms),
            (FieldDefault::Ref(id), FieldKind::Reference(kind)) => {
                FieldValue::Ref(Some(EntityRef::new(kind, id)))
            }
            (FieldDefault::Null | FieldDefault::Ref(_), _) => FieldValue::NULL_REF,
        }
    }
}

/// Milliseconds in one day
pub const DAY_MS: i64 = 86_400_000;

/// Organisation: default organisation id
pub const DEFAULT_ORGANISATION_ID: &str = "defaultOrganisationId";
/// Organisation: create a default organisation automatically
pub const AUTO_CREATE_DEFAULT: &str = "autoCreateDefault";

/// Rbac: access control switched on
pub const RBAC_ENABLED: &str = "enabled";
/// Rbac: administrators bypass checks
pub const ADMIN_OVERRIDE: &str = "adminOverride";
/// Rbac: group granted to anonymous visitors
pub const ANONYMOUS_GROUP: &str = "anonymousGroup";
/// Rbac: group assigned to new users
pub const DEFAULT_NEW_USER_GROUP: &str = "defaultNewUserGroup";
/// Rbac: owner assigned to new objects
pub const DEFAULT_OBJECT_OWNER: &str = "defaultObjectOwner";

/// Well-known group for anonymous access
pub const PUBLIC_GROUP: &str = "public";
/// Well-known group for new users
pub const VIEWER_GROUP: &str = "viewer";

/// Retention: archive objects after
pub const OBJECT_ARCHIVE_RETENTION: &str = "objectArchiveRetention";
/// Retention: delete objects after
pub const OBJECT_DELETE_RETENTION: &str = "objectDeleteRetention";
/// Retention: search trail lifetime
pub const SEARCH_TRAIL_RETENTION: &str = "searchTrailRetention";
/// Retention: create log lifetime
pub const CREATE_LOG_RETENTION: &str = "createLogRetention";
/// Retention: read log lifetime
pub const READ_LOG_RETENTION: &str = "readLogRetention";
/// Retention: update log lifetime
pub const UPDATE_LOG_RETENTION: &str = "updateLogRetention";
/// Retention: delete log lifetime
pub const DELETE_LOG_RETENTION: &str = "deleteLogRetention";
/// Retention: audit trails toggle
pub const AUDIT_TRAILS_ENABLED: &str = "auditTrailsEnabled";
/// Retention: search trails toggle
pub const SEARCH_TRAILS_ENABLED: &str = "searchTrailsEnabled";

pub(crate) const ORGANISATION_FIELDS: &[FieldSpec] = &[
    FieldSpec::new(
        DEFAULT_ORGANISATION_ID,
        FieldKind::Reference(EntityKind::Organisation),
        FieldDefault::Null,
    ),
    FieldSpec::new(AUTO_CREATE_DEFAULT, FieldKind::Bool, FieldDefault::Bool(true)),
];

pub(crate) const RBAC_FIELDS: &[FieldSpec] = &[
    FieldSpec::new(RBAC_ENABLED, FieldKind::Bool, FieldDefault::Bool(false)),
    FieldSpec::new(ADMIN_OVERRIDE, FieldKind::Bool, FieldDefault::Bool(true)),
    FieldSpec::new(
        ANONYMOUS_GROUP,
        FieldKind::Reference(EntityKind::Group),
        FieldDefault::Ref(PUBLIC_GROUP),
    ),
    FieldSpec::new(
        DEFAULT_NEW_USER_GROUP,
        FieldKind::Reference(EntityKind::Group),
        FieldDefault::Ref(VIEWER_GROUP),
    ),
    FieldSpec::new(
        DEFAULT_OBJECT_OWNER,
        FieldKind::Reference(EntityKind::User),
        FieldDefault::Null,
    ),
];

/// The seven retention duration keys, in display order
pub const RETENTION_DURATION_KEYS: [&str; 7] = [
    OBJECT_ARCHIVE_RETENTION,
    OBJECT_DELETE_RETENTION,
    SEARCH_TRAIL_RETENTION,
    CREATE_LOG_RETENTION,
    READ_LOG_RETENTION,
    UPDATE_LOG_RETENTION,
    DELETE_LOG_RETENTION,
];

pub(crate) const RETENTION_FIELDS: &[FieldSpec] = &[
    FieldSpec::new(OBJECT_ARCHIVE_RETENTION, FieldKind::Millis, FieldDefault::Millis(365 * DAY_MS)),
    FieldSpec::new(OBJECT_DELETE_RETENTION, FieldKind::Millis, FieldDefault::Millis(730 * DAY_MS)),
    FieldSpec::new(SEARCH_TRAIL_RETENTION, FieldKind::Millis, FieldDefault::Millis(30 * DAY_MS)),
    FieldSpec::new(CREATE_LOG_RETENTION, FieldKind::Millis, FieldDefault::Millis(30 * DAY_MS)),
    FieldSpec::new(READ_LOG_RETENTION, FieldKind::Millis, FieldDefault::Millis(DAY_MS)),
    FieldSpec::new(UPDATE_LOG_RETENTION, FieldKind::Millis, FieldDefault::Millis(7 * DAY_MS)),
    FieldSpec::new(DELETE_LOG_RETENTION, FieldKind::Millis, FieldDefault::Millis(30 * DAY_MS)),
    FieldSpec::new(AUDIT_TRAILS_ENABLED, FieldKind::Bool, FieldDefault::Bool(true)),
    FieldSpec::new(SEARCH_TRAILS_ENABLED, FieldKind::Bool, FieldDefault::Bool(true)),
];
