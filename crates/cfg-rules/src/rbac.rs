//! Role-based access control rules
//!
//! With access control enabled, anonymous visitors and new users must land
//! in a group, so both group references are required before save.

use crate::error::{FieldIssue, IssueKind, ValidationError};
use crate::options::EntityOptions;
use crate::rules::{blank_reference_issues, expect_domain, DisplayField, TransitionRules};
use cfg_snapshot::schema::{
    ADMIN_OVERRIDE, ANONYMOUS_GROUP, DEFAULT_NEW_USER_GROUP, DEFAULT_OBJECT_OWNER, PUBLIC_GROUP,
    RBAC_ENABLED, VIEWER_GROUP,
};
use cfg_snapshot::{ConfigDomain, ConfigSnapshot, EntityRef, RbacSettings, SnapshotError};

/// Label for an unset group
pub const GROUP_NOT_SET: &str = "Not set";
/// Label for an unset default owner: objects belong to whoever creates them
pub const OBJECT_CREATOR: &str = "Object creator";

/// Rules for the RBAC domain
#[derive(Debug, Clone, Copy, Default)]
pub struct RbacRules;

impl RbacRules {
    /// Create new RBAC rules
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl TransitionRules for RbacRules {
    fn domain(&self) -> ConfigDomain {
        ConfigDomain::Rbac
    }

    fn validate(&self, draft: &ConfigSnapshot) -> Result<(), ValidationError> {
        expect_domain(ConfigDomain::Rbac, draft)?;
        let settings = RbacSettings::from_snapshot(draft)?;

        let mut issues = blank_reference_issues(draft);
        if settings.enabled {
            if settings.anonymous_group.is_none() {
                issues.push(FieldIssue::new(ANONYMOUS_GROUP, IssueKind::MissingReference));
            }
            if settings.default_new_user_group.is_none() {
                issues.push(FieldIssue::new(
                    DEFAULT_NEW_USER_GROUP,
                    IssueKind::MissingReference,
                ));
            }
        }

        ValidationError::check(ConfigDomain::Rbac, issues)
    }

    fn describe(&self, snapshot: &ConfigSnapshot, options: &EntityOptions) -> Vec<DisplayField> {
        let Ok(settings) = RbacSettings::from_snapshot(snapshot) else {
            return Vec::new();
        };

        let group = |entity: &Option<EntityRef>| {
            entity
                .as_ref()
                .map_or_else(|| GROUP_NOT_SET.to_string(), |e| options.label_for(e))
        };

        vec![
            DisplayField::new(RBAC_ENABLED, on_off(settings.enabled)),
            DisplayField::new(ADMIN_OVERRIDE, on_off(settings.admin_override)),
            DisplayField::new(ANONYMOUS_GROUP, group(&settings.anonymous_group)),
            DisplayField::new(DEFAULT_NEW_USER_GROUP, group(&settings.default_new_user_group)),
            DisplayField::new(
                DEFAULT_OBJECT_OWNER,
                settings
                    .default_object_owner
                    .as_ref()
                    .map_or_else(|| OBJECT_CREATOR.to_string(), |e| options.label_for(e)),
            ),
        ]
    }

    /// Fill null group references with the well-known `public` and `viewer`
    /// groups, when the group listing offers them
    fn suggest_defaults(
        &self,
        draft: &ConfigSnapshot,
        options: &EntityOptions,
    ) -> Result<ConfigSnapshot, SnapshotError> {
        expect_domain(ConfigDomain::Rbac, draft)?;

        let mut suggested = draft.clone();
        let well_known_groups = [
            (ANONYMOUS_GROUP, PUBLIC_GROUP),
            (DEFAULT_NEW_USER_GROUP, VIEWER_GROUP),
        ];
        for (key, well_known) in well_known_groups {
            let unset = suggested.get(key).is_some_and(cfg_snapshot::FieldValue::is_null);
            let offered = options.groups.iter().find(|option| option.id == well_known);
            if let (true, Some(option)) = (unset, offered) {
                let entity = EntityRef::group(option.id.clone()).with_label(option.label.clone());
                suggested = suggested.with_field(key, entity.into())?;
            }
        }
        Ok(suggested)
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "On"
    } else {
        "Off"
    }
}
