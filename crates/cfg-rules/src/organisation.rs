//! Organisation rules
//!
//! The default organisation is stored by identifier. Its label and
//! membership count are derived from the caller's option list at display
//! time; the reference itself is never rewritten.

use crate::error::ValidationError;
use crate::options::EntityOptions;
use crate::rules::{blank_reference_issues, expect_domain, DisplayField, TransitionRules};
use cfg_snapshot::schema::{AUTO_CREATE_DEFAULT, DEFAULT_ORGANISATION_ID};
use cfg_snapshot::{ConfigDomain, ConfigSnapshot, OrganisationSettings};

/// Derived key: default organisation label
pub const DEFAULT_ORGANISATION_LABEL: &str = "defaultOrganisationLabel";
/// Derived key: default organisation member count
pub const DEFAULT_ORGANISATION_MEMBERS: &str = "defaultOrganisationMembers";

/// Label shown when no default organisation is set
pub const NO_DEFAULT_ORGANISATION: &str = "No default organisation";

/// Rules for the organisation domain
#[derive(Debug, Clone, Copy, Default)]
pub struct OrganisationRules;

impl OrganisationRules {
    /// Create new organisation rules
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl TransitionRules for OrganisationRules {
    fn domain(&self) -> ConfigDomain {
        ConfigDomain::Organisation
    }

    fn validate(&self, draft: &ConfigSnapshot) -> Result<(), ValidationError> {
        expect_domain(ConfigDomain::Organisation, draft)?;
        OrganisationSettings::from_snapshot(draft)?;
        ValidationError::check(ConfigDomain::Organisation, blank_reference_issues(draft))
    }

    fn describe(&self, snapshot: &ConfigSnapshot, options: &EntityOptions) -> Vec<DisplayField> {
        let Ok(settings) = OrganisationSettings::from_snapshot(snapshot) else {
            return Vec::new();
        };

        let (label, members) = match &settings.default_organisation {
            None => (NO_DEFAULT_ORGANISATION.to_string(), "-".to_string()),
            Some(entity) => match options.find(entity) {
                Some(option) => (
                    option.label.clone(),
                    option
                        .member_count
                        .map_or_else(|| "-".to_string(), members_text),
                ),
                None => (
                    format!("Unknown organisation ({})", entity.id()),
                    "-".to_string(),
                ),
            },
        };

        vec![
            DisplayField::new(
                DEFAULT_ORGANISATION_ID,
                settings
                    .default_organisation
                    .as_ref()
                    .map_or("", |entity| entity.id()),
            ),
            DisplayField::new(DEFAULT_ORGANISATION_LABEL, label),
            DisplayField::new(DEFAULT_ORGANISATION_MEMBERS, members),
            DisplayField::new(
                AUTO_CREATE_DEFAULT,
                if settings.auto_create_default {
                    "Enabled"
                } else {
                    "Disabled"
                },
            ),
        ]
    }
}

fn members_text(count: u64) -> String {
    if count == 1 {
        "1 member".to_string()
    } else {
        format!("{count} members")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::EntityOption;
    use crate::rules::display_text;
    use cfg_snapshot::{EntityRef, FieldValue};
    use pretty_assertions::assert_eq;

    fn options() -> EntityOptions {
        EntityOptions {
            organisations: vec![
                EntityOption::new("org-1", "Acme").with_members(12),
                EntityOption::new("org-2", "Globex").with_members(1),
            ],
            ..EntityOptions::new()
        }
    }

    #[test]
    fn describe_without_default() {
        let snapshot = ConfigSnapshot::defaults(ConfigDomain::Organisation);
        let fields = OrganisationRules::new().describe(&snapshot, &options());

        assert_eq!(
            display_text(&fields, DEFAULT_ORGANISATION_LABEL),
            Some(NO_DEFAULT_ORGANISATION)
        );
        assert_eq!(display_text(&fields, AUTO_CREATE_DEFAULT), Some("Enabled"));
    }

    #[test]
    fn describe_resolves_label_and_members() {
        let snapshot = ConfigSnapshot::defaults(ConfigDomain::Organisation)
            .with_field(DEFAULT_ORGANISATION_ID, EntityRef::organisation("org-1").into())
            .unwrap();
        let fields = OrganisationRules::new().describe(&snapshot, &options());

        assert_eq!(display_text(&fields, DEFAULT_ORGANISATION_LABEL), Some("Acme"));
        assert_eq!(display_text(&fields, DEFAULT_ORGANISATION_MEMBERS), Some("12 members"));
        // reference untouched
        assert_eq!(
            snapshot.get(DEFAULT_ORGANISATION_ID),
            Some(&FieldValue::from(EntityRef::organisation("org-1")))
        );
    }

    #[test]
    fn describe_unknown_organisation() {
        let snapshot = ConfigSnapshot::defaults(ConfigDomain::Organisation)
            .with_field(DEFAULT_ORGANISATION_ID, EntityRef::organisation("gone").into())
            .unwrap();
        let fields = OrganisationRules::new().describe(&snapshot, &options());

        assert_eq!(
            display_text(&fields, DEFAULT_ORGANISATION_LABEL),
            Some("Unknown organisation (gone)")
        );
    }

    #[test]
    fn validate_rejects_blank_reference() {
        let snapshot = ConfigSnapshot::defaults(ConfigDomain::Organisation)
            .with_field(DEFAULT_ORGANISATION_ID, EntityRef::organisation(" ").into())
            .unwrap();
        assert!(OrganisationRules::new().validate(&snapshot).is_err());
    }
}
