//! Entity option lists supplied by the caller
//!
//! Organisation, group and user listings are fetched outside the core and
//! handed in as opaque identifier/label pairs. Rules only look entries up;
//! they never resolve entities themselves.

use cfg_snapshot::{EntityKind, EntityRef};
use serde::{Deserialize, Serialize};

/// One selectable entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityOption {
    /// Stable identifier
    pub id: String,
    /// Display label
    pub label: String,
    /// Member count, when the listing provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_count: Option<u64>,
}

impl EntityOption {
    /// Create new option
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            member_count: None,
        }
    }

    /// With member count
    #[inline]
    #[must_use]
    pub fn with_members(mut self, count: u64) -> Self {
        self.member_count = Some(count);
        self
    }
}

/// Option lists for every entity kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityOptions {
    /// Organisations
    #[serde(default)]
    pub organisations: Vec<EntityOption>,
    /// Groups
    #[serde(default)]
    pub groups: Vec<EntityOption>,
    /// Users
    #[serde(default)]
    pub users: Vec<EntityOption>,
}

impl EntityOptions {
    /// Empty option lists
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for one entity kind
    #[must_use]
    pub fn of_kind(&self, kind: EntityKind) -> &[EntityOption] {
        match kind {
            EntityKind::Organisation => &self.organisations,
            EntityKind::Group => &self.groups,
            EntityKind::User => &self.users,
        }
    }

    /// Option matching a reference, by identifier
    #[must_use]
    pub fn find(&self, entity: &EntityRef) -> Option<&EntityOption> {
        self.of_kind(entity.kind())
            .iter()
            .find(|option| option.id == entity.id())
    }

    /// Label for a reference: option label, then the reference's own label,
    /// then the raw identifier
    #[must_use]
    pub fn label_for(&self, entity: &EntityRef) -> String {
        self.find(entity)
            .map(|option| option.label.clone())
            .or_else(|| entity.label().map(str::to_string))
            .unwrap_or_else(|| entity.id().to_string())
    }
}
