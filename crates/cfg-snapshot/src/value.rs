//! Typed field values
//!
//! Provides [`FieldValue`], the value stored under each declared field key,
//! and [`EntityRef`], a reference to an external entity held by identifier.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};

/// Kind of external entity a reference field points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Organisation entity
    Organisation,
    /// User group
    Group,
    /// Individual user
    User,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Organisation => f.write_str("organisation"),
            Self::Group => f.write_str("group"),
            Self::User => f.write_str("user"),
        }
    }
}

/// Reference to an entity by stable identifier
///
/// The optional label is display metadata only: equality and hashing look at
/// `kind` and `id`, so a relabelled entity never makes a draft dirty.
#[derive(Debug, Clone)]
pub struct EntityRef {
    kind: EntityKind,
    id: String,
    label: Option<String>,
}

impl EntityRef {
    /// Create a reference without a label
    #[inline]
    #[must_use]
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            label: None,
        }
    }

    /// Shorthand for an organisation reference
    #[inline]
    #[must_use]
    pub fn organisation(id: impl Into<String>) -> Self {
        Self::new(EntityKind::Organisation, id)
    }

    /// Shorthand for a group reference
    #[inline]
    #[must_use]
    pub fn group(id: impl Into<String>) -> Self {
        Self::new(EntityKind::Group, id)
    }

    /// Shorthand for a user reference
    #[inline]
    #[must_use]
    pub fn user(id: impl Into<String>) -> Self {
        Self::new(EntityKind::User, id)
    }

    /// Attach a display label
    #[inline]
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Entity kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Stable identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display label, if one was attached
    #[inline]
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl PartialEq for EntityRef {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.id == other.id
    }
}

impl Eq for EntityRef {}

impl Hash for EntityRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.id.hash(state);
    }
}

impl Display for EntityRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Declared kind of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Boolean toggle
    Bool,
    /// Millisecond count (`0` means forever)
    Millis,
    /// Nullable reference to an entity of the given kind
    Reference(EntityKind),
}

impl Display for FieldKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Millis => f.write_str("millis"),
            Self::Reference(kind) => write!(f, "{kind} reference"),
        }
    }
}

/// Value stored under a field key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldValue {
    /// Boolean toggle
    Bool(bool),
    /// Signed millisecond count; negative values are rejected by validation,
    /// not by construction
    Millis(i64),
    /// Nullable entity reference
    Ref(Option<EntityRef>),
}

impl FieldValue {
    /// Null reference value
    pub const NULL_REF: FieldValue = FieldValue::Ref(None);

    /// Whether this value fits the declared kind
    #[must_use]
    pub fn matches(&self, kind: FieldKind) -> bool {
        match (self, kind) {
            (Self::Bool(_), FieldKind::Bool) | (Self::Millis(_), FieldKind::Millis) => true,
            (Self::Ref(None), FieldKind::Reference(_)) => true,
            (Self::Ref(Some(entity)), FieldKind::Reference(expected)) => entity.kind == expected,
            _ => false,
        }
    }

    /// Boolean payload
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Millisecond payload
    #[inline]
    #[must_use]
    pub fn as_millis(&self) -> Option<i64> {
        match self {
            Self::Millis(ms) => Some(*ms),
            _ => None,
        }
    }

    /// Reference payload (`None` for non-reference values and for null)
    #[inline]
    #[must_use]
    pub fn as_ref_entity(&self) -> Option<&EntityRef> {
        match self {
            Self::Ref(entity) => entity.as_ref(),
            _ => None,
        }
    }

    /// Whether this is a null reference
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Ref(None))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Millis(value)
    }
}

impl From<EntityRef> for FieldValue {
    fn from(value: EntityRef) -> Self {
        Self::Ref(Some(value))
    }
}

impl From<Option<EntityRef>> for FieldValue {
    fn from(value: Option<EntityRef>) -> Self {
        Self::Ref(value)
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Millis(ms) => write!(f, "{ms}ms"),
            Self::Ref(Some(entity)) => write!(f, "{entity}"),
            Self::Ref(None) => f.write_str("null"),
        }
    }
}
