//! JSON wire payloads crossing the persistence boundary
//!
//! Snapshots travel as flat camelCase objects:
//! `{ "<field>": <value>, ..., "version": "<token>" }`. Commits carry
//! `expectedVersion` instead of `version`. Reference fields are encoded as
//! their identifier (or `null`).

use crate::domain::ConfigDomain;
use crate::error::SnapshotError;
use crate::snapshot::{ConfigSnapshot, Fields, SnapshotVersion};
use crate::value::{EntityRef, FieldKind, FieldValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Committed snapshot as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotPayload {
    /// Server version token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Field values keyed by wire name
    #[serde(flatten)]
    pub fields: Map<String, JsonValue>,
}

impl SnapshotPayload {
    /// Encode a snapshot
    #[must_use]
    pub fn from_snapshot(snapshot: &ConfigSnapshot) -> Self {
        Self {
            version: snapshot.version().map(|v| v.as_str().to_string()),
            fields: encode_fields(snapshot.fields()),
        }
    }

    /// Decode into a committed snapshot of `domain`
    ///
    /// # Errors
    /// Returns `SnapshotError::Malformed` if the version is missing or a field
    /// value cannot be decoded
    pub fn into_snapshot(self, domain: ConfigDomain) -> Result<ConfigSnapshot, SnapshotError> {
        let version = self.version.ok_or_else(|| SnapshotError::Malformed {
            domain,
            reason: "missing version".to_string(),
        })?;
        let fields = decode_fields(domain, &self.fields)?;
        ConfigSnapshot::committed(domain, SnapshotVersion::new(version), fields)
    }
}

/// Draft submitted for commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitPayload {
    /// Version the draft was based on (`None` when no row exists yet)
    #[serde(default)]
    pub expected_version: Option<String>,

    /// Field values keyed by wire name
    #[serde(flatten)]
    pub fields: Map<String, JsonValue>,
}

impl CommitPayload {
    /// Encode a commit request
    #[must_use]
    pub fn new(fields: &Fields, expected_version: Option<&SnapshotVersion>) -> Self {
        Self {
            expected_version: expected_version.map(|v| v.as_str().to_string()),
            fields: encode_fields(fields),
        }
    }

    /// Decode the submitted fields and expected version
    ///
    /// # Errors
    /// Returns error if a field value cannot be decoded
    pub fn decode(
        &self,
        domain: ConfigDomain,
    ) -> Result<(Fields, Option<SnapshotVersion>), SnapshotError> {
        let fields = decode_fields(domain, &self.fields)?;
        Ok((fields, self.expected_version.clone().map(SnapshotVersion::new)))
    }
}

/// Conflict response: the server's current snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictPayload {
    /// Current committed snapshot
    pub current: SnapshotPayload,
}

/// Encode fields as a JSON object
#[must_use]
pub fn encode_fields(fields: &Fields) -> Map<String, JsonValue> {
    fields
        .iter()
        .map(|(key, value)| ((*key).to_string(), encode_value(value)))
        .collect()
}

fn encode_value(value: &FieldValue) -> JsonValue {
    match value {
        FieldValue::Bool(b) => JsonValue::Bool(*b),
        FieldValue::Millis(ms) => JsonValue::from(*ms),
        FieldValue::Ref(Some(entity)) => JsonValue::String(entity.id().to_string()),
        FieldValue::Ref(None) => JsonValue::Null,
    }
}

/// Decode a JSON object into declared fields
///
/// Unknown keys are ignored so newer servers can add fields.
///
/// # Errors
/// Returns `SnapshotError::Malformed` if a declared field has an undecodable value
pub fn decode_fields(
    domain: ConfigDomain,
    object: &Map<String, JsonValue>,
) -> Result<Fields, SnapshotError> {
    let mut fields = Fields::new();
    for spec in domain.fields() {
        let Some(raw) = object.get(spec.key) else {
            continue;
        };
        let value = decode_value(spec.kind, raw).ok_or_else(|| SnapshotError::Malformed {
            domain,
            reason: format!("{} cannot hold {raw} as {}", spec.key, spec.kind),
        })?;
        fields.insert(spec.key, value);
    }
    Ok(fields)
}

fn decode_value(kind: FieldKind, raw: &JsonValue) -> Option<FieldValue> {
    match (kind, raw) {
        (FieldKind::Bool, JsonValue::Bool(b)) => Some(FieldValue::Bool(*b)),
        (FieldKind::Millis, JsonValue::Number(n)) => n.as_i64().map(FieldValue::Millis),
        // Some backends store durations as numeric strings
        (FieldKind::Millis, JsonValue::String(s)) => s.trim().parse().ok().map(FieldValue::Millis),
        (FieldKind::Reference(_), JsonValue::Null) => Some(FieldValue::NULL_REF),
        (FieldKind::Reference(_), JsonValue::String(id)) if id.is_empty() => {
            Some(FieldValue::NULL_REF)
        }
        (FieldKind::Reference(entity_kind), JsonValue::String(id)) => {
            Some(FieldValue::Ref(Some(EntityRef::new(entity_kind, id.clone()))))
        }
        _ => None,
    }
}
