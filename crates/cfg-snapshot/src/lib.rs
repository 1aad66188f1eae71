//! Configuration snapshots
//!
//! Immutable, versioned configuration snapshots with structural diffing.
//!
//! # Core Concepts
//!
//! - [`ConfigDomain`]: An independently persisted configuration slice
//! - [`ConfigSnapshot`]: Immutable mapping from declared field key to [`FieldValue`]
//! - [`SnapshotVersion`]: Opaque server token used for optimistic concurrency
//! - [`SnapshotDiff`]: Field-level structural differences
//! - [`wire`]: JSON payloads crossing the persistence boundary
//!
//! # Example
//!
//! ```rust
//! use cfg_snapshot::{schema, ConfigDomain, ConfigSnapshot, FieldValue, SnapshotDiff};
//!
//! let committed = ConfigSnapshot::defaults(ConfigDomain::Retention);
//! let draft = committed
//!     .with_field(schema::READ_LOG_RETENTION, FieldValue::Millis(0))
//!     .unwrap();
//!
//! assert_eq!(SnapshotDiff::between(&committed, &draft).len(), 1);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod diff;
mod domain;
mod error;
mod snapshot;
mod value;
mod views;

/// Declared field schemas and well-known keys
pub mod schema;
/// JSON wire payloads
pub mod wire;

// Re-exports
pub use diff::{FieldChange, SnapshotDiff};
pub use domain::{ConfigDomain, UnknownDomain};
pub use error::SnapshotError;
pub use schema::{FieldDefault, FieldSpec};
pub use snapshot::{ConfigSnapshot, Fields, SnapshotVersion};
pub use value::{EntityKind, EntityRef, FieldKind, FieldValue};
pub use views::{OrganisationSettings, RbacSettings, RetentionSettings};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
