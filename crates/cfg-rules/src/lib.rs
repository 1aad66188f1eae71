//! Configuration transition rules
//!
//! Pure, per-domain validation and display derivation for configuration
//! drafts.
//!
//! # Core Concepts
//!
//! - [`TransitionRules`]: Core trait, one implementation per domain
//! - [`RetentionRules`]: Millisecond durations, "Forever" rendering, sign checks
//! - [`OrganisationRules`]: Default organisation label and membership display
//! - [`RbacRules`]: Required groups while enabled, well-known group defaults
//! - [`RuleSet`]: Registry mapping domains to their rules
//!
//! # Example
//!
//! ```rust
//! use cfg_rules::{RuleSet, TransitionRules};
//! use cfg_snapshot::{ConfigDomain, ConfigSnapshot};
//!
//! let rules = RuleSet::standard();
//! let retention = rules.get(ConfigDomain::Retention).unwrap();
//! let draft = ConfigSnapshot::defaults(ConfigDomain::Retention);
//!
//! assert!(retention.validate(&draft).is_ok());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod options;
mod organisation;
mod rbac;
mod registry;
mod retention;
mod rules;

// Re-exports
pub use error::{FieldIssue, IssueKind, ValidationError};
pub use options::{EntityOption, EntityOptions};
pub use organisation::{
    OrganisationRules, DEFAULT_ORGANISATION_LABEL, DEFAULT_ORGANISATION_MEMBERS,
    NO_DEFAULT_ORGANISATION,
};
pub use rbac::{RbacRules, GROUP_NOT_SET, OBJECT_CREATOR};
pub use registry::{standard_rules, RuleSet};
pub use retention::{
    humanize_millis, NegativeDuration, RetentionPeriod, RetentionRules, DAYS_PER_MONTH,
    DAYS_PER_YEAR, FOREVER,
};
pub use rules::{display_text, DisplayField, TransitionRules};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
