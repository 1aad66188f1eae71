//! Configuration console
//!
//! Tracks a server-committed snapshot alongside a locally edited draft for
//! each configuration domain, persists drafts with compare-and-swap, and
//! resolves concurrent edits through an explicit rebase.
//!
//! # Core Concepts
//!
//! - [`PersistenceGateway`]: Async boundary to the backend (injected)
//! - [`DraftTracker`] / [`DraftState`]: Committed snapshot, draft, dirty flag
//! - [`RebaseCoordinator`]: Save gate and conflict resolution
//! - [`ConfigurationConsole`]: Per-domain composition root
//! - [`ConsoleError`]: Error taxonomy recorded in [`ConsoleStatus`]
//!
//! # Lifecycle
//!
//! ```text
//! load ──► edit ──► save ──► Clean
//!                    │
//!                    └─► Conflicted ──► rebase(keep-local | take-remote) ──► Clean
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod config;
mod console;
mod error;
mod gateway;
mod rebase;
mod status;
mod tracker;

// Re-exports
pub use config::{ConfigError, ConsoleConfig, DEFAULT_LOG_FILTER, DEFAULT_SUCCESS_WINDOW};
pub use console::ConfigurationConsole;
pub use error::{ConflictError, ConsoleError, GatewayError, LoadError, PersistError};
pub use gateway::{PersistenceGateway, Statistics};
pub use rebase::{
    ConflictReport, RebaseCoordinator, RebasePhase, RebaseStrategy, Resolution, SaveTicket,
};
pub use status::ConsoleStatus;
pub use tracker::{DraftState, DraftTracker};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
