//! Persistence boundary
//!
//! The console never talks to a backend directly. It is handed an
//! `Arc<dyn PersistenceGateway>` and only sees snapshots, statistics and
//! [`GatewayError`]s.

use crate::error::GatewayError;
use async_trait::async_trait;
use cfg_snapshot::{ConfigDomain, ConfigSnapshot, Fields, SnapshotVersion};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Async read/write boundary to the configuration backend
///
/// # Contract
/// - `fetch` returns [`GatewayError::NotFound`] when nothing is stored yet
/// - `commit` is an atomic compare-and-swap: it applies every field or none,
///   and only when the stored version equals `expected_version`
///   (`None` matches "nothing stored yet"); otherwise it fails with
///   [`GatewayError::Conflict`] carrying the current snapshot
/// - every committed snapshot carries a fresh version
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Current committed snapshot of a domain
    async fn fetch(&self, domain: ConfigDomain) -> Result<ConfigSnapshot, GatewayError>;

    /// Commit draft fields against an expected version
    async fn commit(
        &self,
        domain: ConfigDomain,
        fields: Fields,
        expected_version: Option<SnapshotVersion>,
    ) -> Result<ConfigSnapshot, GatewayError>;

    /// Read-only aggregate counters for a domain
    async fn fetch_statistics(&self, domain: ConfigDomain) -> Result<Statistics, GatewayError>;
}

/// Aggregate counters reported alongside a domain
///
/// Opaque to the console: it stores and exposes them, nothing more.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    /// Domain the counters belong to
    pub domain: ConfigDomain,
    /// Named counters
    pub counters: BTreeMap<String, u64>,
    /// When the counters were read
    pub fetched_at: DateTime<Utc>,
}

impl Statistics {
    /// Create empty statistics stamped now
    #[inline]
    #[must_use]
    pub fn new(domain: ConfigDomain) -> Self {
        Self {
            domain,
            counters: BTreeMap::new(),
            fetched_at: Utc::now(),
        }
    }

    /// Add a counter
    #[must_use]
    pub fn with_counter(mut self, name: impl Into<String>, value: u64) -> Self {
        self.counters.insert(name.into(), value);
        self
    }

    /// Value of one counter
    #[inline]
    #[must_use]
    pub fn counter(&self, name: &str) -> Option<u64> {
        self.counters.get(name).copied()
    }
}
