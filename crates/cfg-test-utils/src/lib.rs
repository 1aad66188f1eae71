//! Testing utilities for the configuration console workspace
//!
//! An in-memory [`PersistenceGateway`] with failure injection and a commit
//! gate, plus snapshot and option fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use cfg_console::{GatewayError, PersistenceGateway, Statistics};
use cfg_rules::{EntityOption, EntityOptions};
use cfg_snapshot::{ConfigDomain, ConfigSnapshot, FieldValue, Fields, SnapshotVersion};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Fresh opaque version token
pub fn next_version() -> SnapshotVersion {
    SnapshotVersion::new(ulid::Ulid::new().to_string())
}

#[derive(Debug, Default)]
struct Failures {
    fetch: Option<GatewayError>,
    commit: Option<GatewayError>,
    statistics: Option<GatewayError>,
}

/// Compare-and-swap store kept in memory
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    store: DashMap<ConfigDomain, ConfigSnapshot>,
    statistics: DashMap<ConfigDomain, Statistics>,
    failures: Mutex<Failures>,
    statistics_delay: Mutex<Duration>,
    commit_gate: Mutex<Option<Arc<Notify>>>,
    commit_entered: Notify,
    fetches: AtomicUsize,
    commits: AtomicUsize,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Store a committed snapshot built from `fields` (defaults elsewhere)
    pub fn seed(&self, domain: ConfigDomain, fields: Fields) -> ConfigSnapshot {
        let snapshot = ConfigSnapshot::committed(domain, next_version(), fields).unwrap();
        self.store.insert(domain, snapshot.clone());
        snapshot
    }

    pub fn seed_statistics(&self, statistics: Statistics) {
        self.statistics.insert(statistics.domain, statistics);
    }

    /// Another client commits one field behind the console's back
    pub fn bump_remote(&self, domain: ConfigDomain, key: &str, value: FieldValue) -> ConfigSnapshot {
        let current = self
            .stored(domain)
            .unwrap_or_else(|| ConfigSnapshot::defaults(domain));
        let fields = current.with_field(key, value).unwrap().fields().clone();
        self.seed(domain, fields)
    }

    pub fn stored(&self, domain: ConfigDomain) -> Option<ConfigSnapshot> {
        self.store.get(&domain).map(|entry| entry.value().clone())
    }

    pub fn fail_fetch(&self, err: GatewayError) {
        self.failures.lock().fetch = Some(err);
    }

    pub fn fail_commit(&self, err: GatewayError) {
        self.failures.lock().commit = Some(err);
    }

    pub fn fail_statistics(&self, err: GatewayError) {
        self.failures.lock().statistics = Some(err);
    }

    pub fn clear_failures(&self) {
        *self.failures.lock() = Failures::default();
    }

    /// Delay every statistics response
    pub fn delay_statistics(&self, delay: Duration) {
        *self.statistics_delay.lock() = delay;
    }

    /// Hold commits until the returned gate is notified
    pub fn hold_commits(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.commit_gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    /// Wait until a commit reaches the gateway
    pub async fn commit_entered(&self) {
        self.commit_entered.notified().await;
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryGateway {
    async fn fetch(&self, domain: ConfigDomain) -> Result<ConfigSnapshot, GatewayError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failures.lock().fetch.clone() {
            return Err(err);
        }
        self.stored(domain).ok_or(GatewayError::NotFound { domain })
    }

    async fn commit(
        &self,
        domain: ConfigDomain,
        fields: Fields,
        expected_version: Option<SnapshotVersion>,
    ) -> Result<ConfigSnapshot, GatewayError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        self.commit_entered.notify_one();

        let gate = self.commit_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(err) = self.failures.lock().commit.clone() {
            return Err(err);
        }

        let snapshot = ConfigSnapshot::committed(domain, next_version(), fields)?;
        match self.store.entry(domain) {
            Entry::Occupied(mut entry) => {
                if entry.get().version() != expected_version.as_ref() {
                    return Err(GatewayError::Conflict {
                        current: entry.get().clone(),
                    });
                }
                entry.insert(snapshot.clone());
            }
            Entry::Vacant(entry) => {
                if expected_version.is_some() {
                    return Err(GatewayError::Conflict {
                        current: ConfigSnapshot::defaults(domain),
                    });
                }
                entry.insert(snapshot.clone());
            }
        }
        Ok(snapshot)
    }

    async fn fetch_statistics(&self, domain: ConfigDomain) -> Result<Statistics, GatewayError> {
        let delay = *self.statistics_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.failures.lock().statistics.clone() {
            return Err(err);
        }
        Ok(self
            .statistics
            .get(&domain)
            .map_or_else(|| Statistics::new(domain), |entry| entry.value().clone()))
    }
}

/// Fields from key/value pairs; everything else takes its default
pub fn fields(domain: ConfigDomain, pairs: &[(&str, FieldValue)]) -> Fields {
    let mut snapshot = ConfigSnapshot::defaults(domain);
    for (key, value) in pairs {
        snapshot = snapshot.with_field(key, value.clone()).unwrap();
    }
    snapshot.fields().clone()
}

pub fn unreachable() -> GatewayError {
    GatewayError::Unreachable("connection refused".to_string())
}

/// Organisations, groups and users as a console caller would list them
pub fn entity_options() -> EntityOptions {
    EntityOptions {
        organisations: vec![
            EntityOption::new("org-main", "Main Organisation").with_members(42),
            EntityOption::new("org-lab", "Research Lab").with_members(1),
        ],
        groups: vec![
            EntityOption::new("public", "Public"),
            EntityOption::new("viewer", "Viewers"),
            EntityOption::new("editor", "Editors"),
        ],
        users: vec![EntityOption::new("admin", "Administrator")],
    }
}
