//! JSON file store
//!
//! One document holds every domain as a flat wire payload plus optional
//! counters:
//!
//! ```json
//! {
//!   "domains": { "rbac": { "version": "01J…", "enabled": true } },
//!   "statistics": { "organisation": { "organisations": 3 } }
//! }
//! ```
//!
//! Writes replace the whole file atomically; a process-local lock makes the
//! version check and the write a single step.

use async_trait::async_trait;
use cfg_console::{GatewayError, PersistenceGateway, Statistics};
use cfg_snapshot::wire::SnapshotPayload;
use cfg_snapshot::{ConfigDomain, ConfigSnapshot, Fields, SnapshotVersion};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    domains: BTreeMap<ConfigDomain, SnapshotPayload>,
    #[serde(default)]
    statistics: BTreeMap<ConfigDomain, BTreeMap<String, u64>>,
}

/// [`PersistenceGateway`] backed by a JSON file
#[derive(Debug)]
pub struct FileGateway {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileGateway {
    /// Gateway over `path`; the file is created on first commit
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<StoreDocument, GatewayError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) if text.trim().is_empty() => Ok(StoreDocument::default()),
            Ok(text) => serde_json::from_str(&text).map_err(|err| {
                GatewayError::Malformed(format!("{}: {err}", self.path.display()))
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(StoreDocument::default()),
            Err(err) => Err(GatewayError::Unreachable(format!(
                "cannot read {}: {err}",
                self.path.display()
            ))),
        }
    }

    async fn write(&self, document: &StoreDocument) -> Result<(), GatewayError> {
        let text = serde_json::to_string_pretty(document)
            .map_err(|err| GatewayError::Malformed(err.to_string()))?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || replace_file(&path, text.as_bytes()))
            .await
            .map_err(|err| GatewayError::Unreachable(err.to_string()))?
            .map_err(|err| {
                GatewayError::Unreachable(format!("cannot write {}: {err}", self.path.display()))
            })
    }
}

fn replace_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[async_trait]
impl PersistenceGateway for FileGateway {
    async fn fetch(&self, domain: ConfigDomain) -> Result<ConfigSnapshot, GatewayError> {
        let mut document = self.read().await?;
        let payload = document
            .domains
            .remove(&domain)
            .ok_or(GatewayError::NotFound { domain })?;
        Ok(payload.into_snapshot(domain)?)
    }

    async fn commit(
        &self,
        domain: ConfigDomain,
        fields: Fields,
        expected_version: Option<SnapshotVersion>,
    ) -> Result<ConfigSnapshot, GatewayError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read().await?;

        let current = match document.domains.get(&domain) {
            Some(payload) => Some(payload.clone().into_snapshot(domain)?),
            None => None,
        };
        let current_version = current.as_ref().and_then(ConfigSnapshot::version);
        if current_version != expected_version.as_ref() {
            return Err(GatewayError::Conflict {
                current: current.unwrap_or_else(|| ConfigSnapshot::defaults(domain)),
            });
        }

        let version = SnapshotVersion::new(ulid::Ulid::new().to_string());
        let committed = ConfigSnapshot::committed(domain, version, fields)?;
        document
            .domains
            .insert(domain, SnapshotPayload::from_snapshot(&committed));
        self.write(&document).await?;

        tracing::debug!(
            %domain,
            version = ?committed.version().map(SnapshotVersion::as_str),
            path = %self.path.display(),
            "committed to file store"
        );
        Ok(committed)
    }

    async fn fetch_statistics(&self, domain: ConfigDomain) -> Result<Statistics, GatewayError> {
        let document = self.read().await?;
        let counters = document.statistics.get(&domain).cloned().unwrap_or_default();
        Ok(counters
            .into_iter()
            .fold(Statistics::new(domain), |stats, (name, value)| {
                stats.with_counter(name, value)
            }))
    }
}
