//! Optimistic-concurrency save and conflict resolution
//!
//! [`RebaseCoordinator`] walks each domain through
//! `Clean → Saving → {Committed | Conflicted} → Clean`. Only one commit may
//! be in flight per domain; a conflicted domain must be rebased (or
//! abandoned by a refresh) before it can save again. Resolution is
//! whole-snapshot: no field-level merge is attempted.

use crate::error::{ConflictError, ConsoleError, GatewayError, LoadError, PersistError};
use crate::gateway::PersistenceGateway;
use crate::tracker::DraftState;
use cfg_snapshot::{ConfigDomain, ConfigSnapshot, SnapshotDiff, SnapshotVersion};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Save lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RebasePhase {
    /// Nothing in flight
    #[default]
    Clean,
    /// A commit is in flight
    Saving,
    /// Commit accepted, re-baselining
    Committed,
    /// Commit refused on version; awaiting a rebase
    Conflicted,
}

impl RebasePhase {
    /// Phases reachable from `self`
    #[must_use]
    pub fn allowed_transitions(self) -> &'static [RebasePhase] {
        use RebasePhase::{Clean, Committed, Conflicted, Saving};
        match self {
            Clean => &[Saving],
            Saving => &[Committed, Conflicted, Clean],
            Committed => &[Clean],
            // keep-local may surface a fresh conflict
            Conflicted => &[Conflicted, Clean],
        }
    }

    /// Check a single transition
    #[inline]
    #[must_use]
    pub fn can_transition_to(self, to: RebasePhase) -> bool {
        self.allowed_transitions().contains(&to)
    }
}

impl fmt::Display for RebasePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Clean => "clean",
            Self::Saving => "saving",
            Self::Committed => "committed",
            Self::Conflicted => "conflicted",
        };
        f.write_str(name)
    }
}

/// How to resolve a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RebaseStrategy {
    /// Keep draft values on top of the server's snapshot, pending a fresh save
    KeepLocal,
    /// Discard the draft and adopt the server's snapshot
    TakeRemote,
}

/// Accepted resolution: the new base and what to do with the draft
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Chosen strategy
    pub strategy: RebaseStrategy,
    /// Server snapshot to rebase onto
    pub base: ConfigSnapshot,
}

/// Everything a caller needs to resolve a conflict
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictReport {
    /// Draft at the time of the conflict
    pub local_draft: ConfigSnapshot,
    /// Committed snapshot the draft was based on
    pub base: ConfigSnapshot,
    /// Server's current snapshot
    pub remote: ConfigSnapshot,
    /// Local edits, base to draft
    pub against_base: SnapshotDiff,
    /// Differences between the server and the draft
    pub against_remote: SnapshotDiff,
    /// When the conflict was detected
    pub detected_at: DateTime<Utc>,
}

impl ConflictReport {
    /// Build a report for `state` against the server's `remote`
    #[must_use]
    pub fn new(state: &DraftState, remote: ConfigSnapshot) -> Self {
        Self {
            local_draft: state.draft().clone(),
            base: state.committed().clone(),
            against_base: SnapshotDiff::between(state.committed(), state.draft()),
            against_remote: SnapshotDiff::between(&remote, state.draft()),
            remote,
            detected_at: Utc::now(),
        }
    }

    /// Server version at detection
    #[inline]
    #[must_use]
    pub fn remote_version(&self) -> Option<&SnapshotVersion> {
        self.remote.version()
    }

    /// What the server changed since the base
    #[must_use]
    pub fn remote_changes(&self) -> SnapshotDiff {
        SnapshotDiff::between(&self.base, &self.remote)
    }

    /// Fields both sides changed
    #[must_use]
    pub fn overlapping_keys(&self) -> Vec<&'static str> {
        let remote = self.remote_changes();
        self.against_base
            .keys()
            .filter(|key| remote.touches(key))
            .collect()
    }
}

#[derive(Debug, Default)]
struct CoordinatorState {
    phase: RebasePhase,
    conflict: Option<ConflictReport>,
}

/// Save gate and conflict resolver for one domain
pub struct RebaseCoordinator {
    domain: ConfigDomain,
    gateway: Arc<dyn PersistenceGateway>,
    state: Mutex<CoordinatorState>,
}

impl RebaseCoordinator {
    /// Create new coordinator
    #[must_use]
    pub fn new(domain: ConfigDomain, gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self {
            domain,
            gateway,
            state: Mutex::new(CoordinatorState::default()),
        }
    }

    /// Current phase
    #[inline]
    #[must_use]
    pub fn phase(&self) -> RebasePhase {
        self.state.lock().phase
    }

    /// Pending conflict, if any
    #[must_use]
    pub fn conflict(&self) -> Option<ConflictReport> {
        self.state.lock().conflict.clone()
    }

    /// Enter `Saving`
    ///
    /// The returned ticket must be passed to [`commit`](Self::commit).
    /// Dropping it unused returns the coordinator to `Clean`.
    ///
    /// # Errors
    /// - [`ConsoleError::SaveInProgress`] if a commit is already in flight
    /// - [`ConsoleError::ConflictPending`] if a conflict awaits a rebase
    pub fn begin_save(&self) -> Result<SaveTicket<'_>, ConsoleError> {
        let mut state = self.state.lock();
        match state.phase {
            RebasePhase::Saving => Err(ConsoleError::SaveInProgress {
                domain: self.domain,
            }),
            RebasePhase::Conflicted => Err(ConsoleError::ConflictPending {
                domain: self.domain,
            }),
            // a lingering Committed means the previous save already re-baselined
            RebasePhase::Committed | RebasePhase::Clean => {
                state.phase = RebasePhase::Saving;
                tracing::debug!(domain = %self.domain, "save started");
                Ok(SaveTicket {
                    coordinator: self,
                    armed: true,
                })
            }
        }
    }

    /// Commit the draft against its base version
    ///
    /// The commit is awaited to completion; it is never cancelled once sent.
    ///
    /// # Errors
    /// - [`ConsoleError::Conflict`] if the server moved; the coordinator is
    ///   left `Conflicted` with a report
    /// - [`ConsoleError::Persist`] for any other gateway failure
    pub async fn commit(
        &self,
        mut ticket: SaveTicket<'_>,
        state: &DraftState,
    ) -> Result<ConfigSnapshot, ConsoleError> {
        let expected = state.committed().version().cloned();
        tracing::info!(
            domain = %self.domain,
            expected = ?expected.as_ref().map(SnapshotVersion::as_str),
            changes = state.changes().len(),
            "committing draft"
        );

        let outcome = self
            .gateway
            .commit(self.domain, state.draft().fields().clone(), expected)
            .await;
        ticket.armed = false;

        match outcome {
            Ok(committed) => {
                self.enter(RebasePhase::Committed, None);
                tracing::info!(
                    domain = %self.domain,
                    version = ?committed.version().map(SnapshotVersion::as_str),
                    "draft committed"
                );
                Ok(committed)
            }
            Err(GatewayError::Conflict { current }) => {
                let report = ConflictReport::new(state, current);
                tracing::warn!(
                    domain = %self.domain,
                    remote = ?report.remote_version().map(SnapshotVersion::as_str),
                    overlapping = ?report.overlapping_keys(),
                    "commit conflicted"
                );
                self.enter(RebasePhase::Conflicted, Some(report.clone()));
                Err(ConflictError::new(report).into())
            }
            Err(err) => {
                tracing::error!(domain = %self.domain, error = %err, "commit failed");
                self.enter(RebasePhase::Clean, None);
                Err(PersistError::from_gateway(self.domain, &err).into())
            }
        }
    }

    /// Gate and commit in one step
    ///
    /// # Errors
    /// See [`begin_save`](Self::begin_save) and [`commit`](Self::commit)
    pub async fn save(&self, state: &DraftState) -> Result<ConfigSnapshot, ConsoleError> {
        let ticket = self.begin_save()?;
        self.commit(ticket, state).await
    }

    /// Leave `Committed` once the draft has been re-baselined
    pub fn settle(&self) {
        let mut state = self.state.lock();
        if state.phase == RebasePhase::Committed {
            state.phase = RebasePhase::Clean;
        }
    }

    /// Resolve the pending conflict
    ///
    /// Take-remote adopts the reported server snapshot without a round trip.
    /// Keep-local fetches the server snapshot again: if it moved since the
    /// report, a fresh conflict is surfaced and the coordinator stays
    /// `Conflicted`; otherwise the draft is kept on top of it.
    ///
    /// # Errors
    /// - [`ConsoleError::NoConflict`] if nothing is pending
    /// - [`ConsoleError::Conflict`] if the server moved again
    /// - [`ConsoleError::Load`] if the re-fetch fails (conflict stays pending)
    pub async fn rebase(
        &self,
        state: &DraftState,
        strategy: RebaseStrategy,
    ) -> Result<Resolution, ConsoleError> {
        let report = self.conflict().ok_or(ConsoleError::NoConflict {
            domain: self.domain,
        })?;

        let base = match strategy {
            RebaseStrategy::TakeRemote => report.remote.clone(),
            RebaseStrategy::KeepLocal => {
                let latest = self.fetch_latest().await?;
                if latest.version() != report.remote_version() {
                    let fresh = ConflictReport::new(state, latest);
                    tracing::warn!(
                        domain = %self.domain,
                        remote = ?fresh.remote_version().map(SnapshotVersion::as_str),
                        "server moved again during rebase"
                    );
                    self.replace_conflict(&report, fresh.clone())?;
                    return Err(ConflictError::new(fresh).into());
                }
                latest
            }
        };

        self.clear_conflict(&report)?;
        tracing::info!(domain = %self.domain, ?strategy, "conflict resolved");
        Ok(Resolution { strategy, base })
    }

    /// Drop a pending conflict without resolving it
    pub fn abandon(&self) -> Option<ConflictReport> {
        let mut state = self.state.lock();
        if state.phase != RebasePhase::Conflicted {
            return None;
        }
        state.phase = RebasePhase::Clean;
        state.conflict.take()
    }

    async fn fetch_latest(&self) -> Result<ConfigSnapshot, ConsoleError> {
        match self.gateway.fetch(self.domain).await {
            Ok(snapshot) => Ok(snapshot),
            Err(GatewayError::NotFound { .. }) => Ok(ConfigSnapshot::defaults(self.domain)),
            Err(err) => Err(LoadError::from_gateway(self.domain, &err).into()),
        }
    }

    fn enter(&self, to: RebasePhase, conflict: Option<ConflictReport>) {
        let mut state = self.state.lock();
        debug_assert!(
            state.phase.can_transition_to(to),
            "illegal phase transition {} -> {to}",
            state.phase
        );
        tracing::debug!(domain = %self.domain, from = %state.phase, %to, "phase transition");
        state.phase = to;
        state.conflict = conflict;
    }

    /// Swap the pending report, unless another caller resolved it meanwhile
    fn replace_conflict(
        &self,
        expected: &ConflictReport,
        fresh: ConflictReport,
    ) -> Result<(), ConsoleError> {
        let mut state = self.state.lock();
        if state.conflict.as_ref() != Some(expected) {
            return Err(ConsoleError::NoConflict {
                domain: self.domain,
            });
        }
        state.conflict = Some(fresh);
        Ok(())
    }

    fn clear_conflict(&self, expected: &ConflictReport) -> Result<(), ConsoleError> {
        let mut state = self.state.lock();
        if state.conflict.as_ref() != Some(expected) {
            return Err(ConsoleError::NoConflict {
                domain: self.domain,
            });
        }
        state.phase = RebasePhase::Clean;
        state.conflict = None;
        Ok(())
    }
}

impl fmt::Debug for RebaseCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RebaseCoordinator")
            .field("domain", &self.domain)
            .field("phase", &state.phase)
            .field("conflict", &state.conflict.is_some())
            .finish_non_exhaustive()
    }
}

/// Proof that the coordinator is in `Saving`
///
/// Dropping an unused ticket (or a commit future before the gateway
/// answered) returns the coordinator to `Clean`.
#[must_use = "a save ticket releases the save gate when dropped"]
pub struct SaveTicket<'a> {
    coordinator: &'a RebaseCoordinator,
    armed: bool,
}

impl fmt::Debug for SaveTicket<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveTicket")
            .field("domain", &self.coordinator.domain)
            .field("armed", &self.armed)
            .finish()
    }
}

impl Drop for SaveTicket<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.coordinator.state.lock();
            if state.phase == RebasePhase::Saving {
                state.phase = RebasePhase::Clean;
            }
        }
    }
}
