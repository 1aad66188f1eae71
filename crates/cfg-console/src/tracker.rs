//! Draft tracking
//!
//! [`DraftState`] pairs the last committed snapshot with the working draft.
//! Every transition is a pure function returning a new state; dirtiness is
//! recomputed by structural comparison each time, never tracked by hand.
//! [`DraftTracker`] owns the current state for one domain and loads it
//! through the gateway.

use crate::error::{ConsoleError, GatewayError, LoadError};
use crate::gateway::PersistenceGateway;
use crate::rebase::{RebaseStrategy, Resolution};
use cfg_snapshot::{ConfigDomain, ConfigSnapshot, FieldValue, SnapshotDiff, SnapshotError};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Committed snapshot, working draft and derived dirty flag
#[derive(Debug, Clone, PartialEq)]
pub struct DraftState {
    committed: ConfigSnapshot,
    draft: ConfigSnapshot,
    dirty: bool,
}

impl DraftState {
    /// Fresh state: the draft is a copy of the committed snapshot
    #[must_use]
    pub fn from_committed(committed: ConfigSnapshot) -> Self {
        Self {
            draft: committed.clone(),
            committed,
            dirty: false,
        }
    }

    /// Last known server truth
    #[inline]
    #[must_use]
    pub fn committed(&self) -> &ConfigSnapshot {
        &self.committed
    }

    /// Working copy
    #[inline]
    #[must_use]
    pub fn draft(&self) -> &ConfigSnapshot {
        &self.draft
    }

    /// Domain
    #[inline]
    #[must_use]
    pub fn domain(&self) -> ConfigDomain {
        self.committed.domain()
    }

    /// Whether any declared field differs from the committed snapshot
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Field-level differences, committed to draft
    #[must_use]
    pub fn changes(&self) -> SnapshotDiff {
        SnapshotDiff::between(&self.committed, &self.draft)
    }

    /// New state with one draft field replaced
    ///
    /// # Errors
    /// Returns error if `key` is not declared or `value` has the wrong kind
    pub fn with_field(&self, key: &str, value: FieldValue) -> Result<Self, SnapshotError> {
        let draft = self.draft.with_field(key, value)?;
        Ok(Self::compose(self.committed.clone(), draft))
    }

    /// New state with a whole replacement draft
    ///
    /// The draft keeps the committed version whatever `draft` carried.
    ///
    /// # Errors
    /// Returns error if `draft` belongs to another domain
    pub fn with_draft(&self, draft: &ConfigSnapshot) -> Result<Self, SnapshotError> {
        let draft = draft.rebased_onto(&self.committed)?;
        Ok(Self::compose(self.committed.clone(), draft))
    }

    /// Discard the draft; idempotent
    #[must_use]
    pub fn reset(&self) -> Self {
        Self::from_committed(self.committed.clone())
    }

    /// Move onto a freshly committed snapshot
    ///
    /// A draft still equal to `submitted` collapses onto `committed`. Edits
    /// made after `submitted` was taken survive on top of the new base.
    ///
    /// # Errors
    /// Returns error if `committed` belongs to another domain
    pub fn rebaseline(
        &self,
        submitted: &ConfigSnapshot,
        committed: ConfigSnapshot,
    ) -> Result<Self, SnapshotError> {
        if self.draft.same_fields(submitted) {
            if committed.domain() != self.domain() {
                return Err(SnapshotError::DomainMismatch {
                    expected: self.domain(),
                    actual: committed.domain(),
                });
            }
            return Ok(Self::from_committed(committed));
        }
        let draft = self.draft.rebased_onto(&committed)?;
        Ok(Self::compose(committed, draft))
    }

    /// Apply a conflict resolution
    ///
    /// Take-remote adopts the new base outright; keep-local keeps every
    /// draft value and only moves the base.
    ///
    /// # Errors
    /// Returns error if the resolution belongs to another domain
    pub fn resolve(&self, resolution: &Resolution) -> Result<Self, SnapshotError> {
        match resolution.strategy {
            RebaseStrategy::TakeRemote => {
                if resolution.base.domain() != self.domain() {
                    return Err(SnapshotError::DomainMismatch {
                        expected: self.domain(),
                        actual: resolution.base.domain(),
                    });
                }
                Ok(Self::from_committed(resolution.base.clone()))
            }
            RebaseStrategy::KeepLocal => {
                let draft = self.draft.rebased_onto(&resolution.base)?;
                Ok(Self::compose(resolution.base.clone(), draft))
            }
        }
    }

    fn compose(committed: ConfigSnapshot, draft: ConfigSnapshot) -> Self {
        let dirty = !draft.same_fields(&committed);
        Self {
            committed,
            draft,
            dirty,
        }
    }
}

/// Owner of one domain's draft state
///
/// Locks are held only for the swap of a state value, never across an
/// `.await`.
pub struct DraftTracker {
    domain: ConfigDomain,
    gateway: Arc<dyn PersistenceGateway>,
    state: Mutex<Option<DraftState>>,
}

impl DraftTracker {
    /// Create new tracker; nothing is loaded yet
    #[must_use]
    pub fn new(domain: ConfigDomain, gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self {
            domain,
            gateway,
            state: Mutex::new(None),
        }
    }

    /// Domain
    #[inline]
    #[must_use]
    pub fn domain(&self) -> ConfigDomain {
        self.domain
    }

    /// Fetch the committed snapshot and start a clean draft from it
    ///
    /// # Errors
    /// Returns [`LoadError`] if the gateway fails; any previously loaded
    /// state is kept
    pub async fn load(&self) -> Result<DraftState, LoadError> {
        let committed = self.fetch_committed().await?;
        let state = DraftState::from_committed(committed);
        *self.state.lock() = Some(state.clone());
        Ok(state)
    }

    /// Fetch the committed snapshot without touching the tracked state
    ///
    /// A domain with nothing stored yet yields its defaults.
    ///
    /// # Errors
    /// Returns [`LoadError`] on transport or decoding failure
    pub async fn fetch_committed(&self) -> Result<ConfigSnapshot, LoadError> {
        match self.gateway.fetch(self.domain).await {
            Ok(snapshot) if snapshot.domain() == self.domain => Ok(snapshot),
            Ok(snapshot) => Err(LoadError::new(
                self.domain,
                format!("gateway returned a {} snapshot", snapshot.domain()),
            )),
            Err(GatewayError::NotFound { .. }) => {
                tracing::info!(domain = %self.domain, "nothing stored yet, using defaults");
                Ok(ConfigSnapshot::defaults(self.domain))
            }
            Err(err) => {
                tracing::warn!(domain = %self.domain, error = %err, "fetch failed");
                Err(LoadError::from_gateway(self.domain, &err))
            }
        }
    }

    /// Install a freshly fetched committed snapshot
    ///
    /// Unless `discard_unsaved` is set, a dirty draft is left alone and
    /// [`ConsoleError::UnsavedChanges`] is returned.
    ///
    /// # Errors
    /// Returns error if unsaved edits would be lost
    pub fn replace_committed(
        &self,
        committed: ConfigSnapshot,
        discard_unsaved: bool,
    ) -> Result<DraftState, ConsoleError> {
        let mut slot = self.state.lock();
        if !discard_unsaved && slot.as_ref().is_some_and(DraftState::is_dirty) {
            return Err(ConsoleError::UnsavedChanges {
                domain: self.domain,
            });
        }
        let state = DraftState::from_committed(committed);
        *slot = Some(state.clone());
        Ok(state)
    }

    /// Current state, if loaded
    #[must_use]
    pub fn current(&self) -> Option<DraftState> {
        self.state.lock().clone()
    }

    /// Whether the loaded draft has unsaved edits
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.state.lock().as_ref().is_some_and(DraftState::is_dirty)
    }

    /// Replace one draft field
    ///
    /// # Errors
    /// Returns error if nothing is loaded or the edit does not fit the schema
    pub fn set_field(&self, key: &str, value: FieldValue) -> Result<DraftState, ConsoleError> {
        self.update(|state| state.with_field(key, value))
    }

    /// Discard the draft
    ///
    /// # Errors
    /// Returns error if nothing is loaded
    pub fn reset(&self) -> Result<DraftState, ConsoleError> {
        self.update(|state| Ok(state.reset()))
    }

    /// Re-baseline after a successful commit
    ///
    /// # Errors
    /// Returns error if nothing is loaded or `committed` is for another domain
    pub fn rebaseline(
        &self,
        submitted: &ConfigSnapshot,
        committed: ConfigSnapshot,
    ) -> Result<DraftState, ConsoleError> {
        self.update(|state| state.rebaseline(submitted, committed))
    }

    /// Apply a conflict resolution to the current state
    ///
    /// # Errors
    /// Returns error if nothing is loaded
    pub fn resolve(&self, resolution: &Resolution) -> Result<DraftState, ConsoleError> {
        self.update(|state| state.resolve(resolution))
    }

    /// Install an already resolved state
    pub fn adopt(&self, state: DraftState) {
        *self.state.lock() = Some(state);
    }

    /// Apply a pure transition to the loaded state
    ///
    /// # Errors
    /// Returns error if nothing is loaded or the transition fails
    pub fn update<F>(&self, transition: F) -> Result<DraftState, ConsoleError>
    where
        F: FnOnce(&DraftState) -> Result<DraftState, SnapshotError>,
    {
        let mut slot = self.state.lock();
        let current = slot.as_ref().ok_or(ConsoleError::NotLoaded {
            domain: self.domain,
        })?;
        let next = transition(current)?;
        *slot = Some(next.clone());
        Ok(next)
    }

    /// Drop the tracked state, returning it
    pub fn discard(&self) -> Option<DraftState> {
        self.state.lock().take()
    }
}

impl fmt::Debug for DraftTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DraftTracker")
            .field("domain", &self.domain)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}
