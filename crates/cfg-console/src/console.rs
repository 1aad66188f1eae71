//! Per-domain configuration console
//!
//! Composition root: one [`ConfigurationConsole`] per domain, built with an
//! injected gateway. It loads snapshot and statistics concurrently, gates
//! saves through domain rules and the rebase coordinator, and keeps a
//! status record callers can poll.

use crate::config::ConsoleConfig;
use crate::error::ConsoleError;
use crate::gateway::{PersistenceGateway, Statistics};
use crate::rebase::{ConflictReport, RebaseCoordinator, RebasePhase, RebaseStrategy};
use crate::status::{ConsoleStatus, SuccessTimer};
use crate::tracker::{DraftState, DraftTracker};
use cfg_rules::{standard_rules, DisplayField, EntityOptions, TransitionRules};
use cfg_snapshot::{
    ConfigDomain, ConfigSnapshot, FieldValue, SnapshotDiff, SnapshotError, SnapshotVersion,
};
use chrono::Utc;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// State manager for one configuration domain
///
/// All methods take `&self`; the console can be shared behind an `Arc`.
/// Internal locks are never held across an `.await`.
///
/// # Example
///
/// ```rust,ignore
/// let console = ConfigurationConsole::new(ConfigDomain::Retention, gateway);
/// console.load().await?;
/// console.set_field("readLogRetention", FieldValue::Millis(0))?;
/// console.save().await?;
/// ```
pub struct ConfigurationConsole {
    domain: ConfigDomain,
    gateway: Arc<dyn PersistenceGateway>,
    rules: Arc<dyn TransitionRules>,
    config: ConsoleConfig,
    tracker: DraftTracker,
    coordinator: RebaseCoordinator,
    status: Arc<Mutex<ConsoleStatus>>,
    statistics: Mutex<Option<Statistics>>,
    timer: SuccessTimer,
    fetches: AtomicUsize,
    torn_down: AtomicBool,
}

impl ConfigurationConsole {
    /// Create a console with the built-in rules and default configuration
    #[must_use]
    pub fn new(domain: ConfigDomain, gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self {
            domain,
            rules: standard_rules(domain),
            config: ConsoleConfig::default(),
            tracker: DraftTracker::new(domain, Arc::clone(&gateway)),
            coordinator: RebaseCoordinator::new(domain, Arc::clone(&gateway)),
            gateway,
            status: Arc::new(Mutex::new(ConsoleStatus::default())),
            statistics: Mutex::new(None),
            timer: SuccessTimer::default(),
            fetches: AtomicUsize::new(0),
            torn_down: AtomicBool::new(false),
        }
    }

    /// Replace the configuration
    #[must_use]
    pub fn with_config(mut self, config: ConsoleConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the domain rules
    ///
    /// # Errors
    /// Returns error if `rules` are for another domain
    pub fn with_rules(mut self, rules: Arc<dyn TransitionRules>) -> Result<Self, SnapshotError> {
        if rules.domain() != self.domain {
            return Err(SnapshotError::DomainMismatch {
                expected: self.domain,
                actual: rules.domain(),
            });
        }
        self.rules = rules;
        Ok(self)
    }

    /// Domain
    #[inline]
    #[must_use]
    pub fn domain(&self) -> ConfigDomain {
        self.domain
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// Load the committed snapshot and statistics
    ///
    /// Both are fetched concurrently. A statistics failure is logged and
    /// the previous counters are kept; it never fails the load. Loading
    /// again never discards unsaved edits; use [`refresh`](Self::refresh)
    /// to confirm that.
    ///
    /// # Errors
    /// - [`ConsoleError::UnsavedChanges`] if the loaded draft is dirty
    /// - [`ConsoleError::Load`] if the snapshot fetch fails; any previously
    ///   loaded state stays available
    /// - [`ConsoleError::SaveInProgress`] while a commit is in flight
    pub async fn load(&self) -> Result<DraftState, ConsoleError> {
        self.refresh(false).await
    }

    /// Re-fetch the committed snapshot and statistics
    ///
    /// Unsaved edits are only discarded when `discard_unsaved` is set; a
    /// pending conflict is dropped along with them.
    ///
    /// # Errors
    /// - [`ConsoleError::UnsavedChanges`] if dirty and not confirmed
    /// - [`ConsoleError::SaveInProgress`] while a commit is in flight
    /// - [`ConsoleError::Load`] if the fetch fails
    pub async fn refresh(&self, discard_unsaved: bool) -> Result<DraftState, ConsoleError> {
        if !discard_unsaved && self.tracker.is_dirty() {
            return Err(self.fail(ConsoleError::UnsavedChanges {
                domain: self.domain,
            }));
        }
        self.fetch_and_install(discard_unsaved).await
    }

    /// Replace one draft field
    ///
    /// # Errors
    /// Returns error if nothing is loaded or the value does not fit the schema
    pub fn set_field(&self, key: &str, value: FieldValue) -> Result<DraftState, ConsoleError> {
        self.tracker
            .set_field(key, value)
            .map_err(|err| self.fail(err))
    }

    /// Discard unsaved edits
    ///
    /// # Errors
    /// Returns error if nothing is loaded
    pub fn reset(&self) -> Result<DraftState, ConsoleError> {
        self.tracker.reset().map_err(|err| self.fail(err))
    }

    /// Validate and commit the draft
    ///
    /// Validation runs first; a failing draft never reaches the gateway.
    /// On success the draft is re-baselined and the success indicator is
    /// raised until the success window elapses.
    ///
    /// # Errors
    /// - [`ConsoleError::NotLoaded`] before the first load
    /// - [`ConsoleError::Validation`] if the draft fails its domain rules
    /// - [`ConsoleError::SaveInProgress`] if a commit is already in flight
    /// - [`ConsoleError::ConflictPending`] until a pending conflict is rebased
    /// - [`ConsoleError::Conflict`] if the server moved since the draft's base
    /// - [`ConsoleError::Persist`] if the server refused the commit
    pub async fn save(&self) -> Result<DraftState, ConsoleError> {
        self.try_save().await.map_err(|err| self.fail(err))
    }

    async fn try_save(&self) -> Result<DraftState, ConsoleError> {
        let state = self.loaded()?;
        if let Err(err) = self.rules.validate(state.draft()) {
            tracing::warn!(domain = %self.domain, error = %err, "draft rejected before save");
            return Err(err.into());
        }

        let ticket = self.coordinator.begin_save()?;
        // a new save supersedes the previous success indicator
        self.timer.cancel();
        self.status.lock().saved = false;

        let outcome = self.coordinator.commit(ticket, &state).await;
        if self.is_torn_down() {
            return self.finish_detached(outcome);
        }
        let committed = outcome?;
        let rebased = self.tracker.rebaseline(state.draft(), committed);
        self.coordinator.settle();
        let rebased = rebased?;

        {
            let mut status = self.status.lock();
            status.saved = true;
            status.last_saved_at = Some(Utc::now());
            status.last_error = None;
        }
        self.timer
            .schedule(self.config.success_window(), Arc::downgrade(&self.status));

        if rebased.is_dirty() {
            tracing::info!(
                domain = %self.domain,
                pending = rebased.changes().len(),
                "saved; edits made during the save remain unsaved"
            );
        }
        Ok(rebased)
    }

    /// Resolve a pending conflict
    ///
    /// # Errors
    /// - [`ConsoleError::NoConflict`] if nothing is pending
    /// - [`ConsoleError::Conflict`] if keep-local finds the server moved again
    /// - [`ConsoleError::Load`] if keep-local cannot re-fetch
    pub async fn rebase(&self, strategy: RebaseStrategy) -> Result<DraftState, ConsoleError> {
        let result = async {
            let state = self.loaded()?;
            let resolution = self.coordinator.rebase(&state, strategy).await?;
            self.tracker.resolve(&resolution)
        }
        .await;

        match result {
            Ok(state) => {
                self.status.lock().last_error = None;
                Ok(state)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Pending conflict, if any
    #[must_use]
    pub fn conflict(&self) -> Option<ConflictReport> {
        self.coordinator.conflict()
    }

    /// Fill unset fields with the rules' suggested defaults
    ///
    /// # Errors
    /// Returns error if nothing is loaded
    pub fn apply_suggested_defaults(
        &self,
        options: &EntityOptions,
    ) -> Result<DraftState, ConsoleError> {
        let rules = Arc::clone(&self.rules);
        self.tracker
            .update(|state| {
                let suggested = rules.suggest_defaults(state.draft(), options)?;
                state.with_draft(&suggested)
            })
            .map_err(|err| self.fail(err))
    }

    /// Presentation fields for the current draft
    ///
    /// # Errors
    /// Returns error if nothing is loaded
    pub fn display(&self, options: &EntityOptions) -> Result<Vec<DisplayField>, ConsoleError> {
        let state = self.loaded()?;
        Ok(self.rules.describe(state.draft(), options))
    }

    /// Validate the current draft without saving
    ///
    /// # Errors
    /// Returns error if nothing is loaded or the draft fails its rules
    pub fn validate(&self) -> Result<(), ConsoleError> {
        let state = self.loaded()?;
        self.rules.validate(state.draft()).map_err(Into::into)
    }

    /// Current draft state, if loaded
    #[must_use]
    pub fn draft_state(&self) -> Option<DraftState> {
        self.tracker.current()
    }

    /// Whether the draft has unsaved edits
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.tracker.is_dirty()
    }

    /// Unsaved field changes, if loaded
    #[must_use]
    pub fn changes(&self) -> Option<SnapshotDiff> {
        self.tracker.current().map(|state| state.changes())
    }

    /// Most recently fetched statistics
    #[must_use]
    pub fn statistics(&self) -> Option<Statistics> {
        self.statistics.lock().clone()
    }

    /// Status snapshot
    #[must_use]
    pub fn status(&self) -> ConsoleStatus {
        let mut status = self.status.lock().clone();
        status.loading = self.fetches.load(Ordering::SeqCst) > 0;
        status.phase = self.coordinator.phase();
        status.saving = status.phase == RebasePhase::Saving;
        status
    }

    /// Stop background work and discard the draft
    ///
    /// Unsaved edits are dropped, never persisted. A commit already in
    /// flight still runs to completion but no longer updates the console.
    /// Returns whether a pending success indicator was cancelled.
    pub fn teardown(&self) -> bool {
        self.torn_down.store(true, Ordering::SeqCst);
        let cancelled = self.timer.cancel();
        if let Some(state) = self.tracker.discard() {
            if state.is_dirty() {
                tracing::info!(
                    domain = %self.domain,
                    discarded = state.changes().len(),
                    "console torn down with unsaved edits"
                );
            }
        }
        self.coordinator.abandon();
        cancelled
    }

    async fn fetch_and_install(&self, discard_unsaved: bool) -> Result<DraftState, ConsoleError> {
        if self.coordinator.phase() == RebasePhase::Saving {
            return Err(self.fail(ConsoleError::SaveInProgress {
                domain: self.domain,
            }));
        }

        let (snapshot, statistics) = {
            let _fetching = FetchGuard::enter(&self.fetches);
            tokio::join!(
                self.tracker.fetch_committed(),
                self.gateway.fetch_statistics(self.domain)
            )
        };

        match statistics {
            Ok(statistics) => *self.statistics.lock() = Some(statistics),
            Err(err) => {
                tracing::warn!(domain = %self.domain, error = %err, "statistics unavailable");
            }
        }

        let installed = snapshot
            .map_err(ConsoleError::from)
            .and_then(|committed| self.tracker.replace_committed(committed, discard_unsaved));

        match installed {
            Ok(state) => {
                if let Some(dropped) = self.coordinator.abandon() {
                    tracing::info!(
                        domain = %self.domain,
                        remote = ?dropped.remote_version().map(SnapshotVersion::as_str),
                        "pending conflict dropped by refresh"
                    );
                }
                self.status.lock().last_error = None;
                tracing::debug!(
                    domain = %self.domain,
                    version = ?state.committed().version().map(SnapshotVersion::as_str),
                    "configuration loaded"
                );
                Ok(state)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Settle a commit that resolved after teardown
    ///
    /// The server outcome is logged and handed back; tracker, status and
    /// timer stay untouched.
    fn finish_detached(
        &self,
        outcome: Result<ConfigSnapshot, ConsoleError>,
    ) -> Result<DraftState, ConsoleError> {
        match outcome {
            Ok(committed) => {
                self.coordinator.settle();
                tracing::info!(
                    domain = %self.domain,
                    version = ?committed.version().map(SnapshotVersion::as_str),
                    "commit completed after teardown"
                );
                Ok(DraftState::from_committed(committed))
            }
            Err(err) => {
                self.coordinator.abandon();
                tracing::info!(
                    domain = %self.domain,
                    error = %err,
                    "commit failed after teardown"
                );
                Err(err)
            }
        }
    }

    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    fn loaded(&self) -> Result<DraftState, ConsoleError> {
        self.tracker.current().ok_or(ConsoleError::NotLoaded {
            domain: self.domain,
        })
    }

    /// Record an error in the status and hand it back
    fn fail(&self, err: ConsoleError) -> ConsoleError {
        if !self.is_torn_down() {
            self.status.lock().last_error = Some(err.clone());
        }
        err
    }
}

/// Counts a fetch in flight for as long as it lives
struct FetchGuard<'a>(&'a AtomicUsize);

impl<'a> FetchGuard<'a> {
    fn enter(fetches: &'a AtomicUsize) -> Self {
        fetches.fetch_add(1, Ordering::SeqCst);
        Self(fetches)
    }
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl fmt::Debug for ConfigurationConsole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationConsole")
            .field("domain", &self.domain)
            .field("rules", &self.rules)
            .field("config", &self.config)
            .field("tracker", &self.tracker)
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

impl Drop for ConfigurationConsole {
    fn drop(&mut self) {
        self.timer.cancel();
    }
}
