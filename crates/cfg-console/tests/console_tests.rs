//! Console behaviour against the in-memory gateway

use cfg_console::{
    ConfigurationConsole, ConsoleConfig, ConsoleError, GatewayError, PersistenceGateway,
    RebasePhase, RebaseStrategy, Statistics,
};
use cfg_rules::{display_text, FOREVER};
use cfg_snapshot::schema::{
    ANONYMOUS_GROUP, DEFAULT_NEW_USER_GROUP, OBJECT_ARCHIVE_RETENTION, RBAC_ENABLED,
    READ_LOG_RETENTION, UPDATE_LOG_RETENTION,
};
use cfg_snapshot::{ConfigDomain, ConfigSnapshot, EntityRef, FieldValue};
use cfg_test_utils::{entity_options, fields, unreachable, InMemoryGateway};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

const WEEK_MS: i64 = 604_800_000;

fn console(gateway: &Arc<InMemoryGateway>, domain: ConfigDomain) -> ConfigurationConsole {
    let gateway: Arc<dyn PersistenceGateway> = gateway.clone();
    ConfigurationConsole::new(domain, gateway)
}

// =========================================================================
// Load / reset
// =========================================================================

#[tokio::test]
async fn reset_after_load_is_clean_for_every_domain() {
    let gateway = InMemoryGateway::shared();
    gateway.seed(ConfigDomain::Retention, fields(ConfigDomain::Retention, &[]));

    for domain in ConfigDomain::ALL {
        let console = console(&gateway, domain);
        let loaded = console.load().await.unwrap();
        assert!(!loaded.is_dirty());

        let reset = console.reset().unwrap();
        assert!(!reset.is_dirty());
        assert_eq!(reset.draft(), reset.committed());
        assert_eq!(console.reset().unwrap(), reset);
    }
}

#[tokio::test]
async fn missing_domain_loads_defaults_with_statistics() {
    let gateway = InMemoryGateway::shared();
    gateway.seed_statistics(
        Statistics::new(ConfigDomain::Organisation).with_counter("organisations", 3),
    );
    let console = console(&gateway, ConfigDomain::Organisation);

    let state = console.load().await.unwrap();
    assert_eq!(state.committed(), &ConfigSnapshot::defaults(ConfigDomain::Organisation));
    assert!(state.committed().version().is_none());
    assert_eq!(
        console.statistics().and_then(|s| s.counter("organisations")),
        Some(3)
    );
}

#[tokio::test]
async fn failed_refresh_keeps_stale_state() {
    let gateway = InMemoryGateway::shared();
    gateway.seed(ConfigDomain::Rbac, fields(ConfigDomain::Rbac, &[]));
    let console = console(&gateway, ConfigDomain::Rbac);
    let loaded = console.load().await.unwrap();

    gateway.fail_fetch(unreachable());
    let err = console.refresh(true).await.unwrap_err();

    assert!(matches!(err, ConsoleError::Load(_)));
    assert!(err.is_recoverable());
    assert_eq!(console.draft_state(), Some(loaded));
    assert!(matches!(console.status().last_error, Some(ConsoleError::Load(_))));
    assert!(!console.status().loading);
}

#[tokio::test]
async fn statistics_failure_never_fails_load() {
    let gateway = InMemoryGateway::shared();
    gateway.seed_statistics(Statistics::new(ConfigDomain::Retention).with_counter("logs", 10));
    let console = console(&gateway, ConfigDomain::Retention);
    console.load().await.unwrap();

    gateway.fail_statistics(unreachable());
    console.refresh(false).await.unwrap();

    assert_eq!(console.statistics().and_then(|s| s.counter("logs")), Some(10));
    assert!(console.status().last_error.is_none());
}

#[tokio::test(start_paused = true)]
async fn load_waits_for_late_statistics() {
    let gateway = InMemoryGateway::shared();
    gateway.seed_statistics(Statistics::new(ConfigDomain::Organisation).with_counter("users", 7));
    gateway.delay_statistics(Duration::from_millis(500));
    let console = console(&gateway, ConfigDomain::Organisation);

    console.load().await.unwrap();
    assert_eq!(console.statistics().and_then(|s| s.counter("users")), Some(7));
}

#[tokio::test]
async fn refresh_refuses_to_drop_unsaved_edits() {
    let gateway = InMemoryGateway::shared();
    let console = console(&gateway, ConfigDomain::Rbac);
    console.load().await.unwrap();
    console.set_field(RBAC_ENABLED, FieldValue::Bool(true)).unwrap();
    let fetches = gateway.fetch_count();

    let err = console.refresh(false).await.unwrap_err();
    assert!(matches!(err, ConsoleError::UnsavedChanges { .. }));
    assert!(console.is_dirty());
    assert_eq!(gateway.fetch_count(), fetches);

    let state = console.refresh(true).await.unwrap();
    assert!(!state.is_dirty());
}

#[tokio::test]
async fn load_again_keeps_unsaved_edits() {
    let gateway = InMemoryGateway::shared();
    gateway.seed(ConfigDomain::Rbac, fields(ConfigDomain::Rbac, &[]));
    let console = console(&gateway, ConfigDomain::Rbac);
    console.load().await.unwrap();
    let edited = console.set_field(RBAC_ENABLED, FieldValue::Bool(true)).unwrap();
    let fetches = gateway.fetch_count();

    let err = console.load().await.unwrap_err();
    assert!(matches!(err, ConsoleError::UnsavedChanges { .. }));
    assert!(console.is_dirty());
    assert_eq!(console.draft_state(), Some(edited));
    assert_eq!(gateway.fetch_count(), fetches);
    assert!(matches!(
        console.status().last_error,
        Some(ConsoleError::UnsavedChanges { .. })
    ));
}

#[tokio::test]
async fn load_again_when_clean_picks_up_remote_changes() {
    let gateway = InMemoryGateway::shared();
    gateway.seed(ConfigDomain::Rbac, fields(ConfigDomain::Rbac, &[]));
    let console = console(&gateway, ConfigDomain::Rbac);
    console.load().await.unwrap();

    let remote = gateway.bump_remote(ConfigDomain::Rbac, RBAC_ENABLED, FieldValue::Bool(true));
    let state = console.load().await.unwrap();
    assert_eq!(state.committed(), &remote);
    assert!(!state.is_dirty());
}

#[tokio::test(start_paused = true)]
async fn loading_stays_raised_while_any_fetch_runs() {
    let gateway = InMemoryGateway::shared();
    gateway.delay_statistics(Duration::from_millis(1_000));
    let console = Arc::new(console(&gateway, ConfigDomain::Organisation));

    let first = tokio::spawn({
        let console = Arc::clone(&console);
        async move { console.load().await }
    });
    tokio::time::sleep(Duration::from_millis(500)).await;
    let second = tokio::spawn({
        let console = Arc::clone(&console);
        async move { console.refresh(true).await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(console.status().loading);

    assert!(first.await.unwrap().is_ok());
    // the first fetch is done, the second one is still waiting on statistics
    assert!(console.status().loading);

    assert!(second.await.unwrap().is_ok());
    assert!(!console.status().loading);
}

// =========================================================================
// Edits
// =========================================================================

#[tokio::test]
async fn schema_violations_are_rejected() {
    let gateway = InMemoryGateway::shared();
    let console = console(&gateway, ConfigDomain::Retention);

    let err = console.set_field(READ_LOG_RETENTION, FieldValue::Millis(1)).unwrap_err();
    assert!(matches!(err, ConsoleError::NotLoaded { .. }));

    console.load().await.unwrap();
    let err = console
        .set_field(READ_LOG_RETENTION, FieldValue::Bool(true))
        .unwrap_err();
    assert!(matches!(err, ConsoleError::Snapshot(_)));
    let err = console.set_field("colour", FieldValue::Bool(true)).unwrap_err();
    assert!(matches!(err, ConsoleError::Snapshot(_)));
    assert!(!console.is_dirty());
}

#[tokio::test]
async fn suggested_group_defaults_fill_nulls() {
    let gateway = InMemoryGateway::shared();
    gateway.seed(
        ConfigDomain::Rbac,
        fields(
            ConfigDomain::Rbac,
            &[
                (ANONYMOUS_GROUP, FieldValue::NULL_REF),
                (DEFAULT_NEW_USER_GROUP, FieldValue::NULL_REF),
            ],
        ),
    );
    let console = console(&gateway, ConfigDomain::Rbac);
    console.load().await.unwrap();

    let state = console.apply_suggested_defaults(&entity_options()).unwrap();
    assert!(state.is_dirty());
    assert_eq!(
        state.draft().get(ANONYMOUS_GROUP),
        Some(&FieldValue::from(EntityRef::group("public")))
    );
    assert_eq!(
        state.draft().get(DEFAULT_NEW_USER_GROUP),
        Some(&FieldValue::from(EntityRef::group("viewer")))
    );
}

// =========================================================================
// Save
// =========================================================================

#[tokio::test]
async fn save_round_trip_assigns_fresh_version() {
    let gateway = InMemoryGateway::shared();
    let seeded = gateway.seed(ConfigDomain::Retention, fields(ConfigDomain::Retention, &[]));
    let console = console(&gateway, ConfigDomain::Retention);
    console.load().await.unwrap();

    let edited = console
        .set_field(UPDATE_LOG_RETENTION, FieldValue::Millis(0))
        .unwrap();
    let saved = console.save().await.unwrap();

    assert!(!saved.is_dirty());
    assert_eq!(saved.committed().fields(), edited.draft().fields());
    assert_ne!(saved.committed().version(), seeded.version());
    assert_eq!(gateway.stored(ConfigDomain::Retention).as_ref(), Some(saved.committed()));

    let status = console.status();
    assert!(status.saved);
    assert_eq!(status.phase, RebasePhase::Clean);
    assert!(status.last_saved_at.is_some());
}

#[tokio::test]
async fn first_save_of_missing_domain_creates_it() {
    let gateway = InMemoryGateway::shared();
    let console = console(&gateway, ConfigDomain::Organisation);
    console.load().await.unwrap();

    let saved = console.save().await.unwrap();
    assert!(saved.committed().version().is_some());
    assert!(gateway.stored(ConfigDomain::Organisation).is_some());
}

#[tokio::test]
async fn rbac_validation_blocks_save_before_network() {
    let gateway = InMemoryGateway::shared();
    let console = console(&gateway, ConfigDomain::Rbac);
    console.load().await.unwrap();
    console.set_field(RBAC_ENABLED, FieldValue::Bool(true)).unwrap();
    console.set_field(ANONYMOUS_GROUP, FieldValue::NULL_REF).unwrap();

    let err = console.save().await.unwrap_err();
    assert!(matches!(err, ConsoleError::Validation(_)));
    assert!(err.is_local());
    assert_eq!(gateway.commit_count(), 0);
    assert!(console.is_dirty());
    assert!(matches!(
        console.status().last_error,
        Some(ConsoleError::Validation(_))
    ));
}

#[tokio::test]
async fn negative_duration_blocks_save() {
    let gateway = InMemoryGateway::shared();
    let console = console(&gateway, ConfigDomain::Retention);
    console.load().await.unwrap();
    console.set_field(READ_LOG_RETENTION, FieldValue::Millis(-1)).unwrap();

    let err = console.save().await.unwrap_err();
    let ConsoleError::Validation(validation) = err else {
        panic!("expected validation error");
    };
    assert_eq!(validation.issues.len(), 1);
    assert_eq!(validation.issues[0].field, READ_LOG_RETENTION);
    assert_eq!(gateway.commit_count(), 0);
}

#[tokio::test]
async fn rejected_commit_keeps_draft_for_retry() {
    let gateway = InMemoryGateway::shared();
    let console = console(&gateway, ConfigDomain::Retention);
    console.load().await.unwrap();
    console.set_field(READ_LOG_RETENTION, FieldValue::Millis(0)).unwrap();

    gateway.fail_commit(GatewayError::Rejected {
        message: "read-only mode".to_string(),
    });
    let err = console.save().await.unwrap_err();
    let ConsoleError::Persist(persist) = &err else {
        panic!("expected persist error, got {err}");
    };
    assert_eq!(persist.message, "read-only mode");
    assert!(console.is_dirty());
    assert_eq!(console.status().phase, RebasePhase::Clean);

    gateway.clear_failures();
    assert!(!console.save().await.unwrap().is_dirty());
}

#[tokio::test]
async fn concurrent_saves_issue_one_commit() {
    let gateway = InMemoryGateway::shared();
    let console = Arc::new(console(&gateway, ConfigDomain::Retention));
    console.load().await.unwrap();
    console.set_field(READ_LOG_RETENTION, FieldValue::Millis(0)).unwrap();

    let gate = gateway.hold_commits();
    let first = tokio::spawn({
        let console = Arc::clone(&console);
        async move { console.save().await }
    });
    gateway.commit_entered().await;

    assert!(console.status().saving);
    let err = console.save().await.unwrap_err();
    assert!(matches!(err, ConsoleError::SaveInProgress { .. }));
    let err = console.refresh(true).await.unwrap_err();
    assert!(matches!(err, ConsoleError::SaveInProgress { .. }));

    gate.notify_one();
    assert!(first.await.unwrap().is_ok());
    assert_eq!(gateway.commit_count(), 1);
    assert!(!console.status().saving);
}

#[tokio::test]
async fn edits_during_save_survive_rebaseline() {
    let gateway = InMemoryGateway::shared();
    let console = Arc::new(console(&gateway, ConfigDomain::Retention));
    console.load().await.unwrap();
    console.set_field(READ_LOG_RETENTION, FieldValue::Millis(0)).unwrap();

    let gate = gateway.hold_commits();
    let save = tokio::spawn({
        let console = Arc::clone(&console);
        async move { console.save().await }
    });
    gateway.commit_entered().await;
    console
        .set_field(OBJECT_ARCHIVE_RETENTION, FieldValue::Millis(WEEK_MS))
        .unwrap();
    gate.notify_one();

    let state = save.await.unwrap().unwrap();
    assert!(state.is_dirty());
    assert_eq!(state.changes().keys().collect::<Vec<_>>(), vec![OBJECT_ARCHIVE_RETENTION]);
    assert_eq!(
        state.committed().get(READ_LOG_RETENTION),
        Some(&FieldValue::Millis(0))
    );
    assert_eq!(state.draft().version(), state.committed().version());
}

// =========================================================================
// Conflicts
// =========================================================================

async fn conflicted_rbac(gateway: &Arc<InMemoryGateway>) -> ConfigurationConsole {
    gateway.seed(ConfigDomain::Rbac, fields(ConfigDomain::Rbac, &[]));
    let console = console(gateway, ConfigDomain::Rbac);
    console.load().await.unwrap();
    console.set_field(RBAC_ENABLED, FieldValue::Bool(true)).unwrap();
    gateway.bump_remote(
        ConfigDomain::Rbac,
        ANONYMOUS_GROUP,
        EntityRef::group("editor").into(),
    );
    let err = console.save().await.unwrap_err();
    assert!(matches!(err, ConsoleError::Conflict(_)));
    console
}

#[tokio::test]
async fn stale_commit_conflicts_without_applying() {
    let gateway = InMemoryGateway::shared();
    let console = conflicted_rbac(&gateway).await;

    let stored = gateway.stored(ConfigDomain::Rbac).unwrap();
    assert_eq!(stored.get(RBAC_ENABLED), Some(&FieldValue::Bool(false)));

    let report = console.conflict().unwrap();
    assert_eq!(report.remote, stored);
    assert_eq!(report.against_base.keys().collect::<Vec<_>>(), vec![RBAC_ENABLED]);
    assert!(report.against_remote.touches(ANONYMOUS_GROUP));
    assert!(console.is_dirty());
    assert_eq!(console.status().phase, RebasePhase::Conflicted);

    let err = console.save().await.unwrap_err();
    assert!(matches!(err, ConsoleError::ConflictPending { .. }));
    assert_eq!(gateway.commit_count(), 1);
}

#[tokio::test]
async fn take_remote_adopts_server_snapshot() {
    let gateway = InMemoryGateway::shared();
    let console = conflicted_rbac(&gateway).await;
    let fetches = gateway.fetch_count();

    let state = console.rebase(RebaseStrategy::TakeRemote).await.unwrap();
    assert!(!state.is_dirty());
    assert_eq!(Some(state.committed()), gateway.stored(ConfigDomain::Rbac).as_ref());
    assert_eq!(gateway.fetch_count(), fetches);
    assert!(console.conflict().is_none());
    assert_eq!(console.status().phase, RebasePhase::Clean);
}

#[tokio::test]
async fn keep_local_keeps_draft_on_new_version() {
    let gateway = InMemoryGateway::shared();
    let console = conflicted_rbac(&gateway).await;
    let draft_before = console.draft_state().unwrap().draft().clone();

    let state = console.rebase(RebaseStrategy::KeepLocal).await.unwrap();
    let remote = gateway.stored(ConfigDomain::Rbac).unwrap();
    assert!(state.draft().same_fields(&draft_before));
    assert_eq!(state.committed(), &remote);
    assert_eq!(state.draft().version(), remote.version());
    assert!(state.is_dirty());

    let saved = console.save().await.unwrap();
    assert!(!saved.is_dirty());
    assert_eq!(saved.committed().get(RBAC_ENABLED), Some(&FieldValue::Bool(true)));
}

#[tokio::test]
async fn keep_local_surfaces_a_second_conflict() {
    let gateway = InMemoryGateway::shared();
    let console = conflicted_rbac(&gateway).await;
    let first = console.conflict().unwrap();

    let moved = gateway.bump_remote(ConfigDomain::Rbac, RBAC_ENABLED, FieldValue::Bool(false));
    let err = console.rebase(RebaseStrategy::KeepLocal).await.unwrap_err();

    let report = err.conflict().unwrap();
    assert_eq!(report.remote_version(), moved.version());
    assert_ne!(report.remote_version(), first.remote_version());
    assert_eq!(console.conflict().as_ref(), Some(report));
    assert_eq!(console.status().phase, RebasePhase::Conflicted);

    let state = console.rebase(RebaseStrategy::KeepLocal).await.unwrap();
    assert_eq!(state.committed(), &moved);
}

#[tokio::test]
async fn rebase_without_conflict_is_refused() {
    let gateway = InMemoryGateway::shared();
    let console = console(&gateway, ConfigDomain::Retention);
    console.load().await.unwrap();

    let err = console.rebase(RebaseStrategy::KeepLocal).await.unwrap_err();
    assert!(matches!(err, ConsoleError::NoConflict { .. }));
}

#[tokio::test]
async fn confirmed_refresh_drops_pending_conflict() {
    let gateway = InMemoryGateway::shared();
    let console = conflicted_rbac(&gateway).await;

    let state = console.refresh(true).await.unwrap();
    assert!(!state.is_dirty());
    assert!(console.conflict().is_none());
    assert_eq!(console.status().phase, RebasePhase::Clean);
    assert!(console.save().await.is_ok());
}

// =========================================================================
// Success indicator
// =========================================================================

#[tokio::test(start_paused = true)]
async fn success_indicator_clears_after_window() {
    let gateway = InMemoryGateway::shared();
    let console = console(&gateway, ConfigDomain::Organisation);
    console.load().await.unwrap();
    console.save().await.unwrap();
    assert!(console.status().saved);

    tokio::time::sleep(Duration::from_millis(2_900)).await;
    assert!(console.status().saved);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!console.status().saved);
}

#[tokio::test(start_paused = true)]
async fn configured_success_window_is_used() {
    let gateway = InMemoryGateway::shared();
    let console = console(&gateway, ConfigDomain::Organisation)
        .with_config(ConsoleConfig::new().with_success_window(Duration::from_millis(500)));
    console.load().await.unwrap();
    console.save().await.unwrap();

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(!console.status().saved);
}

#[tokio::test(start_paused = true)]
async fn teardown_cancels_success_indicator() {
    let gateway = InMemoryGateway::shared();
    let console = console(&gateway, ConfigDomain::Organisation);
    console.load().await.unwrap();
    console.save().await.unwrap();

    assert!(console.teardown());
    tokio::time::sleep(Duration::from_secs(10)).await;

    // the timer never ran, so the indicator was never touched
    assert!(console.status().saved);
    assert!(console.draft_state().is_none());
    assert!(!console.teardown());
}

#[tokio::test]
async fn teardown_during_commit_lets_it_finish_quietly() {
    let gateway = InMemoryGateway::shared();
    let console = Arc::new(console(&gateway, ConfigDomain::Retention));
    console.load().await.unwrap();
    console.set_field(READ_LOG_RETENTION, FieldValue::Millis(0)).unwrap();

    let gate = gateway.hold_commits();
    let save = tokio::spawn({
        let console = Arc::clone(&console);
        async move { console.save().await }
    });
    gateway.commit_entered().await;
    assert!(!console.teardown());
    gate.notify_one();

    let committed = save.await.unwrap().unwrap();
    assert!(!committed.is_dirty());
    assert_eq!(
        committed.committed().get(READ_LOG_RETENTION),
        Some(&FieldValue::Millis(0))
    );
    assert_eq!(gateway.stored(ConfigDomain::Retention).as_ref(), Some(committed.committed()));

    let status = console.status();
    assert!(status.last_error.is_none());
    assert!(!status.saved);
    assert!(status.last_saved_at.is_none());
    assert_eq!(status.phase, RebasePhase::Clean);
    assert!(console.draft_state().is_none());
    // no success indicator was scheduled
    assert!(!console.teardown());
}

#[tokio::test]
async fn teardown_during_conflicting_commit_records_nothing() {
    let gateway = InMemoryGateway::shared();
    gateway.seed(ConfigDomain::Retention, fields(ConfigDomain::Retention, &[]));
    let console = Arc::new(console(&gateway, ConfigDomain::Retention));
    console.load().await.unwrap();
    console.set_field(READ_LOG_RETENTION, FieldValue::Millis(0)).unwrap();
    gateway.bump_remote(ConfigDomain::Retention, UPDATE_LOG_RETENTION, FieldValue::Millis(0));

    let gate = gateway.hold_commits();
    let save = tokio::spawn({
        let console = Arc::clone(&console);
        async move { console.save().await }
    });
    gateway.commit_entered().await;
    console.teardown();
    gate.notify_one();

    let err = save.await.unwrap().unwrap_err();
    assert!(matches!(err, ConsoleError::Conflict(_)));
    assert!(console.status().last_error.is_none());
    assert_eq!(console.status().phase, RebasePhase::Clean);
    assert!(console.conflict().is_none());
}

// =========================================================================
// Retention scenario
// =========================================================================

#[tokio::test]
async fn retention_forever_to_one_week() {
    let gateway = InMemoryGateway::shared();
    gateway.seed(
        ConfigDomain::Retention,
        fields(
            ConfigDomain::Retention,
            &[(OBJECT_ARCHIVE_RETENTION, FieldValue::Millis(0))],
        ),
    );
    let console = console(&gateway, ConfigDomain::Retention);
    console.load().await.unwrap();

    let options = entity_options();
    let shown = console.display(&options).unwrap();
    assert_eq!(display_text(&shown, OBJECT_ARCHIVE_RETENTION), Some(FOREVER));

    let state = console
        .set_field(OBJECT_ARCHIVE_RETENTION, FieldValue::Millis(WEEK_MS))
        .unwrap();
    assert!(state.is_dirty());
    assert_eq!(
        display_text(&console.display(&options).unwrap(), OBJECT_ARCHIVE_RETENTION),
        Some("1.0 week")
    );

    let saved = console.save().await.unwrap();
    assert!(!saved.is_dirty());
    assert_eq!(console.reset().unwrap(), saved);
    assert_eq!(
        gateway
            .stored(ConfigDomain::Retention)
            .and_then(|s| s.get(OBJECT_ARCHIVE_RETENTION).cloned()),
        Some(FieldValue::Millis(WEEK_MS))
    );
}
