//! End-to-end `cfgctl` runs against a temporary store

use cfg_cli::{build_cli, run, FileGateway};
use cfg_console::{ConsoleConfig, PersistenceGateway};
use cfg_snapshot::schema::{ANONYMOUS_GROUP, OBJECT_ARCHIVE_RETENTION, RBAC_ENABLED};
use cfg_snapshot::{ConfigDomain, EntityRef, FieldValue};
use pretty_assertions::assert_eq;
use std::path::Path;

async fn cfgctl(store: &Path, args: &[&str]) -> anyhow::Result<String> {
    let mut argv = vec!["cfgctl", "--store", store.to_str().unwrap()];
    argv.extend_from_slice(args);
    let matches = build_cli().try_get_matches_from(argv)?;
    run(&matches, ConsoleConfig::default()).await
}

#[tokio::test]
async fn show_missing_domain_renders_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store.json");

    let out = cfgctl(&store, &["show", "retention"]).await.unwrap();
    assert!(out.starts_with("retention (version never saved)"));
    assert!(out.contains("objectArchiveRetention"));
    assert!(out.contains("1.0 year"));
    assert!(!store.exists());
}

#[tokio::test]
async fn set_saves_and_show_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store.json");

    let out = cfgctl(&store, &["set", "retention", OBJECT_ARCHIVE_RETENTION, "0"])
        .await
        .unwrap();
    assert!(out.contains("saved retention"));

    let shown = cfgctl(&store, &["show", "retention"]).await.unwrap();
    assert!(shown.contains("Forever"));

    let stored = FileGateway::new(&store)
        .fetch(ConfigDomain::Retention)
        .await
        .unwrap();
    assert_eq!(stored.get(OBJECT_ARCHIVE_RETENTION), Some(&FieldValue::Millis(0)));
}

#[tokio::test]
async fn set_bare_identifier_as_group() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store.json");

    cfgctl(&store, &["set", "rbac", ANONYMOUS_GROUP, "guests"])
        .await
        .unwrap();
    let stored = FileGateway::new(&store).fetch(ConfigDomain::Rbac).await.unwrap();
    assert_eq!(
        stored.get(ANONYMOUS_GROUP),
        Some(&FieldValue::from(EntityRef::group("guests")))
    );
}

#[tokio::test]
async fn invalid_rbac_draft_is_not_saved() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store.json");
    cfgctl(&store, &["set", "rbac", ANONYMOUS_GROUP, "null"])
        .await
        .unwrap();

    let err = cfgctl(&store, &["set", "rbac", RBAC_ENABLED, "true"])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("failed validation"));

    let stored = FileGateway::new(&store).fetch(ConfigDomain::Rbac).await.unwrap();
    assert_eq!(stored.get(RBAC_ENABLED), Some(&FieldValue::Bool(false)));
}

#[tokio::test]
async fn unchanged_value_skips_save() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store.json");

    let out = cfgctl(&store, &["set", "organisation", "autoCreateDefault", "true"])
        .await
        .unwrap();
    assert_eq!(out, "autoCreateDefault unchanged");
    assert!(!store.exists());
}

#[tokio::test]
async fn humanize_durations() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store.json");

    assert_eq!(cfgctl(&store, &["humanize", "86400000"]).await.unwrap(), "1.0 day");
    assert_eq!(cfgctl(&store, &["humanize", "0"]).await.unwrap(), "Forever");
    assert!(cfgctl(&store, &["humanize", "-5"]).await.is_err());
}
