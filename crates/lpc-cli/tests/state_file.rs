//! Commands against state files on disk

use lpc_cli::commands;
use lpc_cli::{ClusterState, StateFile};
use lpc_core::status::reasons;
use lpc_core::{NodeStatus, ReconcilerConfig, Snapshot};
use lpc_document::ConfigDocument;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;

fn rendered(revision: i32, seconds: &str) -> Snapshot {
    let doc = ConfigDocument::from_value(json!({"apiServerArguments": {
        "default-not-ready-toleration-seconds": [seconds],
        "default-unreachable-toleration-seconds": [seconds],
    }}))
    .unwrap();
    Snapshot::rendered(revision, format!("config-{revision}"), "config.yaml", &doc)
}

async fn write_state(dir: &TempDir, name: &str, state: &ClusterState) -> PathBuf {
    let path = dir.path().join(name);
    StateFile::open(&path).unwrap().save(state).await.unwrap();
    path
}

fn converged_state() -> ClusterState {
    ClusterState {
        profile: Some("Default".to_string()),
        node_statuses: vec![NodeStatus::new("master-0", 2), NodeStatus::new("master-1", 2)],
        snapshots: vec![rendered(2, "300")],
        status: None,
    }
}

#[tokio::test]
async fn reconcile_persists_status_in_yaml() {
    let dir = TempDir::new().unwrap();
    let path = write_state(&dir, "cluster.yaml", &converged_state()).await;
    let config = ReconcilerConfig::default();

    let first = commands::reconcile(&config, &path).await.unwrap();
    assert_eq!(first["state"], json!("Complete"));
    assert_eq!(first["written"], json!(true));

    let stored = StateFile::open(&path).unwrap().load().await.unwrap();
    assert_eq!(
        stored.status.unwrap().completed.reason,
        reasons::PROFILE_UPDATED
    );

    let second = commands::reconcile(&config, &path).await.unwrap();
    assert_eq!(second["written"], json!(false));
}

#[tokio::test]
async fn reconcile_reports_lagging_revision() {
    let dir = TempDir::new().unwrap();
    let mut state = converged_state();
    state.profile = Some("Low".to_string());
    let path = write_state(&dir, "cluster.json", &state).await;

    let report = commands::reconcile(&ReconcilerConfig::default(), &path)
        .await
        .unwrap();
    assert_eq!(report["state"], json!("InProgress"));
    assert_eq!(report["lagging"]["revision"], json!(2));
}

#[tokio::test]
async fn reconcile_with_cached_snapshots() {
    let dir = TempDir::new().unwrap();
    let path = write_state(&dir, "cluster.json", &converged_state()).await;
    let config = ReconcilerConfig::default().with_snapshot_cache(8, 300);

    let report = commands::reconcile(&config, &path).await.unwrap();
    assert_eq!(report["state"], json!("Complete"));
}

#[tokio::test]
async fn snapshot_prefix_selects_snapshots() {
    let dir = TempDir::new().unwrap();
    let mut state = converged_state();
    state.snapshots = vec![Snapshot::rendered(
        2,
        "rendered-2",
        "config.yaml",
        &rendered(2, "300").document("config.yaml").unwrap(),
    )];
    let path = write_state(&dir, "cluster.json", &state).await;

    assert!(commands::reconcile(&ReconcilerConfig::default(), &path)
        .await
        .is_err());

    let config = ReconcilerConfig::default().with_snapshot_name_prefix("rendered");
    let report = commands::reconcile(&config, &path).await.unwrap();
    assert_eq!(report["state"], json!("Complete"));
}

#[tokio::test]
async fn missing_profile_is_reported() {
    let dir = TempDir::new().unwrap();
    let mut state = converged_state();
    state.profile = None;
    let path = write_state(&dir, "cluster.json", &state).await;

    let report = commands::reconcile(&ReconcilerConfig::default(), &path)
        .await
        .unwrap();
    assert_eq!(report, json!({"result": "ProfileNotFound"}));
}

#[tokio::test]
async fn unknown_profile_fails_and_keeps_status() {
    let dir = TempDir::new().unwrap();
    let mut state = converged_state();
    state.profile = Some("Unknown".to_string());
    let path = write_state(&dir, "cluster.json", &state).await;

    assert!(commands::reconcile(&ReconcilerConfig::default(), &path)
        .await
        .is_err());
    let stored = StateFile::open(&path).unwrap().load().await.unwrap();
    assert_eq!(stored.status, None);
}

#[tokio::test]
async fn watch_runs_bounded_passes() {
    let dir = TempDir::new().unwrap();
    let path = write_state(&dir, "cluster.json", &converged_state()).await;
    let config = ReconcilerConfig::default().with_resync_interval_secs(1);

    let passes = commands::watch(&config, &path, Some(1)).await.unwrap();
    assert_eq!(passes, 1);
    let stored = StateFile::open(&path).unwrap().load().await.unwrap();
    assert!(stored.status.is_some());
}

#[tokio::test]
async fn observe_prints_patch_for_existing_document() {
    let dir = TempDir::new().unwrap();
    let mut state = converged_state();
    state.profile = Some("MediumUpdateAverageReaction".to_string());
    let state_path = write_state(&dir, "cluster.json", &state).await;

    let existing = dir.path().join("config.json");
    std::fs::write(
        &existing,
        r#"{"apiServerArguments": {"default-not-ready-toleration-seconds": ["60"]}}"#,
    )
    .unwrap();

    let output = commands::observe(&ReconcilerConfig::default(), &state_path, Some(existing.as_path()))
        .await
        .unwrap();
    assert_eq!(
        output,
        json!({
            "patch": {"apiServerArguments": {"default-unreachable-toleration-seconds": ["60"]}},
            "failures": [],
        })
    );
}

#[test]
fn resolve_known_and_unknown_profiles() {
    let parameters = commands::resolve("Default").unwrap();
    assert_eq!(
        parameters.get("default-not-ready-toleration-seconds"),
        Some("300")
    );
    assert!(commands::resolve("").unwrap().is_noop());
    assert!(commands::resolve("Fastest").is_err());
}

#[test]
fn config_file_loading() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.toml");
    assert_eq!(
        commands::load_config(Some(missing.as_path())).unwrap(),
        ReconcilerConfig::default()
    );
    assert!(commands::validate_config(Some(missing.as_path())).is_err());

    let path = dir.path().join("lpc.toml");
    std::fs::write(&path, "resync_interval_secs = 5\n").unwrap();
    assert_eq!(
        commands::validate_config(Some(path.as_path())).unwrap().resync_interval_secs,
        5
    );

    std::fs::write(&path, "resync_interval_secs = 0\n").unwrap();
    assert!(commands::load_config(Some(path.as_path())).is_err());
}
