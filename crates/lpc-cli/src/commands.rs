//! Subcommand implementations

use crate::state::StateFile;
use anyhow::{bail, Context, Result};
use lpc_core::{
    CachedSnapshotSource, LatencyProfileController, ParameterSet, ProfileSource, ProfileTable,
    ReconcilerConfig, SnapshotSource, SyncOutcome,
};
use lpc_document::ConfigDocument;
use lpc_observer::latency_profile_pipeline;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

/// Load configuration, falling back to defaults when no file exists
///
/// # Errors
/// Unreadable or invalid configuration files.
pub fn load_config(path: Option<&Path>) -> Result<ReconcilerConfig> {
    let Some(path) = path else {
        return Ok(ReconcilerConfig::default());
    };
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(ReconcilerConfig::default());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    ReconcilerConfig::from_toml_str(&text)
        .with_context(|| format!("invalid config {}", path.display()))
}

/// Wire a controller over a state file
#[must_use]
pub fn build_controller(config: &ReconcilerConfig, state: &StateFile) -> LatencyProfileController {
    let state = state
        .clone()
        .with_snapshot_prefix(config.snapshot_name_prefix.as_str());
    let snapshots: Arc<dyn SnapshotSource> = match config.snapshot_cache_ttl() {
        Some(ttl) => Arc::new(CachedSnapshotSource::new(
            state.clone(),
            config.snapshot_cache_capacity,
            ttl,
        )),
        None => Arc::new(state.clone()),
    };
    let state = Arc::new(state);
    LatencyProfileController::new(config.clone(), state.clone(), state.clone(), snapshots, state)
}

/// Summary printed after a pass
#[must_use]
pub fn outcome_json(outcome: &SyncOutcome) -> serde_json::Value {
    match outcome {
        SyncOutcome::ProfileNotFound => json!({"result": "ProfileNotFound"}),
        SyncOutcome::Reconciled(report) => json!({
            "result": "Reconciled",
            "profile": report.profile,
            "state": report.state,
            "written": report.written,
            "lagging": report.outcome.as_ref().and_then(|o| match o {
                lpc_core::MatchOutcome::Lagging { revision, mismatch } => Some(json!({
                    "revision": revision,
                    "mismatch": mismatch.to_string(),
                })),
                lpc_core::MatchOutcome::Converged { .. } => None,
            }),
            "conditions": report.conditions,
        }),
    }
}

/// `reconcile`: one pass
///
/// # Errors
/// Any failed pass.
pub async fn reconcile(config: &ReconcilerConfig, state_path: &Path) -> Result<serde_json::Value> {
    let state = StateFile::open(state_path)?;
    let outcome = build_controller(config, &state)
        .sync()
        .await
        .context("reconciliation pass failed")?;
    Ok(outcome_json(&outcome))
}

/// `watch`: passes on the resync interval until interrupted
///
/// Failed passes are logged and retried on the next tick. Returns the number
/// of passes run.
///
/// # Errors
/// Invalid state file path.
pub async fn watch(
    config: &ReconcilerConfig,
    state_path: &Path,
    max_passes: Option<u64>,
) -> Result<u64> {
    let state = StateFile::open(state_path)?;
    let controller = build_controller(config, &state);
    let mut interval = tokio::time::interval(config.resync_interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    tracing::info!(
        controller = %config.controller_name,
        interval_secs = config.resync_interval_secs,
        state = %state.path().display(),
        "watching latency profile"
    );

    let mut passes = 0;
    loop {
        if max_passes.is_some_and(|max| passes >= max) {
            break;
        }
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, stopping");
                break;
            }
        }

        passes += 1;
        // failed passes are logged by the controller
        if let Ok(outcome) = controller.sync().await {
            tracing::debug!(pass = passes, result = %outcome_json(&outcome), "pass complete");
        }
    }
    Ok(passes)
}

/// `observe`: the patch the current profile requires
///
/// # Errors
/// Unreadable existing document.
pub async fn observe(
    config: &ReconcilerConfig,
    state_path: &Path,
    existing_path: Option<&Path>,
) -> Result<serde_json::Value> {
    let existing = match existing_path {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            ConfigDocument::from_json(&text)
                .with_context(|| format!("invalid config document {}", path.display()))?
        }
        None => ConfigDocument::new(),
    };

    let profiles: Arc<dyn ProfileSource> = Arc::new(StateFile::open(state_path)?);
    let pipeline =
        latency_profile_pipeline(&profiles, ProfileTable::default(), &config.argument_container);
    let observation = pipeline.run(&existing).await;

    let failures: Vec<_> = observation
        .failures
        .iter()
        .map(|f| json!({"path": f.path.to_string(), "error": f.error.to_string()}))
        .collect();
    Ok(json!({
        "patch": observation.patch,
        "failures": failures,
    }))
}

/// `resolve`: server arguments for a raw profile value
///
/// # Errors
/// Unknown profiles.
pub fn resolve(raw: &str) -> Result<ParameterSet> {
    let parameters = ProfileTable::default().resolve(raw)?;
    if parameters.is_noop() {
        tracing::info!("profile unset, existing arguments are left untouched");
    }
    Ok(parameters)
}

/// `validate-config`: load and check
///
/// # Errors
/// Missing or invalid configuration.
pub fn validate_config(path: Option<&Path>) -> Result<ReconcilerConfig> {
    let Some(path) = path else {
        bail!("--config is required for validate-config");
    };
    if !path.exists() {
        bail!("config file {} does not exist", path.display());
    }
    load_config(Some(path))
}
