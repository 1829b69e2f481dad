//! Testing utilities for the latency profile reconciler workspace
//!
//! In-memory providers, snapshot fixtures and a test cluster that wires
//! them into a controller.

#![allow(missing_docs)]

use lpc_core::{
    snapshot_name, ActiveRevisionSource, ConditionSet, LatencyProfileController, LookupError,
    NodeStatus, Profile, ProfileSource, ProfileTable, ReconcilerConfig, RevisionId, SinkError,
    Snapshot, SnapshotSource, StatusSink, TrackedParameter,
};
use lpc_document::ConfigDocument;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const PROFILE_TARGET: &str = "node.config/cluster";
pub const DATA_KEY: &str = "config.yaml";
pub const ARGUMENT_CONTAINER: &str = "apiServerArguments";

/// Profile source backed by a mutable value
#[derive(Debug)]
pub struct InMemoryProfileSource {
    profile: Mutex<Result<String, LookupError>>,
}

impl InMemoryProfileSource {
    pub fn new(raw: &str) -> Self {
        Self {
            profile: Mutex::new(Ok(raw.to_string())),
        }
    }

    /// Source whose target does not exist
    pub fn missing() -> Self {
        Self {
            profile: Mutex::new(Err(LookupError::NotFound(PROFILE_TARGET.to_string()))),
        }
    }

    pub fn set(&self, raw: &str) {
        *self.profile.lock() = Ok(raw.to_string());
    }

    pub fn fail(&self, err: LookupError) {
        *self.profile.lock() = Err(err);
    }
}

#[async_trait::async_trait]
impl ProfileSource for InMemoryProfileSource {
    async fn current_profile(&self) -> Result<String, LookupError> {
        self.profile.lock().clone()
    }
}

/// Active revision source backed by a list of node statuses
#[derive(Debug, Default)]
pub struct InMemoryRevisionSource {
    statuses: Mutex<Vec<NodeStatus>>,
    failure: Mutex<Option<LookupError>>,
}

impl InMemoryRevisionSource {
    pub fn new(statuses: Vec<NodeStatus>) -> Self {
        Self {
            statuses: Mutex::new(statuses),
            failure: Mutex::new(None),
        }
    }

    pub fn set(&self, statuses: Vec<NodeStatus>) {
        *self.statuses.lock() = statuses;
    }

    pub fn fail(&self, err: LookupError) {
        *self.failure.lock() = Some(err);
    }
}

#[async_trait::async_trait]
impl ActiveRevisionSource for InMemoryRevisionSource {
    async fn node_statuses(&self) -> Result<Vec<NodeStatus>, LookupError> {
        if let Some(err) = self.failure.lock().clone() {
            return Err(err);
        }
        Ok(self.statuses.lock().clone())
    }
}

/// Snapshot store keyed by revision, counting fetches
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    snapshots: Mutex<BTreeMap<RevisionId, Snapshot>>,
    fetches: AtomicUsize,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, snapshot: Snapshot) -> Self {
        self.insert(snapshot);
        self
    }

    pub fn insert(&self, snapshot: Snapshot) {
        self.snapshots.lock().insert(snapshot.revision, snapshot);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SnapshotSource for InMemorySnapshotStore {
    async fn snapshot(&self, revision: RevisionId) -> Result<Snapshot, LookupError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.snapshots
            .lock()
            .get(&revision)
            .cloned()
            .ok_or_else(|| LookupError::NotFound(snapshot_name("config", revision)))
    }
}

/// Status sink that records every write
#[derive(Debug, Default)]
pub struct RecordingStatusSink {
    writes: Mutex<Vec<ConditionSet>>,
    failure: Mutex<Option<SinkError>>,
}

impl RecordingStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following write fail
    pub fn fail_writes(&self, err: SinkError) {
        *self.failure.lock() = Some(err);
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().len()
    }

    pub fn last(&self) -> Option<ConditionSet> {
        self.writes.lock().last().cloned()
    }
}

#[async_trait::async_trait]
impl StatusSink for RecordingStatusSink {
    async fn last_published(&self) -> Result<Option<ConditionSet>, SinkError> {
        Ok(self.last())
    }

    async fn write(&self, conditions: &ConditionSet) -> Result<(), SinkError> {
        if let Some(err) = self.failure.lock().clone() {
            return Err(err);
        }
        self.writes.lock().push(conditions.clone());
        Ok(())
    }
}

/// Snapshot whose rendered document carries the given server arguments
pub fn rendered_snapshot(revision: RevisionId, arguments: &[(&str, &[&str])]) -> Snapshot {
    let container: serde_json::Map<String, serde_json::Value> = arguments
        .iter()
        .map(|(name, values)| ((*name).to_string(), serde_json::json!(values)))
        .collect();
    let mut root = serde_json::Map::new();
    root.insert(ARGUMENT_CONTAINER.to_string(), container.into());
    let document = ConfigDocument::from_value(root.into()).expect("object root");
    Snapshot::rendered(revision, snapshot_name("config", revision), DATA_KEY, &document)
}

/// Snapshot rendered with the arguments of `profile` from the default table
pub fn profile_snapshot(revision: RevisionId, profile: Profile) -> Snapshot {
    let table = ProfileTable::default();
    let values: Vec<(&str, String)> = TrackedParameter::ALL
        .iter()
        .filter_map(|p| table.value(profile, *p).map(|v| (p.argument(), v)))
        .collect();
    let arguments: Vec<(&str, [&str; 1])> = values
        .iter()
        .map(|(name, value)| (*name, [value.as_str()]))
        .collect();
    let borrowed: Vec<(&str, &[&str])> = arguments
        .iter()
        .map(|(name, value)| (*name, value.as_slice()))
        .collect();
    rendered_snapshot(revision, &borrowed)
}

/// One node status per revision, named `master-<index>`
pub fn node_statuses(revisions: &[RevisionId]) -> Vec<NodeStatus> {
    revisions
        .iter()
        .enumerate()
        .map(|(i, rev)| NodeStatus::new(format!("master-{i}"), *rev))
        .collect()
}

/// In-memory providers wired into a controller
#[derive(Debug, Clone)]
pub struct TestCluster {
    pub profiles: Arc<InMemoryProfileSource>,
    pub revisions: Arc<InMemoryRevisionSource>,
    pub snapshots: Arc<InMemorySnapshotStore>,
    pub status: Arc<RecordingStatusSink>,
}

impl TestCluster {
    pub fn new(raw_profile: &str, revisions: &[RevisionId]) -> Self {
        Self {
            profiles: Arc::new(InMemoryProfileSource::new(raw_profile)),
            revisions: Arc::new(InMemoryRevisionSource::new(node_statuses(revisions))),
            snapshots: Arc::new(InMemorySnapshotStore::new()),
            status: Arc::new(RecordingStatusSink::new()),
        }
    }

    pub fn with_snapshot(self, snapshot: Snapshot) -> Self {
        self.snapshots.insert(snapshot);
        self
    }

    pub fn controller(&self) -> LatencyProfileController {
        LatencyProfileController::new(
            ReconcilerConfig::default(),
            self.profiles.clone(),
            self.revisions.clone(),
            self.snapshots.clone(),
            self.status.clone(),
        )
    }
}
