//! File-backed cluster state
//!
//! A single JSON or YAML file stands in for the cluster: the profile target,
//! node revision statuses, rendered snapshots and the published status. The
//! file is re-read on every lookup so edits show up on the next pass.

use lpc_core::{
    snapshot_name, ActiveRevisionSource, ConditionSet, LookupError, NodeStatus, ProfileSource,
    RevisionId, SinkError, Snapshot, SnapshotSource, StatusSink,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name reported when the profile target is absent
pub const PROFILE_TARGET: &str = "node.config/cluster";

/// Snapshot name prefix used unless configured otherwise
pub const DEFAULT_SNAPSHOT_PREFIX: &str = "config";

/// Contents of a state file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterState {
    /// Raw latency profile; absent means the profile target does not exist
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default)]
    pub node_statuses: Vec<NodeStatus>,
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,
    /// Conditions written by the last publish
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ConditionSet>,
}

/// Serialization format, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateFormat {
    Json,
    Yaml,
}

impl StateFormat {
    /// Format for a path
    ///
    /// # Errors
    /// Returns [`StateError::UnsupportedFormat`] for anything but
    /// `.json`, `.yaml` and `.yml`.
    pub fn from_path(path: &Path) -> Result<Self, StateError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            _ => Err(StateError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// State file errors
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("unsupported state file format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON state: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML state: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Cluster state stored in one file
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
    format: StateFormat,
    snapshot_prefix: String,
}

impl StateFile {
    /// Open a state file; the file itself is read lazily
    ///
    /// # Errors
    /// Returns [`StateError::UnsupportedFormat`] for unknown extensions.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StateError> {
        let path = path.into();
        let format = StateFormat::from_path(&path)?;
        Ok(Self {
            path,
            format,
            snapshot_prefix: DEFAULT_SNAPSHOT_PREFIX.to_string(),
        })
    }

    /// Look snapshots up as `<prefix>-<revision>`
    #[inline]
    #[must_use]
    pub fn with_snapshot_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.snapshot_prefix = prefix.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and decode the file
    ///
    /// # Errors
    /// I/O and decode failures.
    pub async fn load(&self) -> Result<ClusterState, StateError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| StateError::Io {
                path: self.path.clone(),
                source,
            })?;
        Ok(match self.format {
            StateFormat::Json => serde_json::from_str(&text)?,
            StateFormat::Yaml => serde_yaml::from_str(&text)?,
        })
    }

    /// Encode and write the file
    ///
    /// # Errors
    /// I/O and encode failures.
    pub async fn save(&self, state: &ClusterState) -> Result<(), StateError> {
        let text = match self.format {
            StateFormat::Json => serde_json::to_string_pretty(state)?,
            StateFormat::Yaml => serde_yaml::to_string(state)?,
        };
        tokio::fs::write(&self.path, text)
            .await
            .map_err(|source| StateError::Io {
                path: self.path.clone(),
                source,
            })
    }

    async fn load_for_lookup(&self) -> Result<ClusterState, LookupError> {
        self.load()
            .await
            .map_err(|err| LookupError::Unavailable(err.to_string()))
    }
}

#[async_trait::async_trait]
impl ProfileSource for StateFile {
    async fn current_profile(&self) -> Result<String, LookupError> {
        self.load_for_lookup()
            .await?
            .profile
            .ok_or_else(|| LookupError::NotFound(PROFILE_TARGET.to_string()))
    }
}

#[async_trait::async_trait]
impl ActiveRevisionSource for StateFile {
    async fn node_statuses(&self) -> Result<Vec<NodeStatus>, LookupError> {
        Ok(self.load_for_lookup().await?.node_statuses)
    }
}

#[async_trait::async_trait]
impl SnapshotSource for StateFile {
    async fn snapshot(&self, revision: RevisionId) -> Result<Snapshot, LookupError> {
        let name = snapshot_name(&self.snapshot_prefix, revision);
        self.load_for_lookup()
            .await?
            .snapshots
            .into_iter()
            .find(|s| s.name == name)
            .ok_or(LookupError::NotFound(name))
    }
}

#[async_trait::async_trait]
impl StatusSink for StateFile {
    async fn last_published(&self) -> Result<Option<ConditionSet>, SinkError> {
        self.load()
            .await
            .map(|state| state.status)
            .map_err(|err| SinkError::Unavailable(err.to_string()))
    }

    async fn write(&self, conditions: &ConditionSet) -> Result<(), SinkError> {
        let mut state = self
            .load()
            .await
            .map_err(|err| SinkError::Unavailable(err.to_string()))?;
        state.status = Some(conditions.clone());
        self.save(&state)
            .await
            .map_err(|err| SinkError::Rejected(err.to_string()))
    }
}
