//! Core types for the reconciler
//!
//! Defines the inputs a pass reads from external providers:
//! - Revisions and per-node revision status
//! - Rendered configuration snapshots

use crate::error::SnapshotError;
use indexmap::IndexSet;
use lpc_document::ConfigDocument;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Deployment revision identifier
pub type RevisionId = i32;

/// Revision currently running on one server instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    /// Node hosting the server instance
    pub node_name: String,
    /// Revision the instance is running
    pub current_revision: RevisionId,
}

impl NodeStatus {
    #[inline]
    #[must_use]
    pub fn new(node_name: impl Into<String>, current_revision: RevisionId) -> Self {
        Self {
            node_name: node_name.into(),
            current_revision,
        }
    }
}

/// Distinct revisions in first-seen order
#[must_use]
pub fn unique_revisions<I>(revisions: I) -> Vec<RevisionId>
where
    I: IntoIterator<Item = RevisionId>,
{
    revisions
        .into_iter()
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct revisions reported by a set of node statuses
#[must_use]
pub fn active_revisions(statuses: &[NodeStatus]) -> Vec<RevisionId> {
    unique_revisions(statuses.iter().map(|s| s.current_revision))
}

/// Name of the snapshot rendered for a revision, e.g. `config-3`
#[inline]
#[must_use]
pub fn snapshot_name(prefix: &str, revision: RevisionId) -> String {
    format!("{prefix}-{revision}")
}

/// Rendered configuration for one revision
///
/// Immutable once created. The rendered document is stored as JSON text
/// under a data key, next to any other rendered files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Revision the snapshot was rendered for
    pub revision: RevisionId,
    /// Snapshot object name
    pub name: String,
    /// Rendered files keyed by name
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl Snapshot {
    #[inline]
    #[must_use]
    pub fn new(revision: RevisionId, name: impl Into<String>, data: BTreeMap<String, String>) -> Self {
        Self {
            revision,
            name: name.into(),
            data,
        }
    }

    /// Snapshot holding `document` under `data_key`
    #[must_use]
    pub fn rendered(
        revision: RevisionId,
        name: impl Into<String>,
        data_key: &str,
        document: &ConfigDocument,
    ) -> Self {
        let mut data = BTreeMap::new();
        data.insert(data_key.to_string(), document.to_json());
        Self::new(revision, name, data)
    }

    /// Decode the rendered document stored under `data_key`
    ///
    /// # Errors
    /// - [`SnapshotError::MissingDataKey`] if the key is absent
    /// - [`SnapshotError::Decode`] if the text is not a JSON object
    pub fn document(&self, data_key: &str) -> Result<ConfigDocument, SnapshotError> {
        let text = self
            .data
            .get(data_key)
            .ok_or_else(|| SnapshotError::MissingDataKey {
                snapshot: self.name.clone(),
                key: data_key.to_string(),
            })?;
        ConfigDocument::from_json(text).map_err(|source| SnapshotError::Decode {
            snapshot: self.name.clone(),
            source,
        })
    }
}
