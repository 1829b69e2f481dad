//! External collaborators
//!
//! The reconciler never talks to a store directly. Each provider is a
//! concrete accessor injected at construction time; implement these traits
//! to back a pass with a real cluster, files, or in-memory fixtures.

use crate::error::{LookupError, SinkError};
use crate::status::ConditionSet;
use crate::types::{NodeStatus, RevisionId, Snapshot};

/// Source of the cluster-wide latency profile
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ProfileSource: Send + Sync {
    /// Raw profile value of the singleton target
    ///
    /// Returns [`LookupError::NotFound`] when the target does not exist.
    async fn current_profile(&self) -> Result<String, LookupError>;
}

/// Source of the revisions currently running
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ActiveRevisionSource: Send + Sync {
    /// Per-instance revision status; may contain repeated revisions
    async fn node_statuses(&self) -> Result<Vec<NodeStatus>, LookupError>;
}

/// Lookup of rendered snapshots by revision
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Snapshot rendered for `revision`
    async fn snapshot(&self, revision: RevisionId) -> Result<Snapshot, LookupError>;
}

/// Destination for published conditions
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait StatusSink: Send + Sync {
    /// Conditions written by the last successful publish, if any
    async fn last_published(&self) -> Result<Option<ConditionSet>, SinkError>;

    /// Replace the published conditions
    async fn write(&self, conditions: &ConditionSet) -> Result<(), SinkError>;
}
