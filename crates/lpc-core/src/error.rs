//! Error types for the reconciler
//!
//! Provides error handling for:
//! - Profile resolution (unknown profile values)
//! - Provider lookups (profile, active revisions, snapshots)
//! - Snapshot decoding and revision matching
//! - Status publishing
//! - Configuration loading

use crate::types::RevisionId;
use lpc_document::DocumentError;

/// Profile resolution errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    /// Profile value outside the closed set of known profiles
    #[error("unknown latency profile found, profile = {0:?}")]
    UnknownProfile(String),
}

/// Errors reported by external lookups
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// The requested object does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// The backing store could not answer
    #[error("lookup failed: {0}")]
    Unavailable(String),
}

impl LookupError {
    /// Check if this is a not-found error
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Errors decoding a rendered snapshot
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Snapshot carries no rendered document under the expected key
    #[error("could not find {key} in snapshot {snapshot}")]
    MissingDataKey { snapshot: String, key: String },

    /// Rendered document is not a valid object
    #[error("invalid rendered config in snapshot {snapshot}: {source}")]
    Decode {
        snapshot: String,
        #[source]
        source: DocumentError,
    },

    /// Argument container has the wrong shape
    #[error("invalid argument {argument:?} in snapshot {snapshot}: {reason}")]
    InvalidArgument {
        snapshot: String,
        argument: String,
        reason: String,
    },
}

/// Revision matching errors
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// Snapshot for an active revision could not be fetched
    #[error("snapshot lookup for revision {revision} failed: {source}")]
    Lookup {
        revision: RevisionId,
        #[source]
        source: LookupError,
    },

    /// Snapshot could not be decoded
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Status publishing errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// Write was rejected (e.g. stale resource version)
    #[error("status write rejected: {0}")]
    Rejected(String),

    /// Status store could not be reached
    #[error("status store unavailable: {0}")]
    Unavailable(String),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A field holds an unusable value
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// Configuration text could not be parsed
    #[error("configuration parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Reconciliation pass error
///
/// Any of these aborts the pass before status is published.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Profile value could not be resolved
    #[error("profile error: {0}")]
    Profile(#[from] ProfileError),

    /// Profile source failed for a reason other than not-found
    #[error("profile lookup failed: {0}")]
    ProfileLookup(#[source] LookupError),

    /// Active revisions could not be listed
    #[error("active revision lookup failed: {0}")]
    RevisionLookup(#[source] LookupError),

    /// Revision matching failed
    #[error("revision matching failed: {0}")]
    Match(#[from] MatchError),

    /// Status could not be published
    #[error("status publish failed: {0}")]
    Publish(#[from] SinkError),
}

impl ReconcileError {
    /// Check if a later pass may succeed without operator action
    ///
    /// Unknown profiles signal version skew between the profile producer and
    /// this reconciler and will fail every pass until fixed.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Profile(_))
    }
}

/// Result type alias for reconcile operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;
