//! Latency profile reconciler
//!
//! Maps a cluster-wide latency profile to concrete server arguments, checks
//! that every active revision's rendered snapshot carries them, and
//! publishes an idempotent Degraded / Progressing / Completed status.
//!
//! # Core Concepts
//!
//! - [`ProfileTable`]: Profile to argument mapping
//! - [`RevisionMatcher`]: Convergence check across active revisions
//! - [`StatusAggregator`]: Condition derivation and idempotent publish
//! - [`LatencyProfileController`]: One reconciliation pass over injected providers
//!
//! # Example
//!
//! ```rust,ignore
//! use lpc_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     profiles: Arc<dyn ProfileSource>,
//! #     revisions: Arc<dyn ActiveRevisionSource>,
//! #     snapshots: Arc<dyn SnapshotSource>,
//! #     status: Arc<dyn StatusSink>,
//! # ) -> Result<(), ReconcileError> {
//! let controller = LatencyProfileController::new(
//!     ReconcilerConfig::default(),
//!     profiles,
//!     revisions,
//!     snapshots,
//!     status,
//! );
//!
//! if let Some(report) = controller.sync().await?.report() {
//!     println!("rollout {}", report.state);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod matcher;
pub mod profile;
pub mod providers;
pub mod status;
pub mod types;

pub use cache::CachedSnapshotSource;
pub use config::ReconcilerConfig;
pub use controller::{LatencyProfileController, SyncOutcome, SyncReport};
pub use error::{
    ConfigError, LookupError, MatchError, ProfileError, ReconcileError, ReconcileResult,
    SinkError, SnapshotError,
};
pub use matcher::{
    compare_arguments, decode_arguments, ArgumentMap, MatchOutcome, Mismatch, RevisionMatcher,
    SnapshotLayout,
};
pub use profile::{
    ParameterSet, Profile, ProfileTable, Tolerations, TrackedParameter,
    NOT_READY_TOLERATION_ARGUMENT, UNREACHABLE_TOLERATION_ARGUMENT,
};
pub use providers::{ActiveRevisionSource, ProfileSource, SnapshotSource, StatusSink};
pub use status::{
    Condition, ConditionSet, ConditionStatus, ConditionType, Published, RolloutState,
    StatusAggregator,
};
pub use types::{active_revisions, snapshot_name, unique_revisions, NodeStatus, RevisionId, Snapshot};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running reconciliation passes
    pub use crate::{
        ActiveRevisionSource, ConditionSet, LatencyProfileController, LookupError, Profile,
        ProfileSource, ProfileTable, ReconcileError, ReconcilerConfig, RolloutState,
        SinkError, Snapshot, SnapshotSource, StatusSink, SyncOutcome,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
