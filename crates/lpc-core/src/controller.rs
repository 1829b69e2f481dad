//! Latency profile controller
//!
//! Runs one reconciliation pass at a time:
//! 1. Read the raw profile (absent target: nothing to do)
//! 2. Resolve it against the profile table (unset: short-circuit)
//! 3. Check every active revision's snapshot for the desired arguments
//! 4. Derive the condition triple and publish it if it changed
//!
//! A pass holds no state between calls. The caller serialises passes and
//! decides when to retry.

use crate::config::ReconcilerConfig;
use crate::error::{ReconcileError, ReconcileResult};
use crate::matcher::{MatchOutcome, RevisionMatcher, SnapshotLayout};
use crate::profile::{Profile, ProfileTable};
use crate::providers::{ActiveRevisionSource, ProfileSource, SnapshotSource, StatusSink};
use crate::status::{ConditionSet, RolloutState, StatusAggregator};
use crate::types::active_revisions;
use std::sync::Arc;

/// Result of a completed pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Profile target does not exist; nothing was read or published
    ProfileNotFound,
    /// Status was derived and published if it changed
    Reconciled(SyncReport),
}

impl SyncOutcome {
    /// Report of a reconciled pass
    #[inline]
    #[must_use]
    pub fn report(&self) -> Option<&SyncReport> {
        match self {
            Self::ProfileNotFound => None,
            Self::Reconciled(report) => Some(report),
        }
    }
}

/// Details of a reconciled pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Profile the pass reconciled
    pub profile: Profile,
    /// Derived rollout state
    pub state: RolloutState,
    /// Revision match result; `None` when the profile is unset
    pub outcome: Option<MatchOutcome>,
    /// Conditions in effect at the primary sink
    pub conditions: ConditionSet,
    /// Whether the primary sink was written
    pub written: bool,
}

/// Reconciles the cluster latency profile against active revisions
pub struct LatencyProfileController {
    config: ReconcilerConfig,
    layout: SnapshotLayout,
    table: ProfileTable,
    aggregator: StatusAggregator,
    profiles: Arc<dyn ProfileSource>,
    revisions: Arc<dyn ActiveRevisionSource>,
    snapshots: Arc<dyn SnapshotSource>,
    status: Arc<dyn StatusSink>,
    mirror: Option<Arc<dyn StatusSink>>,
}

impl std::fmt::Debug for LatencyProfileController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LatencyProfileController")
            .field("config", &self.config)
            .field("table", &self.table)
            .field("mirror", &self.mirror.is_some())
            .finish_non_exhaustive()
    }
}

impl LatencyProfileController {
    /// Create a controller over injected providers
    #[must_use]
    pub fn new(
        config: ReconcilerConfig,
        profiles: Arc<dyn ProfileSource>,
        revisions: Arc<dyn ActiveRevisionSource>,
        snapshots: Arc<dyn SnapshotSource>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            layout: config.layout(),
            config,
            table: ProfileTable::default(),
            aggregator: StatusAggregator::new(),
            profiles,
            revisions,
            snapshots,
            status,
            mirror: None,
        }
    }

    /// Also publish to a best-effort mirror sink
    #[inline]
    #[must_use]
    pub fn with_mirror(mut self, mirror: Arc<dyn StatusSink>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// With a custom profile table
    #[inline]
    #[must_use]
    pub fn with_profile_table(mut self, table: ProfileTable) -> Self {
        self.table = table;
        self
    }

    /// With a custom status aggregator
    #[inline]
    #[must_use]
    pub fn with_aggregator(mut self, aggregator: StatusAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Run one reconciliation pass
    ///
    /// # Errors
    /// Any [`ReconcileError`] aborts the pass before the primary sink is
    /// written; the last published status stays in place.
    pub async fn sync(&self) -> ReconcileResult<SyncOutcome> {
        let result = self.reconcile().await;
        if let Err(err) = &result {
            tracing::error!(
                controller = %self.config.controller_name,
                error = %err,
                retryable = err.is_retryable(),
                "latency profile pass failed"
            );
        }
        result
    }

    async fn reconcile(&self) -> ReconcileResult<SyncOutcome> {
        let raw = match self.profiles.current_profile().await {
            Ok(raw) => raw,
            Err(err) if err.is_not_found() => {
                tracing::debug!(
                    controller = %self.config.controller_name,
                    "latency profile target not found, skipping pass"
                );
                return Ok(SyncOutcome::ProfileNotFound);
            }
            Err(err) => return Err(ReconcileError::ProfileLookup(err)),
        };

        let profile: Profile = raw.parse()?;
        let (state, outcome) = if profile.is_unset() {
            (RolloutState::ProfileEmpty, None)
        } else {
            let outcome = self.match_revisions(profile).await?;
            (RolloutState::from_match(outcome.is_converged()), Some(outcome))
        };

        let conditions = self.aggregator.derive(state);
        self.publish_mirror(&conditions).await;

        let published = self
            .aggregator
            .publish(self.status.as_ref(), conditions)
            .await?;
        if published.written {
            tracing::info!(
                controller = %self.config.controller_name,
                %profile,
                %state,
                "published latency profile status"
            );
        }

        Ok(SyncOutcome::Reconciled(SyncReport {
            profile,
            state,
            outcome,
            conditions: published.conditions,
            written: published.written,
        }))
    }

    async fn match_revisions(&self, profile: Profile) -> ReconcileResult<MatchOutcome> {
        let desired = self.table.parameters_for(profile);
        let statuses = self
            .revisions
            .node_statuses()
            .await
            .map_err(ReconcileError::RevisionLookup)?;
        let active = active_revisions(&statuses);
        tracing::debug!(%profile, revisions = ?active, "checking active revisions");

        let outcome = RevisionMatcher::new(self.snapshots.as_ref(), &self.layout)
            .evaluate(&desired, &active)
            .await?;
        if let MatchOutcome::Lagging { revision, mismatch } = &outcome {
            tracing::info!(revision, %mismatch, "revision still rolling out latency profile");
        }
        Ok(outcome)
    }

    async fn publish_mirror(&self, conditions: &ConditionSet) {
        let Some(mirror) = &self.mirror else {
            return;
        };
        if let Err(err) = self
            .aggregator
            .publish(mirror.as_ref(), conditions.clone())
            .await
        {
            tracing::warn!(error = %err, "failed to mirror latency profile status");
        }
    }
}
