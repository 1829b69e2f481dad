//! Observer steps
//!
//! One step per tracked path. A step reads its own inputs, compares them
//! against the existing document and returns a patch for its path only.

use crate::error::StepError;
use crate::observe::observe;
use lpc_core::{Profile, ProfileSource, ProfileTable, TrackedParameter};
use lpc_document::{ConfigDocument, ConfigPath};
use std::sync::Arc;

/// Config-generation hook for one tracked path
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ObserverStep: Send + Sync {
    /// Path this step writes
    fn path(&self) -> &ConfigPath;

    /// Patch for [`Self::path`], empty when nothing needs to change
    async fn observe(&self, existing: &ConfigDocument) -> Result<ConfigDocument, StepError>;
}

/// Observes one toleration argument from the cluster latency profile
pub struct LatencyProfileObserver {
    profiles: Arc<dyn ProfileSource>,
    parameter: TrackedParameter,
    table: ProfileTable,
    path: ConfigPath,
}

impl std::fmt::Debug for LatencyProfileObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LatencyProfileObserver")
            .field("parameter", &self.parameter)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl LatencyProfileObserver {
    /// Observer for `parameter` under the `container` key
    #[must_use]
    pub fn new(
        profiles: Arc<dyn ProfileSource>,
        parameter: TrackedParameter,
        container: &str,
    ) -> Self {
        Self {
            profiles,
            parameter,
            table: ProfileTable::default(),
            path: parameter.path(container),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_table(mut self, table: ProfileTable) -> Self {
        self.table = table;
        self
    }

    #[inline]
    #[must_use]
    pub fn parameter(&self) -> TrackedParameter {
        self.parameter
    }
}

#[async_trait::async_trait]
impl ObserverStep for LatencyProfileObserver {
    fn path(&self) -> &ConfigPath {
        &self.path
    }

    async fn observe(&self, existing: &ConfigDocument) -> Result<ConfigDocument, StepError> {
        let raw = match self.profiles.current_profile().await {
            Ok(raw) => raw,
            Err(err) if err.is_not_found() => return Ok(ConfigDocument::new()),
            Err(err) => return Err(StepError::Lookup(err)),
        };

        let profile: Profile = raw.parse()?;
        let Some(desired) = self.table.value(profile, self.parameter) else {
            // unset profile leaves the existing value alone
            return Ok(ConfigDocument::new());
        };
        observe(&self.path, &desired, existing).map_err(StepError::from)
    }
}
