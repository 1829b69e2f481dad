//! Observation pipeline
//!
//! Runs registered observer steps against the same existing document,
//! prunes every patch to its step's path and merges the results. A failing
//! step is recorded and skipped; the other steps still contribute.

use crate::error::StepError;
use crate::step::{LatencyProfileObserver, ObserverStep};
use lpc_core::{ProfileSource, ProfileTable, TrackedParameter};
use lpc_document::{ConfigDocument, ConfigPath};
use std::sync::Arc;

/// Step that failed during a run
#[derive(Debug)]
pub struct StepFailure {
    pub path: ConfigPath,
    pub error: StepError,
}

/// Merged result of one pipeline run
#[derive(Debug, Default)]
pub struct Observation {
    /// Union of all step patches
    pub patch: ConfigDocument,
    /// Steps that contributed nothing because they failed
    pub failures: Vec<StepFailure>,
}

impl Observation {
    /// Check if every step succeeded
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Check if the patch changes anything
    #[inline]
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.patch.is_empty()
    }
}

/// Registry of observer steps
#[derive(Default)]
pub struct ObservationPipeline {
    steps: Vec<Box<dyn ObserverStep>>,
}

impl std::fmt::Debug for ObservationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservationPipeline")
            .field("paths", &self.paths())
            .finish()
    }
}

impl ObservationPipeline {
    /// Create empty pipeline
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step
    pub fn register<S: ObserverStep + 'static>(&mut self, step: S) {
        self.steps.push(Box::new(step));
    }

    /// Number of registered steps
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Paths written by the registered steps, in registration order
    #[must_use]
    pub fn paths(&self) -> Vec<&ConfigPath> {
        self.steps.iter().map(|s| s.path()).collect()
    }

    /// Run every step against `existing`
    pub async fn run(&self, existing: &ConfigDocument) -> Observation {
        let mut observation = Observation::default();

        for step in &self.steps {
            let path = step.path();
            match step.observe(existing).await {
                Ok(patch) => {
                    let pruned = patch.pruned(std::slice::from_ref(path));
                    if !pruned.is_empty() {
                        tracing::debug!(%path, "observed config change");
                    }
                    observation.patch.merge(&pruned);
                }
                Err(error) => {
                    tracing::warn!(%path, %error, "skipping observer step");
                    observation.failures.push(StepFailure {
                        path: path.clone(),
                        error,
                    });
                }
            }
        }

        observation
    }
}

/// Pipeline observing both toleration arguments under `container`
#[must_use]
pub fn latency_profile_pipeline(
    profiles: &Arc<dyn ProfileSource>,
    table: ProfileTable,
    container: &str,
) -> ObservationPipeline {
    let mut pipeline = ObservationPipeline::new();
    for parameter in TrackedParameter::ALL {
        pipeline.register(
            LatencyProfileObserver::new(Arc::clone(profiles), parameter, container).with_table(table),
        );
    }
    pipeline
}
