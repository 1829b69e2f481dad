//! Observation runs over the default latency profile pipeline

use lpc_core::{
    compare_arguments, decode_arguments, ProfileSource, ProfileTable, Snapshot, SnapshotLayout,
};
use lpc_document::ConfigDocument;
use lpc_observer::{latency_profile_pipeline, ObservationPipeline, StepError};
use lpc_test_utils::InMemoryProfileSource;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn pipeline(source: InMemoryProfileSource) -> (Arc<InMemoryProfileSource>, ObservationPipeline) {
    let source = Arc::new(source);
    let profiles: Arc<dyn ProfileSource> = source.clone();
    let pipeline = latency_profile_pipeline(&profiles, ProfileTable::default(), "apiServerArguments");
    (source, pipeline)
}

fn doc(value: serde_json::Value) -> ConfigDocument {
    ConfigDocument::from_value(value).unwrap()
}

#[tokio::test]
async fn unset_profile_changes_nothing() {
    let (_, pipeline) = pipeline(InMemoryProfileSource::new(""));
    let existing = doc(json!({"apiServerArguments": {
        "default-not-ready-toleration-seconds": ["30"],
    }}));

    let observation = pipeline.run(&existing).await;
    assert!(observation.is_clean());
    assert!(!observation.has_changes());
}

#[tokio::test]
async fn default_profile_fills_both_arguments() {
    let (_, pipeline) = pipeline(InMemoryProfileSource::new("Default"));
    let observation = pipeline.run(&doc(json!({"servingInfo": {"port": 6443}}))).await;

    assert!(observation.is_clean());
    assert_eq!(
        observation.patch.into_value(),
        json!({"apiServerArguments": {
            "default-not-ready-toleration-seconds": ["300"],
            "default-unreachable-toleration-seconds": ["300"],
        }})
    );
}

#[tokio::test]
async fn merged_observation_settles() {
    let (source, pipeline) = pipeline(InMemoryProfileSource::new("Default"));
    let mut existing = doc(json!({"apiServerArguments": {"feature-gates": ["A=true"]}}));

    existing.merge(&pipeline.run(&existing).await.patch);
    assert!(!pipeline.run(&existing).await.has_changes());

    source.set("LowUpdateSlowReaction");
    let switched = pipeline.run(&existing).await;
    assert_eq!(
        switched.patch.into_value(),
        json!({"apiServerArguments": {
            "default-not-ready-toleration-seconds": ["60"],
            "default-unreachable-toleration-seconds": ["60"],
        }})
    );
}

#[tokio::test]
async fn malformed_argument_is_skipped() {
    let (_, pipeline) = pipeline(InMemoryProfileSource::new("Medium"));
    let existing = doc(json!({"apiServerArguments": {
        "default-not-ready-toleration-seconds": "60",
    }}));

    let observation = pipeline.run(&existing).await;
    assert_eq!(observation.failures.len(), 1);
    assert!(matches!(observation.failures[0].error, StepError::Observe(_)));
    assert_eq!(
        observation.patch.into_value(),
        json!({"apiServerArguments": {"default-unreachable-toleration-seconds": ["60"]}})
    );
}

#[tokio::test]
async fn unknown_profile_fails_every_step() {
    let (_, pipeline) = pipeline(InMemoryProfileSource::new("Unknown"));
    let observation = pipeline.run(&ConfigDocument::new()).await;

    assert_eq!(observation.failures.len(), 2);
    assert!(!observation.has_changes());
}

#[tokio::test]
async fn observer_and_matcher_agree_on_padded_values() {
    let (_, pipeline) = pipeline(InMemoryProfileSource::new("Medium"));
    let layout = SnapshotLayout::default();
    let desired = ProfileTable::default().resolve("Medium").unwrap();
    let mut existing = doc(json!({"apiServerArguments": {
        "default-not-ready-toleration-seconds": [" 60 "],
        "default-unreachable-toleration-seconds": ["60"],
    }}));

    let lagging = Snapshot::rendered(1, "config-1", &layout.data_key, &existing);
    let arguments = decode_arguments(&lagging, &layout).unwrap();
    assert!(compare_arguments(&desired, &arguments).is_some());

    let observation = pipeline.run(&existing).await;
    assert_eq!(
        observation.patch.clone().into_value(),
        json!({"apiServerArguments": {"default-not-ready-toleration-seconds": ["60"]}})
    );

    existing.merge(&observation.patch);
    let rendered = Snapshot::rendered(2, "config-2", &layout.data_key, &existing);
    let arguments = decode_arguments(&rendered, &layout).unwrap();
    assert_eq!(compare_arguments(&desired, &arguments), None);
    assert!(!pipeline.run(&existing).await.has_changes());
}
