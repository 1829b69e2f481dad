//! Revision matching
//!
//! Decides whether every active revision's rendered snapshot already carries
//! the desired server arguments. This is the single source of truth for
//! "has the rollout converged".
//!
//! Matching rules, per desired `(name, value)`:
//! - argument absent from the snapshot: not converged
//! - first element differs from `value`: not converged
//! - argument present with an empty sequence: does not disprove a match
//!
//! Only the first element of an argument sequence is significant.

use crate::error::{MatchError, SnapshotError};
use crate::profile::ParameterSet;
use crate::providers::SnapshotSource;
use crate::types::{unique_revisions, RevisionId, Snapshot};
use lpc_document::{type_name, ConfigPath};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Server arguments decoded from a snapshot: name → ordered values
pub type ArgumentMap = BTreeMap<String, Vec<String>>;

/// Where rendered arguments live inside a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotLayout {
    /// Data key holding the rendered document
    pub data_key: String,
    /// Top-level document key holding the argument map
    pub argument_container: String,
}

impl Default for SnapshotLayout {
    fn default() -> Self {
        Self {
            data_key: "config.yaml".to_string(),
            argument_container: "apiServerArguments".to_string(),
        }
    }
}

/// Decode the argument map of a snapshot
///
/// A document without the argument container has no arguments. A `null`
/// argument value decodes as an empty sequence.
///
/// # Errors
/// Returns [`SnapshotError`] if the document is missing or malformed, or if
/// any argument is not a sequence of strings.
pub fn decode_arguments(
    snapshot: &Snapshot,
    layout: &SnapshotLayout,
) -> Result<ArgumentMap, SnapshotError> {
    let document = snapshot.document(&layout.data_key)?;
    let container = ConfigPath::single(layout.argument_container.as_str());
    let invalid = |argument: &str, reason: String| SnapshotError::InvalidArgument {
        snapshot: snapshot.name.clone(),
        argument: argument.to_string(),
        reason,
    };

    let entries = match document.get(&container) {
        Ok(None | Some(Value::Null)) => return Ok(ArgumentMap::new()),
        Ok(Some(Value::Object(entries))) => entries,
        Ok(Some(other)) => {
            return Err(invalid(
                layout.argument_container.as_str(),
                format!("expected object, found {}", type_name(other)),
            ))
        }
        Err(source) => {
            return Err(SnapshotError::Decode {
                snapshot: snapshot.name.clone(),
                source,
            })
        }
    };

    entries
        .iter()
        .map(|(name, value)| -> Result<(String, Vec<String>), SnapshotError> {
            let values = match value {
                Value::Null => Vec::new(),
                Value::Array(items) => items
                    .iter()
                    .map(|item| {
                        item.as_str().map(str::to_string).ok_or_else(|| {
                            invalid(
                                name.as_str(),
                                format!("expected string element, found {}", type_name(item)),
                            )
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                other => {
                    return Err(invalid(
                        name.as_str(),
                        format!("expected string sequence, found {}", type_name(other)),
                    ))
                }
            };
            Ok((name.clone(), values))
        })
        .collect()
}

/// Why a revision does not carry the desired arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    /// Argument not rendered at all
    Missing { argument: String },
    /// Argument rendered with a different first value
    Differs {
        argument: String,
        expected: String,
        found: String,
    },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { argument } => write!(f, "{argument} is missing"),
            Self::Differs {
                argument,
                expected,
                found,
            } => write!(f, "{argument} is {found:?}, want {expected:?}"),
        }
    }
}

/// Compare desired parameters against one snapshot's arguments
///
/// Returns the first mismatch in parameter-name order, or `None` if the
/// arguments carry every desired value.
#[must_use]
pub fn compare_arguments(desired: &ParameterSet, arguments: &ArgumentMap) -> Option<Mismatch> {
    for (name, expected) in desired.iter() {
        let Some(values) = arguments.get(name) else {
            return Some(Mismatch::Missing {
                argument: name.to_string(),
            });
        };
        match values.first() {
            // empty sequence: legacy state, keep checking the other arguments
            None => {}
            Some(found) if found != expected => {
                return Some(Mismatch::Differs {
                    argument: name.to_string(),
                    expected: expected.to_string(),
                    found: found.clone(),
                })
            }
            Some(_) => {}
        }
    }
    None
}

/// Result of checking all active revisions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Every active revision carries the desired arguments
    Converged { revisions_checked: usize },
    /// First revision found lagging behind
    Lagging {
        revision: RevisionId,
        mismatch: Mismatch,
    },
}

impl MatchOutcome {
    #[inline]
    #[must_use]
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged { .. })
    }
}

/// Matches desired parameters against the snapshots of active revisions
pub struct RevisionMatcher<'a> {
    snapshots: &'a dyn SnapshotSource,
    layout: &'a SnapshotLayout,
}

impl<'a> RevisionMatcher<'a> {
    #[inline]
    #[must_use]
    pub fn new(snapshots: &'a dyn SnapshotSource, layout: &'a SnapshotLayout) -> Self {
        Self { snapshots, layout }
    }

    /// Check whether every active revision has converged
    ///
    /// # Errors
    /// See [`Self::evaluate`].
    pub async fn matches(
        &self,
        desired: &ParameterSet,
        active_revisions: &[RevisionId],
    ) -> Result<bool, MatchError> {
        Ok(self.evaluate(desired, active_revisions).await?.is_converged())
    }

    /// Check active revisions and report the first lagging one
    ///
    /// Repeated revision ids are checked once. Stops at the first revision
    /// that does not match.
    ///
    /// # Errors
    /// A snapshot that cannot be fetched (including not-found) or decoded
    /// aborts the whole check: it means the view of the cluster is
    /// inconsistent, not that the rollout is in progress.
    pub async fn evaluate(
        &self,
        desired: &ParameterSet,
        active_revisions: &[RevisionId],
    ) -> Result<MatchOutcome, MatchError> {
        let revisions = unique_revisions(active_revisions.iter().copied());

        for &revision in &revisions {
            let snapshot = self
                .snapshots
                .snapshot(revision)
                .await
                .map_err(|source| MatchError::Lookup { revision, source })?;
            let arguments = decode_arguments(&snapshot, self.layout)?;

            if let Some(mismatch) = compare_arguments(desired, &arguments) {
                tracing::debug!(revision, %mismatch, "revision has not converged");
                return Ok(MatchOutcome::Lagging { revision, mismatch });
            }
            tracing::debug!(revision, "revision carries desired arguments");
        }

        Ok(MatchOutcome::Converged {
            revisions_checked: revisions.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupError;
    use crate::profile::{NOT_READY_TOLERATION_ARGUMENT, UNREACHABLE_TOLERATION_ARGUMENT};
    use crate::providers::MockSnapshotSource;
    use lpc_document::ConfigDocument;
    use mockall::predicate::eq;
    use serde_json::json;

    fn snapshot(revision: RevisionId, rendered: Value) -> Snapshot {
        let doc = ConfigDocument::from_value(rendered).unwrap();
        Snapshot::rendered(revision, format!("config-{revision}"), "config.yaml", &doc)
    }

    fn desired(value: &str) -> ParameterSet {
        ParameterSet::new()
            .with(NOT_READY_TOLERATION_ARGUMENT, value)
            .with(UNREACHABLE_TOLERATION_ARGUMENT, value)
    }

    fn args(pairs: &[(&str, &[&str])]) -> ArgumentMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.iter().map(|s| (*s).to_string()).collect()))
            .collect()
    }

    #[test]
    fn compare_missing_argument() {
        let arguments = args(&[("default-watch-cache-size", &["100"])]);
        let want = ParameterSet::new().with(NOT_READY_TOLERATION_ARGUMENT, "300");
        assert_eq!(
            compare_arguments(&want, &arguments),
            Some(Mismatch::Missing {
                argument: NOT_READY_TOLERATION_ARGUMENT.to_string()
            })
        );
    }

    #[test]
    fn compare_matching_argument_among_others() {
        let arguments = args(&[
            (NOT_READY_TOLERATION_ARGUMENT, &["60"]),
            ("default-watch-cache-size", &["100"]),
        ]);
        let want = ParameterSet::new().with(NOT_READY_TOLERATION_ARGUMENT, "60");
        assert_eq!(compare_arguments(&want, &arguments), None);
    }

    #[test]
    fn compare_different_value() {
        let arguments = args(&[
            (NOT_READY_TOLERATION_ARGUMENT, &["300"]),
            (UNREACHABLE_TOLERATION_ARGUMENT, &["300"]),
        ]);
        let want = ParameterSet::new().with(NOT_READY_TOLERATION_ARGUMENT, "40");
        assert!(matches!(
            compare_arguments(&want, &arguments),
            Some(Mismatch::Differs { ref found, .. }) if found == "300"
        ));
    }

    #[test]
    fn compare_only_first_element_counts() {
        let want = ParameterSet::new().with(NOT_READY_TOLERATION_ARGUMENT, "60");
        let first = args(&[(NOT_READY_TOLERATION_ARGUMENT, &["60", "300"])]);
        let second = args(&[(NOT_READY_TOLERATION_ARGUMENT, &["300", "60"])]);
        assert_eq!(compare_arguments(&want, &first), None);
        assert!(compare_arguments(&want, &second).is_some());
    }

    #[test]
    fn compare_empty_sequence_does_not_disprove_match() {
        let want = desired("60");
        let arguments = args(&[
            (NOT_READY_TOLERATION_ARGUMENT, &[]),
            (UNREACHABLE_TOLERATION_ARGUMENT, &["60"]),
        ]);
        assert_eq!(compare_arguments(&want, &arguments), None);

        let lagging = args(&[
            (NOT_READY_TOLERATION_ARGUMENT, &[]),
            (UNREACHABLE_TOLERATION_ARGUMENT, &["300"]),
        ]);
        assert!(compare_arguments(&want, &lagging).is_some());
    }

    #[test]
    fn decode_handles_absent_container_and_null_values() {
        let layout = SnapshotLayout::default();
        let empty = snapshot(1, json!({"servingInfo": {}}));
        assert!(decode_arguments(&empty, &layout).unwrap().is_empty());

        let nulls = snapshot(2, json!({"apiServerArguments": {"a": null, "b": ["1"]}}));
        assert_eq!(
            decode_arguments(&nulls, &layout).unwrap(),
            args(&[("a", &[]), ("b", &["1"])])
        );
    }

    #[test]
    fn decode_rejects_malformed_arguments() {
        let layout = SnapshotLayout::default();
        let scalar = snapshot(1, json!({"apiServerArguments": {"a": "60"}}));
        assert!(matches!(
            decode_arguments(&scalar, &layout),
            Err(SnapshotError::InvalidArgument { ref argument, .. }) if argument == "a"
        ));

        let container = snapshot(2, json!({"apiServerArguments": ["a"]}));
        assert!(decode_arguments(&container, &layout).is_err());
    }

    #[tokio::test]
    async fn matcher_dedupes_and_short_circuits() {
        let mut source = MockSnapshotSource::new();
        source
            .expect_snapshot()
            .with(eq(1))
            .times(1)
            .returning(|r| Ok(snapshot(r, json!({"apiServerArguments": {
                "default-not-ready-toleration-seconds": ["60"],
                "default-unreachable-toleration-seconds": ["60"],
            }}))));
        source
            .expect_snapshot()
            .with(eq(2))
            .times(1)
            .returning(|r| Ok(snapshot(r, json!({"apiServerArguments": {
                "default-not-ready-toleration-seconds": ["60"],
            }}))));
        // revision 3 is never fetched because revision 2 already lags

        let layout = SnapshotLayout::default();
        let matcher = RevisionMatcher::new(&source, &layout);
        let outcome = matcher.evaluate(&desired("60"), &[1, 1, 2, 3]).await.unwrap();

        assert_eq!(
            outcome,
            MatchOutcome::Lagging {
                revision: 2,
                mismatch: Mismatch::Missing {
                    argument: UNREACHABLE_TOLERATION_ARGUMENT.to_string()
                },
            }
        );
    }

    #[tokio::test]
    async fn matcher_errors_when_snapshot_missing() {
        let mut source = MockSnapshotSource::new();
        source
            .expect_snapshot()
            .returning(|r| Err(LookupError::NotFound(format!("config-{r}"))));

        let layout = SnapshotLayout::default();
        let matcher = RevisionMatcher::new(&source, &layout);
        let err = matcher.matches(&desired("60"), &[4]).await.unwrap_err();
        assert!(matches!(err, MatchError::Lookup { revision: 4, .. }));
    }

    #[tokio::test]
    async fn matcher_with_no_revisions_is_converged() {
        let source = MockSnapshotSource::new();
        let layout = SnapshotLayout::default();
        let matcher = RevisionMatcher::new(&source, &layout);
        assert!(matcher.matches(&desired("300"), &[]).await.unwrap());
    }

    #[tokio::test]
    async fn matcher_is_deterministic() {
        let mut source = MockSnapshotSource::new();
        source.expect_snapshot().times(2).returning(|r| {
            Ok(snapshot(r, json!({"apiServerArguments": {
                "default-not-ready-toleration-seconds": ["300"],
                "default-unreachable-toleration-seconds": ["300"],
            }})))
        });

        let layout = SnapshotLayout::default();
        let matcher = RevisionMatcher::new(&source, &layout);
        let first = matcher.evaluate(&desired("300"), &[9]).await.unwrap();
        let second = matcher.evaluate(&desired("300"), &[9]).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first, MatchOutcome::Converged { revisions_checked: 1 });
    }
}
