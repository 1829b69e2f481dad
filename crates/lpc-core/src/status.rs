//! Status conditions and idempotent publishing
//!
//! Each pass derives the full Degraded / Progressing / Completed triple from
//! the rollout state, then publishes it only if it differs from what was
//! last published.
//!
//! | State          | Degraded | Progressing | Completed | Reason                   |
//! |----------------|----------|-------------|-----------|--------------------------|
//! | `ProfileEmpty` | False    | False       | True      | `ProfileEmpty`           |
//! | `Complete`     | False    | False       | True      | `ProfileUpdated`         |
//! | `InProgress`   | False    | True        | False     | `ProfileUpdateTriggered` |

use crate::error::SinkError;
use crate::providers::StatusSink;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Condition reasons
pub mod reasons {
    /// Condition holds its expected value
    pub const AS_EXPECTED: &str = "AsExpected";
    /// No latency profile is set
    pub const PROFILE_EMPTY: &str = "ProfileEmpty";
    /// Every active revision carries the profile
    pub const PROFILE_UPDATED: &str = "ProfileUpdated";
    /// Some active revision still lags the profile
    pub const PROFILE_UPDATE_TRIGGERED: &str = "ProfileUpdateTriggered";
}

/// Condition messages
pub mod messages {
    /// Paired with [`super::reasons::PROFILE_EMPTY`]
    pub const PROFILE_EMPTY: &str = "latency profile not set on cluster";
    /// Paired with [`super::reasons::PROFILE_UPDATED`]
    pub const PROFILE_UPDATED: &str = "all server revisions have updated latency profile";
    /// Paired with [`super::reasons::PROFILE_UPDATE_TRIGGERED`]
    pub const PROFILE_UPDATE_TRIGGERED: &str = "server revisions are updating latency profile";
}

/// Axis of health a condition describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionType {
    /// The reconciler itself is failing
    Degraded,
    /// A rollout of the profile is underway
    Progressing,
    /// The profile has reached every active revision
    Completed,
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Tri-state condition status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionStatus {
    /// Condition holds
    True,
    /// Condition does not hold
    False,
    /// Not yet determined
    Unknown,
}

impl From<bool> for ConditionStatus {
    fn from(value: bool) -> Self {
        if value {
            Self::True
        } else {
            Self::False
        }
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One published status record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    pub status: ConditionStatus,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
    /// When `status` last changed; not part of the published state comparison
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
}

impl Condition {
    #[must_use]
    pub fn new(
        condition_type: ConditionType,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            condition_type,
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: None,
        }
    }

    /// Compare everything except the transition time
    #[inline]
    #[must_use]
    pub fn same_state(&self, other: &Condition) -> bool {
        self.condition_type == other.condition_type
            && self.status == other.status
            && self.reason == other.reason
            && self.message == other.message
    }

    #[inline]
    #[must_use]
    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }
}

/// Rollout status derived by a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RolloutState {
    /// No profile set; nothing to roll out
    ProfileEmpty,
    /// At least one active revision lags behind the profile
    InProgress,
    /// Every active revision carries the profile's arguments
    Complete,
}

impl RolloutState {
    /// State for a revision match result
    #[inline]
    #[must_use]
    pub fn from_match(converged: bool) -> Self {
        if converged {
            Self::Complete
        } else {
            Self::InProgress
        }
    }
}

impl fmt::Display for RolloutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The three conditions, always computed and published together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionSet {
    pub degraded: Condition,
    pub progressing: Condition,
    pub completed: Condition,
}

impl ConditionSet {
    /// Derive the full triple for a rollout state
    #[must_use]
    pub fn for_state(state: RolloutState) -> Self {
        use ConditionStatus::{False, True};
        use ConditionType::{Completed, Degraded, Progressing};

        match state {
            RolloutState::ProfileEmpty => Self {
                degraded: Condition::new(Degraded, False, reasons::AS_EXPECTED, ""),
                progressing: Condition::new(Progressing, False, reasons::AS_EXPECTED, ""),
                completed: Condition::new(
                    Completed,
                    True,
                    reasons::PROFILE_EMPTY,
                    messages::PROFILE_EMPTY,
                ),
            },
            RolloutState::Complete => Self {
                degraded: Condition::new(Degraded, False, reasons::PROFILE_UPDATED, ""),
                progressing: Condition::new(Progressing, False, reasons::PROFILE_UPDATED, ""),
                completed: Condition::new(
                    Completed,
                    True,
                    reasons::PROFILE_UPDATED,
                    messages::PROFILE_UPDATED,
                ),
            },
            RolloutState::InProgress => Self {
                degraded: Condition::new(Degraded, False, reasons::PROFILE_UPDATE_TRIGGERED, ""),
                progressing: Condition::new(
                    Progressing,
                    True,
                    reasons::PROFILE_UPDATE_TRIGGERED,
                    messages::PROFILE_UPDATE_TRIGGERED,
                ),
                completed: Condition::new(Completed, False, reasons::PROFILE_UPDATE_TRIGGERED, ""),
            },
        }
    }

    /// Conditions in publish order
    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        [&self.degraded, &self.progressing, &self.completed].into_iter()
    }

    /// Condition of the given type
    #[must_use]
    pub fn get(&self, condition_type: ConditionType) -> &Condition {
        match condition_type {
            ConditionType::Degraded => &self.degraded,
            ConditionType::Progressing => &self.progressing,
            ConditionType::Completed => &self.completed,
        }
    }

    /// Compare status, reason and message of all three conditions
    #[must_use]
    pub fn same_state(&self, other: &ConditionSet) -> bool {
        self.iter()
            .zip(other.iter())
            .all(|(a, b)| a.same_state(b))
    }

    /// Fill in transition times
    ///
    /// A condition whose status is unchanged from `previous` keeps its
    /// previous transition time; every other condition transitions at `now`.
    #[must_use]
    pub fn stamped(mut self, previous: Option<&ConditionSet>, now: DateTime<Utc>) -> Self {
        for condition in [&mut self.degraded, &mut self.progressing, &mut self.completed] {
            let carried = previous
                .map(|p| p.get(condition.condition_type))
                .filter(|p| p.status == condition.status)
                .and_then(|p| p.last_transition_time);
            condition.last_transition_time = Some(carried.unwrap_or(now));
        }
        self
    }
}

/// Result of a publish attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    /// Conditions now in effect at the sink
    pub conditions: ConditionSet,
    /// Whether a write was issued
    pub written: bool,
}

/// Derives and idempotently publishes condition sets
#[derive(Debug, Clone, Copy)]
pub struct StatusAggregator {
    clock: fn() -> DateTime<Utc>,
}

impl Default for StatusAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusAggregator {
    /// Aggregator using the wall clock for transition times
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { clock: Utc::now }
    }

    /// Aggregator with a custom clock
    #[inline]
    #[must_use]
    pub fn with_clock(clock: fn() -> DateTime<Utc>) -> Self {
        Self { clock }
    }

    /// Conditions for a rollout state
    #[inline]
    #[must_use]
    pub fn derive(&self, state: RolloutState) -> ConditionSet {
        ConditionSet::for_state(state)
    }

    /// Publish `desired` unless the sink already holds the same state
    ///
    /// # Errors
    /// Propagates sink read and write failures; nothing is written when the
    /// read fails.
    pub async fn publish(
        &self,
        sink: &dyn StatusSink,
        desired: ConditionSet,
    ) -> Result<Published, SinkError> {
        let previous = sink.last_published().await?;

        if let Some(previous) = previous.as_ref() {
            if previous.same_state(&desired) {
                return Ok(Published {
                    conditions: previous.clone(),
                    written: false,
                });
            }
        }

        let stamped = desired.stamped(previous.as_ref(), (self.clock)());
        sink.write(&stamped).await?;
        Ok(Published {
            conditions: stamped,
            written: true,
        })
    }
}
