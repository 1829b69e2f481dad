//! Latency profiles and the policy table
//!
//! A [`Profile`] is the operator-chosen tolerance level. The
//! [`ProfileTable`] maps it to the concrete server arguments that must be
//! rendered into every revision.

use crate::error::ProfileError;
use lpc_document::ConfigPath;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Server argument controlling how long pods tolerate a not-ready node
pub const NOT_READY_TOLERATION_ARGUMENT: &str = "default-not-ready-toleration-seconds";

/// Server argument controlling how long pods tolerate an unreachable node
pub const UNREACHABLE_TOLERATION_ARGUMENT: &str = "default-unreachable-toleration-seconds";

/// Operator-selected latency profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Profile {
    /// No profile chosen; leave existing configuration untouched
    #[default]
    Unset,
    /// Default reaction times
    Default,
    /// Medium update, average reaction
    Medium,
    /// Low update, slow reaction
    Low,
}

impl Profile {
    /// All profiles, `Unset` first
    pub const ALL: [Profile; 4] = [Self::Unset, Self::Default, Self::Medium, Self::Low];

    /// Canonical wire value
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unset => "",
            Self::Default => "Default",
            Self::Medium => "MediumUpdateAverageReaction",
            Self::Low => "LowUpdateSlowReaction",
        }
    }

    /// Check if no profile is set
    #[inline]
    #[must_use]
    pub const fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => f.write_str("<unset>"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl FromStr for Profile {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(Self::Unset),
            "Default" => Ok(Self::Default),
            "MediumUpdateAverageReaction" | "Medium" => Ok(Self::Medium),
            "LowUpdateSlowReaction" | "Low" => Ok(Self::Low),
            other => Err(ProfileError::UnknownProfile(other.to_string())),
        }
    }
}

impl TryFrom<String> for Profile {
    type Error = ProfileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Profile> for String {
    fn from(profile: Profile) -> Self {
        profile.as_str().to_string()
    }
}

/// Resolved argument values, keyed by argument name
///
/// Values are string-encoded integer seconds, the form the server expects.
/// An empty set is the no-op sentinel for [`Profile::Unset`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, String>);

impl ParameterSet {
    /// Create empty (no-op) set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a parameter, returning the set
    #[inline]
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Get a parameter value
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Number of parameters
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the set is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check if this is the "leave configuration untouched" sentinel
    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate `(name, value)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = (&'a String, &'a String);
    type IntoIter = std::collections::btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Toleration pair for one profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tolerations {
    /// Seconds a pod tolerates a not-ready node
    pub not_ready_seconds: u32,
    /// Seconds a pod tolerates an unreachable node
    pub unreachable_seconds: u32,
}

impl Tolerations {
    #[inline]
    #[must_use]
    pub const fn new(not_ready_seconds: u32, unreachable_seconds: u32) -> Self {
        Self {
            not_ready_seconds,
            unreachable_seconds,
        }
    }
}

/// Server argument tracked by the reconciler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackedParameter {
    /// `default-not-ready-toleration-seconds`
    NotReadyToleration,
    /// `default-unreachable-toleration-seconds`
    UnreachableToleration,
}

impl TrackedParameter {
    /// Both tracked parameters
    pub const ALL: [TrackedParameter; 2] = [Self::NotReadyToleration, Self::UnreachableToleration];

    /// Server argument name
    #[inline]
    #[must_use]
    pub const fn argument(&self) -> &'static str {
        match self {
            Self::NotReadyToleration => NOT_READY_TOLERATION_ARGUMENT,
            Self::UnreachableToleration => UNREACHABLE_TOLERATION_ARGUMENT,
        }
    }

    /// Location of the argument inside a server config document
    #[must_use]
    pub fn path(&self, container: &str) -> ConfigPath {
        ConfigPath::single(container).child(self.argument())
    }

    /// Seconds selected by this parameter from a toleration pair
    #[inline]
    #[must_use]
    pub const fn select(&self, tolerations: Tolerations) -> u32 {
        match self {
            Self::NotReadyToleration => tolerations.not_ready_seconds,
            Self::UnreachableToleration => tolerations.unreachable_seconds,
        }
    }
}

impl fmt::Display for TrackedParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.argument())
    }
}

/// Policy table from profile to tolerations
///
/// The values are policy, not derived. [`ProfileTable::default`] carries the
/// reference deployment's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileTable {
    /// Tolerations for [`Profile::Default`]
    pub default: Tolerations,
    /// Tolerations for [`Profile::Medium`]
    pub medium: Tolerations,
    /// Tolerations for [`Profile::Low`]
    pub low: Tolerations,
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self {
            default: Tolerations::new(300, 300),
            medium: Tolerations::new(60, 60),
            low: Tolerations::new(60, 60),
        }
    }
}

impl ProfileTable {
    /// Tolerations for a profile, `None` for [`Profile::Unset`]
    #[inline]
    #[must_use]
    pub const fn tolerations(&self, profile: Profile) -> Option<Tolerations> {
        match profile {
            Profile::Unset => None,
            Profile::Default => Some(self.default),
            Profile::Medium => Some(self.medium),
            Profile::Low => Some(self.low),
        }
    }

    /// Value of one tracked parameter for a profile
    #[must_use]
    pub fn value(&self, profile: Profile, parameter: TrackedParameter) -> Option<String> {
        self.tolerations(profile)
            .map(|t| parameter.select(t).to_string())
    }

    /// Full parameter set for a typed profile
    #[must_use]
    pub fn parameters_for(&self, profile: Profile) -> ParameterSet {
        TrackedParameter::ALL
            .iter()
            .filter_map(|p| self.value(profile, *p).map(|v| (p.argument(), v)))
            .fold(ParameterSet::new(), |set, (name, value)| set.with(name, value))
    }

    /// Resolve a raw profile value into the desired parameter set
    ///
    /// # Errors
    /// Returns [`ProfileError::UnknownProfile`] for any value outside the
    /// known profiles. Unknown values are never mapped to a default.
    pub fn resolve(&self, raw: &str) -> Result<ParameterSet, ProfileError> {
        let profile: Profile = raw.parse()?;
        Ok(self.parameters_for(profile))
    }
}
