//! Reconciler configuration

use crate::error::ConfigError;
use crate::matcher::SnapshotLayout;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reconciler configuration
///
/// Every field has a default matching the reference deployment, so an empty
/// TOML document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Name used in logs for this controller
    pub controller_name: String,
    /// Snapshot names are `<prefix>-<revision>`
    pub snapshot_name_prefix: String,
    /// Data key holding the rendered document
    pub snapshot_data_key: String,
    /// Top-level key holding server arguments
    pub argument_container: String,
    /// Seconds between passes when watching
    pub resync_interval_secs: u64,
    /// Maximum cached snapshots
    pub snapshot_cache_capacity: u64,
    /// Snapshot cache time-to-live in seconds; 0 disables caching
    pub snapshot_cache_ttl_secs: u64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            controller_name: "LatencyProfileController".to_string(),
            snapshot_name_prefix: "config".to_string(),
            snapshot_data_key: "config.yaml".to_string(),
            argument_container: "apiServerArguments".to_string(),
            resync_interval_secs: 60,
            snapshot_cache_capacity: 64,
            snapshot_cache_ttl_secs: 0,
        }
    }
}

impl ReconcilerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML text and validate it
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] on malformed TOML and
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// With snapshot name prefix
    #[inline]
    #[must_use]
    pub fn with_snapshot_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.snapshot_name_prefix = prefix.into();
        self
    }

    /// With argument container key
    #[inline]
    #[must_use]
    pub fn with_argument_container(mut self, container: impl Into<String>) -> Self {
        self.argument_container = container.into();
        self
    }

    /// With snapshot data key
    #[inline]
    #[must_use]
    pub fn with_snapshot_data_key(mut self, key: impl Into<String>) -> Self {
        self.snapshot_data_key = key.into();
        self
    }

    /// With resync interval
    #[inline]
    #[must_use]
    pub fn with_resync_interval_secs(mut self, secs: u64) -> Self {
        self.resync_interval_secs = secs;
        self
    }

    /// With snapshot cache settings
    #[inline]
    #[must_use]
    pub fn with_snapshot_cache(mut self, capacity: u64, ttl_secs: u64) -> Self {
        self.snapshot_cache_capacity = capacity;
        self.snapshot_cache_ttl_secs = ttl_secs;
        self
    }

    /// Snapshot layout used by the revision matcher
    #[must_use]
    pub fn layout(&self) -> SnapshotLayout {
        SnapshotLayout {
            data_key: self.snapshot_data_key.clone(),
            argument_container: self.argument_container.clone(),
        }
    }

    /// Interval between passes
    #[inline]
    #[must_use]
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    /// Snapshot cache TTL, `None` when caching is disabled
    #[inline]
    #[must_use]
    pub fn snapshot_cache_ttl(&self) -> Option<Duration> {
        (self.snapshot_cache_ttl_secs > 0 && self.snapshot_cache_capacity > 0)
            .then(|| Duration::from_secs(self.snapshot_cache_ttl_secs))
    }

    /// Check field values
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] for empty names or a zero resync
    /// interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let names = [
            ("controller_name", &self.controller_name),
            ("snapshot_name_prefix", &self.snapshot_name_prefix),
            ("snapshot_data_key", &self.snapshot_data_key),
            ("argument_container", &self.argument_container),
        ];
        if let Some((field, _)) = names.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("{field} must not be empty")));
        }
        if self.resync_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "resync_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
