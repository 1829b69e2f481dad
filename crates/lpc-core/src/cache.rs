//! Read-through snapshot cache using moka
//!
//! Snapshots are immutable once rendered, so a revision always maps to the
//! same snapshot. Failed lookups are never cached.

use crate::error::LookupError;
use crate::providers::SnapshotSource;
use crate::types::{RevisionId, Snapshot};
use moka::future::Cache;
use std::time::Duration;

/// Snapshot source wrapped in a bounded, expiring cache
#[derive(Debug, Clone)]
pub struct CachedSnapshotSource<S> {
    inner: S,
    cache: Cache<RevisionId, Snapshot>,
}

impl<S: SnapshotSource> CachedSnapshotSource<S> {
    /// Wrap `inner` with a cache of `max_capacity` entries expiring after `ttl`
    #[must_use]
    pub fn new(inner: S, max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Drop a cached revision
    #[inline]
    pub async fn invalidate(&self, revision: RevisionId) {
        self.cache.invalidate(&revision).await;
    }
}

#[async_trait::async_trait]
impl<S: SnapshotSource> SnapshotSource for CachedSnapshotSource<S> {
    async fn snapshot(&self, revision: RevisionId) -> Result<Snapshot, LookupError> {
        if let Some(cached) = self.cache.get(&revision).await {
            return Ok(cached);
        }

        let snapshot = self.inner.snapshot(revision).await?;
        self.cache.insert(revision, snapshot.clone()).await;
        tracing::trace!(revision, name = %snapshot.name, "cached snapshot");
        Ok(snapshot)
    }
}
