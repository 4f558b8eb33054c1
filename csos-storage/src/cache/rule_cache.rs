//! Read-through TTL cache for rule documents.
//!
//! Each [`RuleSetKind`] has at most one entry. A read returns the cached
//! document while it is younger than the TTL and otherwise reloads through
//! the [`RuleLoader`], replacing the entry on success. Failed loads leave
//! the previous entry untouched and are returned to the caller.
//!
//! Concurrent misses for the same kind may each reach the loader; the last
//! completed load wins.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use csos_core::{RuleDocument, RuleSet, RuleSetKind};
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info};

use super::config::RuleCacheConfig;
use super::loader::{LoadSource, RuleLoader};
use crate::clock::Clock;
use crate::error::{LoadError, RuleCacheError};

#[derive(Debug, Clone)]
struct CacheEntry {
    document: Arc<RuleDocument>,
    cached_at: DateTime<Utc>,
}

/// Age of one cached entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntryStats {
    pub key: String,
    pub age_ms: u64,
}

/// Running totals since the cache was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheCounters {
    pub hits: u64,
    pub misses: u64,
    pub remote_loads: u64,
    pub fallback_loads: u64,
    pub failures: u64,
}

#[derive(Debug, Default)]
struct AtomicCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    remote_loads: AtomicU64,
    fallback_loads: AtomicU64,
    failures: AtomicU64,
}

impl AtomicCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheCounters {
        CacheCounters {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            remote_loads: self.remote_loads.load(Ordering::Relaxed),
            fallback_loads: self.fallback_loads.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Shared rule cache.
pub struct RuleCache {
    loader: RuleLoader,
    clock: Arc<dyn Clock>,
    config: RuleCacheConfig,
    entries: DashMap<RuleSetKind, CacheEntry>,
    counters: AtomicCounters,
}

impl std::fmt::Debug for RuleCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleCache")
            .field("config", &self.config)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl RuleCache {
    pub fn new(loader: RuleLoader, clock: Arc<dyn Clock>, config: RuleCacheConfig) -> Self {
        Self {
            loader,
            clock,
            config,
            entries: DashMap::new(),
            counters: AtomicCounters::default(),
        }
    }

    pub fn config(&self) -> &RuleCacheConfig {
        &self.config
    }

    /// Return the document for `kind`, reloading it if absent or stale.
    pub async fn get(&self, kind: RuleSetKind) -> Result<Arc<RuleDocument>, LoadError> {
        let now = self.clock.now();

        // Copy out before awaiting; a DashMap guard must not be held across
        // the reload below.
        let cached = self
            .entries
            .get(&kind)
            .map(|entry| (Arc::clone(&entry.document), entry.cached_at));

        if let Some((document, cached_at)) = cached {
            if age(now, cached_at) < self.config.ttl {
                AtomicCounters::bump(&self.counters.hits);
                debug!(key = %kind, "rule cache hit");
                return Ok(document);
            }
            debug!(key = %kind, "rule cache entry stale");
        }

        AtomicCounters::bump(&self.counters.misses);
        let loaded = match self
            .loader
            .load(&self.config.bucket, kind.file_name())
            .await
        {
            Ok(loaded) => loaded,
            Err(e) => {
                AtomicCounters::bump(&self.counters.failures);
                return Err(e);
            }
        };

        match loaded.source {
            LoadSource::Remote => AtomicCounters::bump(&self.counters.remote_loads),
            LoadSource::LocalFallback => AtomicCounters::bump(&self.counters.fallback_loads),
        }

        let document = Arc::new(loaded.document);
        self.entries.insert(
            kind,
            CacheEntry {
                document: Arc::clone(&document),
                cached_at: self.clock.now(),
            },
        );
        info!(key = %kind, source = ?loaded.source, "rule cache refreshed");

        Ok(document)
    }

    /// Load an arbitrary file without touching the cache.
    pub async fn load(&self, bucket: &str, path: &str) -> Result<RuleDocument, LoadError> {
        self.loader
            .load(bucket, path)
            .await
            .map(|loaded| loaded.document)
    }

    /// Resolve and validate the typed rule set for `kind`.
    pub async fn rule_set(&self, kind: RuleSetKind) -> Result<RuleSet, RuleCacheError> {
        let document = self.get(kind).await?;
        Ok(RuleSet::from_document(kind, &document)?)
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        let dropped = self.entries.len();
        self.entries.clear();
        info!(dropped, "rule cache cleared");
    }

    /// Age of each cached entry, ordered by key.
    pub fn stats(&self) -> Vec<CacheEntryStats> {
        let now = self.clock.now();
        let mut stats: Vec<CacheEntryStats> = self
            .entries
            .iter()
            .map(|entry| CacheEntryStats {
                key: entry.key().cache_key().to_string(),
                age_ms: u64::try_from(age(now, entry.cached_at).as_millis()).unwrap_or(u64::MAX),
            })
            .collect();
        stats.sort_by(|a, b| a.key.cmp(&b.key));
        stats
    }

    pub fn counters(&self) -> CacheCounters {
        self.counters.snapshot()
    }

    /// Load every rule set once, logging failures. Returns how many loaded.
    pub async fn preload(&self) -> usize {
        let mut loaded = 0;
        for kind in RuleSetKind::ALL {
            match self.get(kind).await {
                Ok(_) => loaded += 1,
                Err(e) => tracing::warn!(key = %kind, error = %e, "rule preload failed"),
            }
        }
        loaded
    }
}

fn age(now: DateTime<Utc>, cached_at: DateTime<Utc>) -> Duration {
    now.signed_duration_since(cached_at)
        .to_std()
        .unwrap_or(Duration::ZERO)
}
