//! Per-process cache of resolved configuration
//!
//! Holds container configurations keyed by (entity, request type, catalog)
//! and resolved global facet defaults keyed by field. Reads are concurrent;
//! writers invalidate per key through [`ResolverCache::apply`]. There is no
//! cross-key snapshot: each key is either stale or fresh on its own.

use crate::container::ContainerConfiguration;
use crate::error::Result;
use crate::facet::FacetConfiguration;
use crate::store::ConfigurationEvent;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerKey {
    pub entity_type: String,
    pub request_type: String,
    pub localized_catalog: String,
}

impl ContainerKey {
    pub fn new(
        entity_type: impl Into<String>,
        request_type: impl Into<String>,
        localized_catalog: impl Into<String>,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            request_type: request_type.into(),
            localized_catalog: localized_catalog.into(),
        }
    }
}

/// Hit, miss and invalidation counters
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    fn hit(&self, cache: &'static str) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("sift_resolver_cache_hits_total", "cache" => cache).increment(1);
    }

    fn miss(&self, cache: &'static str) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("sift_resolver_cache_misses_total", "cache" => cache).increment(1);
    }

    fn invalidate(&self, cache: &'static str, count: usize) {
        self.invalidations.fetch_add(count as u64, Ordering::Relaxed);
        metrics::counter!("sift_resolver_cache_invalidations_total", "cache" => cache)
            .increment(count as u64);
    }
}

/// One cached map plus a counter bumped by every invalidation, under the
/// write lock. A resolution that started before an invalidation is returned
/// to its caller but never inserted.
#[derive(Debug)]
struct Slots<K, V> {
    map: RwLock<HashMap<K, Arc<V>>>,
    generation: AtomicU64,
}

impl<K, V> Default for Slots<K, V> {
    fn default() -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }
}

impl<K: Eq + Hash + Clone, V> Slots<K, V> {
    fn get_or_try_insert<F>(&self, key: &K, stats: &CacheStats, cache: &'static str, resolve: F) -> Result<Arc<V>>
    where
        F: FnOnce() -> Result<V>,
    {
        let generation = {
            let map = self.map.read();
            if let Some(value) = map.get(key) {
                stats.hit(cache);
                return Ok(Arc::clone(value));
            }
            self.generation.load(Ordering::Acquire)
        };

        stats.miss(cache);
        // Resolved outside the lock; a concurrent miss on the same key keeps the first insert
        let value = Arc::new(resolve()?);
        let mut map = self.map.write();
        if self.generation.load(Ordering::Acquire) != generation {
            debug!("Skipped caching a {} resolved before an invalidation", cache);
            return Ok(value);
        }
        Ok(Arc::clone(map.entry(key.clone()).or_insert(value)))
    }

    /// Remove every entry matching `stale`
    fn invalidate(&self, stale: impl Fn(&K) -> bool) -> usize {
        let mut map = self.map.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        let before = map.len();
        map.retain(|key, _| !stale(key));
        before - map.len()
    }

    fn len(&self) -> usize {
        self.map.read().len()
    }
}

#[derive(Debug, Default)]
pub struct ResolverCache {
    containers: Slots<ContainerKey, ContainerConfiguration>,
    facet_defaults: Slots<String, FacetConfiguration>,
    stats: CacheStats,
}

impl ResolverCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Cached container for `key`, resolving it with `resolve` on a miss.
    /// Failed resolutions are not cached.
    pub fn container<F>(&self, key: &ContainerKey, resolve: F) -> Result<Arc<ContainerConfiguration>>
    where
        F: FnOnce() -> Result<ContainerConfiguration>,
    {
        self.containers.get_or_try_insert(key, &self.stats, "container", resolve)
    }

    /// Cached global facet default for `field`
    pub fn facet_default<F>(&self, field: &str, resolve: F) -> Result<Arc<FacetConfiguration>>
    where
        F: FnOnce() -> Result<FacetConfiguration>,
    {
        self.facet_defaults
            .get_or_try_insert(&field.to_string(), &self.stats, "facet_default", resolve)
    }

    /// Drop every container built for `entity_type`
    pub fn invalidate_entity(&self, entity_type: &str) -> usize {
        let removed = self.containers.invalidate(|key| key.entity_type == entity_type);
        self.stats.invalidate("container", removed);
        removed
    }

    pub fn invalidate_facet_default(&self, field: &str) -> bool {
        let removed = self.facet_defaults.invalidate(|key| key == field) > 0;
        if removed {
            self.stats.invalidate("facet_default", 1);
        }
        removed
    }

    pub fn invalidate_all(&self) {
        let containers = self.containers.invalidate(|_| true);
        let defaults = self.facet_defaults.invalidate(|_| true);
        self.stats.invalidate("container", containers);
        self.stats.invalidate("facet_default", defaults);
        info!(
            "Resolver cache cleared ({} containers, {} facet defaults)",
            containers, defaults
        );
    }

    /// React to a store change
    pub fn apply(&self, event: &ConfigurationEvent) {
        match event {
            ConfigurationEvent::FacetChanged { field, category: None } => {
                if self.invalidate_facet_default(field) {
                    debug!("Invalidated facet default for '{}'", field);
                }
            }
            // Category rows are read from the store on every resolution
            ConfigurationEvent::FacetChanged { category: Some(_), .. } => {}
            ConfigurationEvent::EntityChanged { entity_type } => {
                let removed = self.invalidate_entity(entity_type);
                debug!("Invalidated {} containers for entity '{}'", removed, entity_type);
            }
            ConfigurationEvent::Reloaded => self.invalidate_all(),
        }
    }

    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    pub fn facet_default_count(&self) -> usize {
        self.facet_defaults.len()
    }
}
