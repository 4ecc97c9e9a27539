use std::{
    collections::{HashMap, hash_map::DefaultHasher},
    hash::{Hash, Hasher},
    sync::{Arc, PoisonError, RwLock},
};

use prometheus::proto::MetricFamily;
use tracing::trace;

const SHARDS: usize = 16;

type Shard = RwLock<HashMap<String, Arc<MetricFamily>>>;

/// Latest metric family per name.
///
/// Entries are stored behind `Arc` and replaced whole, so readers never observe a family
/// assembled from two different writes. Keys are spread over independently locked shards;
/// iteration is consistent per shard but not across the whole map.
#[derive(Clone)]
pub struct MetricCache {
    shards: Arc<[Shard]>,
}

impl MetricCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            shards: (0..SHARDS).map(|_| RwLock::new(HashMap::new())).collect(),
        }
    }

    /// Replace the entry for `name` with `family`.
    ///
    /// Families without metrics are never stored; the call is a no-op for them and
    /// any previous entry stays visible.
    pub fn store(&self, name: impl Into<String>, family: MetricFamily) -> bool {
        if family.metric.is_empty() {
            return false;
        }
        let name = name.into();
        trace!(metric_name = %name, metrics = family.metric.len(), "cache store");

        let mut shard = self
            .shard(&name)
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        shard.insert(name, Arc::new(family));
        true
    }

    /// Current entry for `name`.
    pub fn get(&self, name: &str) -> Option<Arc<MetricFamily>> {
        let shard = self
            .shard(name)
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        shard.get(name).cloned()
    }

    /// Call `visitor` once per entry.
    ///
    /// Each shard is copied under its read lock and visited after the lock is released,
    /// so a slow visitor never blocks writers.
    pub fn visit<F>(&self, mut visitor: F)
    where
        F: FnMut(&str, &MetricFamily),
    {
        for shard in self.shards.iter() {
            let entries: Vec<(String, Arc<MetricFamily>)> = {
                let guard = shard.read().unwrap_or_else(PoisonError::into_inner);
                guard
                    .iter()
                    .map(|(name, family)| (name.clone(), Arc::clone(family)))
                    .collect()
            };
            for (name, family) in &entries {
                visitor(name, family);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.read().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn shard(&self, name: &str) -> &Shard {
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % self.shards.len()]
    }
}

impl Default for MetricCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::family::{label_pair, untyped_family, untyped_metric};

    fn family(name: &str, values: &[f64]) -> MetricFamily {
        let metrics = values
            .iter()
            .enumerate()
            .map(|(i, value)| untyped_metric(vec![label_pair("idx", &i.to_string())], 0, *value))
            .collect();
        untyped_family(name, metrics)
    }

    #[test]
    fn store_and_get() {
        let cache = MetricCache::new();
        assert!(cache.store("up", family("up", &[1.0])));

        let stored = cache.get("up").expect("entry should exist");
        assert_eq!(stored.name(), "up");
        assert_eq!(stored.metric.len(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn store_replaces_whole_entry() {
        let cache = MetricCache::new();
        cache.store("up", family("up", &[1.0, 2.0, 3.0]));
        cache.store("up", family("up", &[9.0]));

        let stored = cache.get("up").unwrap();
        assert_eq!(stored.metric.len(), 1);
        assert_eq!(stored.metric[0].untyped.value(), 9.0);
    }

    #[test]
    fn empty_family_is_not_stored() {
        let cache = MetricCache::new();
        cache.store("up", family("up", &[1.0]));

        assert!(!cache.store("up", family("up", &[])));
        assert_eq!(cache.get("up").unwrap().metric.len(), 1);
        assert!(!cache.store("down", family("down", &[])));
        assert!(cache.get("down").is_none());
    }

    #[test]
    fn visit_sees_every_entry_once() {
        let cache = MetricCache::new();
        for i in 0..50 {
            let name = format!("metric_{i}");
            cache.store(name.clone(), family(&name, &[i as f64]));
        }

        let mut seen = Vec::new();
        cache.visit(|name, family| {
            assert_eq!(name, family.name());
            seen.push(name.to_string());
        });
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 50);
    }

    #[test]
    fn visit_on_empty_cache_is_noop() {
        let cache = MetricCache::new();
        let mut calls = 0;
        cache.visit(|_, _| calls += 1);
        assert_eq!(calls, 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_readers_never_see_torn_families() {
        let cache = MetricCache::new();
        cache.store("up", family("up", &[0.0; 8]));

        let writer = {
            let cache = cache.clone();
            thread::spawn(move || {
                for round in 1..=500 {
                    cache.store("up", family("up", &[round as f64; 8]));
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        cache.visit(|_, family| {
                            let first = family.metric[0].untyped.value();
                            assert_eq!(family.metric.len(), 8);
                            assert!(family.metric.iter().all(|m| m.untyped.value() == first));
                        });
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(cache.get("up").unwrap().metric[0].untyped.value(), 500.0);
    }
}
