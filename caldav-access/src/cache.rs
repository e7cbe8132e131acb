// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memoisation of evaluated access decisions.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::mem;
use std::fmt::Debug;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace, warn};

use crate::config::{CacheBound, CacheConfiguration};
use crate::set::PrivilegeSet;
use crate::stats::CacheStatistics;

type AclTable<V> = HashMap<String, V>;
type MaxTable<V> = HashMap<PrivilegeSet, AclTable<V>>;
type DesiredTable<V> = HashMap<PrivilegeSet, MaxTable<V>>;
type AccessorTable<V> = HashMap<String, DesiredTable<V>>;

/// Cache of evaluated access decisions.
///
/// A decision is keyed by five values: the owner href, the accessor href, the desired privileges,
/// the maximum privileges and the ACL text. Rather than building a composite key for every
/// lookup, each key component indexes one level of nested tables, created lazily on the first
/// insert along a path.
///
/// The cache is meant to be created once by the host and shared (for example through an `Arc`)
/// between all authorization checks. Every `get` and `put` is applied under a single lock, so a
/// reader never sees a half-built path. Evaluation itself happens outside the cache.
#[derive(Debug)]
pub struct EvaluatedAccessCache<V> {
    config: CacheConfiguration,
    inner: Mutex<CacheInner<V>>,
}

#[derive(Debug)]
struct CacheInner<V> {
    owners: HashMap<String, AccessorTable<V>>,

    recency: Recency,

    live_entries: usize,
    counters: Counters,
}

#[derive(Debug, Default)]
struct Counters {
    gets: u64,
    hits: u64,
    acl_tables: u64,
    entries: u64,
    evicted_accessors: u64,
}

impl<V> EvaluatedAccessCache<V> {
    pub fn new(config: CacheConfiguration) -> Self {
        Self {
            config,
            inner: Mutex::new(CacheInner {
                owners: HashMap::new(),
                recency: Recency::default(),
                live_entries: 0,
                counters: Counters::default(),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfiguration {
        &self.config
    }

    /// Look up the decision for the exact five-part key.
    ///
    /// A hit marks `accessor` as the most recently used one.
    pub fn get(
        &self,
        owner: &str,
        accessor: &str,
        desired: &PrivilegeSet,
        max: &PrivilegeSet,
        acl: &str,
    ) -> Option<V>
    where
        V: Clone,
    {
        let mut guard = self.lock();
        let inner = &mut *guard;

        inner.counters.gets += 1;

        let access = inner
            .owners
            .get(owner)?
            .get(accessor)?
            .get(desired)?
            .get(max)?
            .get(acl)?
            .clone();

        inner.counters.hits += 1;
        inner.recency.touch(accessor);

        Some(access)
    }

    /// Store the decision for the five-part key, evicting as the configured bound requires.
    ///
    /// Re-evaluating the same key is expected to give the same decision. If the stored one
    /// differs a warning is logged, the new decision replaces it either way.
    pub fn put(
        &self,
        owner: &str,
        accessor: &str,
        desired: &PrivilegeSet,
        max: &PrivilegeSet,
        acl: &str,
        access: V,
    ) where
        V: PartialEq + Debug,
    {
        let mut guard = self.lock();
        let inner = &mut *guard;

        inner.recency.touch(accessor);

        let max_tables = inner
            .owners
            .entry(owner.to_owned())
            .or_default()
            .entry(accessor.to_owned())
            .or_default()
            .entry(desired.clone())
            .or_default();

        let acl_table = match max_tables.entry(max.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                inner.counters.acl_tables += 1;
                trace!(owner, accessor, "created access cache acl table");
                entry.insert(HashMap::new())
            }
        };

        match acl_table.entry(acl.to_owned()) {
            Entry::Occupied(mut entry) => {
                if *entry.get() != access {
                    warn!(
                        owner,
                        accessor,
                        acl,
                        cached = ?entry.get(),
                        new = ?access,
                        "current access in cache does not match new version"
                    );
                }
                entry.insert(access);
            }
            Entry::Vacant(entry) => {
                entry.insert(access);
                inner.live_entries += 1;
            }
        }

        inner.counters.entries += 1;
        inner.enforce(self.config.bound);
    }

    /// Current counter values.
    pub fn statistics(&self) -> CacheStatistics {
        let inner = self.lock();

        CacheStatistics {
            accessor_queue_len: inner.recency.len(),
            gets: inner.counters.gets,
            hits: inner.counters.hits,
            acl_tables: inner.counters.acl_tables,
            entries: inner.counters.entries,
            live_entries: inner.live_entries,
            evicted_accessors: inner.counters.evicted_accessors,
        }
    }

    /// Drop every cached decision. Counters are kept.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.owners.clear();
        inner.recency.clear();
        inner.live_entries = 0;
    }

    /// Number of decisions currently held.
    pub fn len(&self) -> usize {
        self.lock().live_entries
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Table updates complete before anything in a critical section can panic, so a poisoned
    // lock still guards consistent tables.
    fn lock(&self) -> MutexGuard<'_, CacheInner<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V> Default for EvaluatedAccessCache<V> {
    fn default() -> Self {
        Self::new(CacheConfiguration::default())
    }
}

/// Accessors ordered by when they were last referenced, each held at most once.
///
/// Every reference stamps the accessor with a fresh generation, the oldest generation is the
/// least recently used accessor.
#[derive(Debug, Default)]
struct Recency {
    generations: HashMap<String, u64>,
    order: BTreeMap<u64, String>,
    next: u64,
}

impl Recency {
    /// Mark `accessor` as the most recently referenced one.
    fn touch(&mut self, accessor: &str) {
        let generation = self.next;
        self.next += 1;

        match self.generations.get_mut(accessor) {
            Some(current) => {
                let previous = mem::replace(current, generation);
                let name = self
                    .order
                    .remove(&previous)
                    .unwrap_or_else(|| accessor.to_owned());
                self.order.insert(generation, name);
            }
            None => {
                self.generations.insert(accessor.to_owned(), generation);
                self.order.insert(generation, accessor.to_owned());
            }
        }
    }

    /// Remove and return the least recently referenced accessor.
    fn pop_oldest(&mut self) -> Option<String> {
        let (_, accessor) = self.order.pop_first()?;
        self.generations.remove(&accessor);
        Some(accessor)
    }

    fn len(&self) -> usize {
        self.generations.len()
    }

    fn clear(&mut self) {
        self.generations.clear();
        self.order.clear();
    }
}

impl<V> CacheInner<V> {

    /// Evict least recently used accessors until the bound holds. The most recent accessor is
    /// always kept.
    fn enforce(&mut self, bound: CacheBound) {
        loop {
            let over = match bound {
                CacheBound::Unbounded => false,
                CacheBound::Accessors(max) => self.recency.len() > max.get(),
                CacheBound::Entries(max) => self.live_entries > max.get(),
            };

            if !over || self.recency.len() <= 1 {
                return;
            }

            let Some(accessor) = self.recency.pop_oldest() else {
                return;
            };
            self.evict(&accessor);
        }
    }

    /// Remove `accessor` from under every owner.
    fn evict(&mut self, accessor: &str) {
        let mut removed = 0;

        self.owners.retain(|_, accessors| {
            if let Some(desired) = accessors.remove(accessor) {
                removed += desired
                    .values()
                    .flat_map(|max_tables| max_tables.values())
                    .map(|acl_table| acl_table.len())
                    .sum::<usize>();
            }
            !accessors.is_empty()
        });

        self.live_entries -= removed;
        self.counters.evicted_accessors += 1;
        debug!(accessor, removed, "evicted accessor from access cache");
    }
}
