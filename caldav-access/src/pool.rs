// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hash-consing of privilege sets.

use std::collections::HashMap;
use std::hash::{BuildHasher, RandomState};
use std::sync::{Mutex, MutexGuard, PoisonError, Weak};

use crate::set::PrivilegeSet;
use crate::state::PrivilegeState;

/// Dead handles are swept once the pool holds at least this many.
const MIN_SWEEP: usize = 64;

/// Canonicalises equal privilege sets to one shared instance.
///
/// Privilege sets are small, immutable and heavily repeated (most ACLs in a deployment decode
/// to a handful of distinct sets), so sharing them keeps memory flat and makes the cache's
/// hash lookups hit identical slots. Interning only ever changes identity: an interned set is
/// always equal to the set that was passed in.
///
/// The pool does not own what it interns. It keeps weak handles, so a set lives exactly as long
/// as someone outside the pool holds it, and evicting a set from the cache releases it.
///
/// A disabled pool passes every set through untouched.
#[derive(Debug)]
pub struct PrivilegePool {
    enabled: bool,
    hasher: RandomState,
    slots: Mutex<Slots>,
}

#[derive(Debug, Default)]
struct Slots {
    buckets: HashMap<u64, Vec<Weak<[PrivilegeState]>>>,
    handles: usize,
    sweep_at: usize,
}

impl Slots {
    /// Drop handles whose set is gone, and buckets left empty.
    fn sweep(&mut self) {
        self.buckets.retain(|_, bucket| {
            bucket.retain(|handle| handle.strong_count() > 0);
            !bucket.is_empty()
        });
        self.handles = self.buckets.values().map(Vec::len).sum();
        self.sweep_at = MIN_SWEEP.max(self.handles * 2);
    }
}

impl PrivilegePool {
    /// A pool which interns sets.
    pub fn enabled() -> Self {
        Self::with_enabled(true)
    }

    /// A pool which returns every set as-is.
    pub fn disabled() -> Self {
        Self::with_enabled(false)
    }

    fn with_enabled(enabled: bool) -> Self {
        Self {
            enabled,
            hasher: RandomState::new(),
            slots: Mutex::new(Slots {
                sweep_at: MIN_SWEEP,
                ..Slots::default()
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Return the canonical instance equal to `set`, registering `set` if no live instance
    /// exists yet.
    pub fn intern(&self, set: PrivilegeSet) -> PrivilegeSet {
        if !self.enabled {
            return set;
        }

        let hash = self.hasher.hash_one(&set);
        let mut slots = self.lock();
        let bucket = slots.buckets.entry(hash).or_default();

        let before = bucket.len();
        bucket.retain(|handle| handle.strong_count() > 0);
        let dropped = before - bucket.len();

        let canonical = bucket
            .iter()
            .filter_map(PrivilegeSet::upgrade)
            .find(|candidate| *candidate == set);
        if canonical.is_none() {
            bucket.push(set.downgrade());
        }

        slots.handles = slots.handles + usize::from(canonical.is_none()) - dropped;
        if slots.handles >= slots.sweep_at {
            slots.sweep();
        }

        canonical.unwrap_or(set)
    }

    /// Number of distinct sets held which are still alive.
    pub fn len(&self) -> usize {
        let mut slots = self.lock();
        slots.sweep();
        slots.handles
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Handles are only added or dropped whole, so a poisoned lock still guards usable buckets.
    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for PrivilegePool {
    fn default() -> Self {
        Self::enabled()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use crate::set::PrivilegeSet;
    use crate::state::PrivilegeState::*;

    use super::PrivilegePool;

    #[test]
    fn equal_sets_share_an_instance() {
        let pool = PrivilegePool::enabled();

        let a = pool.intern(PrivilegeSet::new(vec![Allowed, Denied]));
        let b = pool.intern(PrivilegeSet::new(vec![Allowed, Denied]));
        assert_eq!(a, b);
        assert!(a.ptr_eq(&b));

        let c = pool.intern(PrivilegeSet::new(vec![Denied, Denied]));
        assert!(!a.ptr_eq(&c));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn disabled_pool_keeps_identity() {
        let pool = PrivilegePool::disabled();

        let a = pool.intern(PrivilegeSet::new(vec![Allowed, Denied]));
        let b = pool.intern(PrivilegeSet::new(vec![Allowed, Denied]));
        assert_eq!(a, b);
        assert!(!a.ptr_eq(&b));
        assert!(pool.is_empty());
    }

    #[test]
    fn concurrent_interning_converges() {
        let pool = Arc::new(PrivilegePool::enabled());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = pool.clone();
                thread::spawn(move || pool.intern(PrivilegeSet::new(vec![Allowed, Unspecified])))
            })
            .collect();

        let sets: Vec<PrivilegeSet> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        assert_eq!(pool.len(), 1);
        for set in &sets[1..] {
            assert!(set.ptr_eq(&sets[0]));
        }
    }

    #[test]
    fn dropped_sets_leave_the_pool() {
        let pool = PrivilegePool::enabled();

        let kept = pool.intern(PrivilegeSet::new(vec![Allowed, Allowed]));
        let sets: Vec<PrivilegeSet> = (0..500)
            .map(|n| {
                let states = (0..10)
                    .map(|bit| if n & (1 << bit) == 0 { Denied } else { Allowed })
                    .collect::<Vec<_>>();
                pool.intern(PrivilegeSet::new(states))
            })
            .collect();
        assert_eq!(pool.len(), 501);

        drop(sets);
        assert_eq!(pool.len(), 1);

        // Still canonical after the sweep.
        let again = pool.intern(PrivilegeSet::new(vec![Allowed, Allowed]));
        assert!(again.ptr_eq(&kept));
    }

    #[test]
    fn dropped_set_is_replaced_by_the_next_one() {
        let pool = PrivilegePool::enabled();

        let first = pool.intern(PrivilegeSet::new(vec![Denied]));
        let weak = first.downgrade();
        drop(first);
        assert!(pool.is_empty());

        let second = pool.intern(PrivilegeSet::new(vec![Denied]));
        let third = pool.intern(PrivilegeSet::new(vec![Denied]));
        assert!(second.ptr_eq(&third));
        assert_eq!(weak.strong_count(), 0);
        assert_eq!(pool.len(), 1);
    }
}
