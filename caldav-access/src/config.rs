// SPDX-License-Identifier: MIT OR Apache-2.0

use std::num::NonZeroUsize;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const MAX_ACCESSORS: NonZeroUsize = NonZeroUsize::new(1024).unwrap();

/// Limit on how much the evaluated-access cache may hold.
///
/// Eviction always follows the accessor recency order: the accessor referenced least recently
/// loses every decision cached for it, under all owners.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CacheBound {
    /// Never evict.
    Unbounded,

    /// Keep decisions for at most this many distinct accessors.
    Accessors(NonZeroUsize),

    /// Keep at most this many decisions.
    ///
    /// The accessor written last is never evicted, so a single accessor holding more decisions
    /// than the bound temporarily exceeds it.
    Entries(NonZeroUsize),
}

/// Configuration parameters for the evaluated-access cache.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CacheConfiguration {
    /// Eviction bound.
    ///
    /// Default: 1024 accessors.
    pub(crate) bound: CacheBound,
}

impl CacheConfiguration {
    /// Return a default instance of `CacheConfiguration`.
    pub fn new() -> Self {
        Default::default()
    }

    /// Never evict anything.
    pub fn unbounded(mut self) -> Self {
        self.bound = CacheBound::Unbounded;
        self
    }

    /// Keep decisions for at most `max` distinct accessors.
    pub fn max_accessors(mut self, max: NonZeroUsize) -> Self {
        self.bound = CacheBound::Accessors(max);
        self
    }

    /// Keep at most `max` decisions.
    pub fn max_entries(mut self, max: NonZeroUsize) -> Self {
        self.bound = CacheBound::Entries(max);
        self
    }

    pub fn bound(&self) -> CacheBound {
        self.bound
    }
}

impl Default for CacheConfiguration {
    fn default() -> Self {
        CacheConfiguration {
            bound: CacheBound::Accessors(MAX_ACCESSORS),
        }
    }
}
