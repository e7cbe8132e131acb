// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::Display;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Snapshot of the evaluated-access cache counters.
///
/// All counters only ever grow, except the two live gauges `accessor_queue_len` and
/// `live_entries`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CacheStatistics {
    /// Distinct accessors in the recency queue.
    pub accessor_queue_len: usize,

    /// Calls to `get`, hit or miss.
    pub gets: u64,

    /// Calls to `get` which returned a decision.
    pub hits: u64,

    /// ACL-text tables created, one per distinct (owner, accessor, desired, max) path.
    pub acl_tables: u64,

    /// Calls to `put`.
    pub entries: u64,

    /// Decisions currently held.
    pub live_entries: usize,

    /// Accessors evicted to stay within the configured bound.
    pub evicted_accessors: u64,
}

impl CacheStatistics {
    /// Named values, in reporting order.
    pub fn named(&self) -> [(&'static str, u64); 7] {
        [
            (
                "Access cache accessor queue len",
                self.accessor_queue_len as u64,
            ),
            ("Access cache gets", self.gets),
            ("Access cache hits", self.hits),
            ("Access cache ACL tables", self.acl_tables),
            ("Access cache entries", self.entries),
            ("Access cache live entries", self.live_entries as u64),
            ("Access cache evicted accessors", self.evicted_accessors),
        ]
    }

    /// Fraction of gets which hit, `0.0` before the first get.
    pub fn hit_ratio(&self) -> f64 {
        if self.gets == 0 {
            return 0.0;
        }
        self.hits as f64 / self.gets as f64
    }
}

impl Display for CacheStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (name, value) in self.named() {
            writeln!(f, "{}: {}", name, value)?;
        }
        Ok(())
    }
}
