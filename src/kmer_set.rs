//! Two-tier membership set over 128-bit k-mer codes.
//!
//! `full` holds the exact member codes and is the ground truth; `lower`
//! holds the low 64 bits of every member. Probes hit the narrow tier
//! first: with near-zero expected hit rates the cheaper 64-bit hash
//! rejects almost every candidate before the wide table is touched.
//! Distinct codes can collide in `lower`, so a narrow hit must be
//! confirmed in `full`.

use rustc_hash::FxHashSet;

/// Cap on up-front table sizing, entries per tier.
const MAX_PREALLOC: usize = 1 << 27;

/// Immutable-after-construction set of same-length k-mer codes, shared
/// read-only across all filtering workers.
#[derive(Debug, Default)]
pub struct KmerSet {
    lower: FxHashSet<u64>,
    full: FxHashSet<u128>,
}

impl KmerSet {
    /// Pre-size both tiers so inserts during construction never rehash.
    /// Rehashing cost dominates at query scale, so the hint matters.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.min(MAX_PREALLOC);
        Self {
            lower: FxHashSet::with_capacity_and_hasher(capacity, Default::default()),
            full: FxHashSet::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Build from k-mer codes, deduplicating. `capacity_hint` should
    /// approximate the pre-deduplication count.
    pub fn from_values(values: impl IntoIterator<Item = u128>, capacity_hint: usize) -> Self {
        let mut set = Self::with_capacity(capacity_hint);
        for value in values {
            set.insert(value);
        }
        set
    }

    pub fn insert(&mut self, value: u128) {
        self.lower.insert(value as u64);
        self.full.insert(value);
    }

    /// Two-tier probe: the narrow tier short-circuits on miss, the wide
    /// tier confirms a hit.
    #[inline]
    pub fn contains(&self, value: u128) -> bool {
        self.lower.contains(&(value as u64)) && self.full.contains(&value)
    }

    /// Number of distinct members.
    pub fn len(&self) -> usize {
        self.full.len()
    }

    pub fn is_empty(&self) -> bool {
        self.full.is_empty()
    }
}
