use std::sync::atomic::{AtomicI64, Ordering};

use crossbeam_utils::CachePadded;

/// Lock-free monotonic counters for cache activity.
#[derive(Debug, Default)]
pub(crate) struct Metrics {
  /// Entries stored by `set`, `set_with_ttl`, or a loader, overwrites
  /// included.
  pub(crate) inserted: CachePadded<AtomicI64>,
  /// Lookups served straight from the store.
  pub(crate) hits: CachePadded<AtomicI64>,
  /// Lookups that found no live entry, whether or not a loader then
  /// supplied one.
  pub(crate) misses: CachePadded<AtomicI64>,
  /// Values successfully returned to callers, loader results included.
  pub(crate) retrievals: CachePadded<AtomicI64>,
  /// Entries that left the cache for any terminal reason.
  pub(crate) evicted: CachePadded<AtomicI64>,
}

impl Metrics {
  /// A point-in-time snapshot of the counters.
  pub(crate) fn snapshot(&self) -> MetricsSnapshot {
    MetricsSnapshot {
      inserted: self.inserted.load(Ordering::Relaxed),
      hits: self.hits.load(Ordering::Relaxed),
      misses: self.misses.load(Ordering::Relaxed),
      retrievals: self.retrievals.load(Ordering::Relaxed),
      evicted: self.evicted.load(Ordering::Relaxed),
    }
  }
}

/// A point-in-time, public-facing snapshot of the cache's counters.
///
/// All counters are monotonically non-decreasing over the life of a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
  /// The number of entries stored, overwrites and loader results included.
  pub inserted: i64,
  /// The number of lookups served straight from the store.
  pub hits: i64,
  /// The number of lookups that found no live entry.
  pub misses: i64,
  /// The number of values successfully returned to callers.
  pub retrievals: i64,
  /// The number of entries that left the cache for any terminal reason.
  pub evicted: i64,
}
