use crate::time::{self, Nanos, NEVER};

use std::sync::Arc;
use std::time::Duration;

/// Per-entry time-to-live policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ttl {
  /// Use the cache-wide TTL, resolved when the entry is stored and again on
  /// each hit extension. With no cache-wide TTL configured the entry does
  /// not expire by time.
  #[default]
  Global,
  /// The entry is exempt from time-based expiration. It can still be
  /// evicted by the size limit or removed explicitly.
  Never,
  /// The entry expires this long after it was stored or last extended.
  After(Duration),
}

impl From<Duration> for Ttl {
  /// A zero duration means "no per-entry TTL" and converts to `Global`, not
  /// to an already-elapsed deadline.
  fn from(duration: Duration) -> Self {
    if duration.is_zero() {
      Ttl::Global
    } else {
      Ttl::After(duration)
    }
  }
}

impl Ttl {
  /// Resolves this policy against the cache-wide TTL. `None` means no
  /// time-based expiration.
  pub(crate) fn resolve(self, global: Duration) -> Option<Duration> {
    match self {
      Ttl::After(duration) => Some(duration),
      Ttl::Never => None,
      Ttl::Global if global.is_zero() => None,
      Ttl::Global => Some(global),
    }
  }

  /// The deadline for an entry stored or extended at `from`.
  pub(crate) fn deadline(self, from: Nanos, global: Duration) -> Nanos {
    match self.resolve(global) {
      Some(duration) => time::deadline_after(from, duration),
      None => NEVER,
    }
  }
}

/// A stored value plus the metadata the expiry heap and the notification
/// path need.
#[derive(Debug)]
pub(crate) struct CacheEntry<V> {
  /// The user's value, shared so loader broadcasts and callback snapshots
  /// are cheap.
  pub(crate) value: Arc<V>,
  pub(crate) ttl: Ttl,
  pub(crate) created_at: Nanos,
  pub(crate) expires_at: Nanos,
  /// Position of this entry's slot in the expiry heap.
  pub(crate) heap_idx: usize,
}

impl<V> CacheEntry<V> {
  pub(crate) fn new(value: Arc<V>, ttl: Ttl, global: Duration, now: Nanos) -> Self {
    Self {
      value,
      ttl,
      created_at: now,
      expires_at: ttl.deadline(now, global),
      heap_idx: usize::MAX,
    }
  }

  #[inline]
  pub(crate) fn is_expired(&self, now: Nanos) -> bool {
    self.expires_at <= now
  }
}
