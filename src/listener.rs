use std::fmt;
use std::sync::Arc;

/// Why an entry left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
  /// The entry's time-to-live elapsed.
  Expired,
  /// The entry was evicted to make room under the configured size limit.
  EvictedSize,
  /// The entry was removed explicitly, by `remove` or `purge`.
  Removed,
  /// The cache was closed while the entry was still live.
  Closed,
}

impl fmt::Display for EvictionReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      EvictionReason::Expired => write!(f, "expired"),
      EvictionReason::EvictedSize => write!(f, "evicted due to the size limit"),
      EvictionReason::Removed => write!(f, "removed"),
      EvictionReason::Closed => write!(f, "cache closed"),
    }
  }
}

/// Fired for every entry that leaves the cache, whatever the reason.
pub(crate) type ExpirationCallback<V> = Arc<dyn Fn(&str, &V) + Send + Sync>;

/// Fired for every entry that leaves the cache, carrying the reason.
pub(crate) type ReasonCallback<V> = Arc<dyn Fn(&str, EvictionReason, &V) + Send + Sync>;

/// Decides whether a time-expired entry is really evicted. `false` keeps the
/// entry and extends its deadline by its effective TTL.
pub(crate) type CheckExpirationCallback<V> = Arc<dyn Fn(&str, &V) -> bool + Send + Sync>;

/// Fired when an insertion creates an entry that did not exist before.
pub(crate) type NewItemCallback<V> = Arc<dyn Fn(&str, &V) + Send + Sync>;
