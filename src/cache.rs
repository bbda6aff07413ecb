use crate::entry::Ttl;
use crate::error::Error;
use crate::listener::EvictionReason;
use crate::loader::InFlightLoad;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::shared::{CacheCore, CacheShared, Workers};
use crate::task::janitor::{Janitor, JanitorContext};
use crate::task::notifier::{Job, Notifier, NotifierContext};
use crate::time;

use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

/// A concurrency-safe, in-memory key-value cache with per-entry TTL, a
/// bounded capacity, eviction notifications, and a single-flight loader.
///
/// Handles are cheap to clone and all point at the same cache. Each cache
/// owns two background workers: a janitor that expires entries in deadline
/// order and a notifier that runs user callbacks off the hot path. Both are
/// stopped by [`close`](Cache::close).
///
/// Values are stored behind [`Arc`] so lookups, loader broadcasts, and
/// callback snapshots never clone the value itself.
pub struct Cache<V: Send + Sync + 'static> {
  shared: Arc<CacheShared<V>>,
}

impl<V: Send + Sync + 'static> Clone for Cache<V> {
  fn clone(&self) -> Self {
    Self {
      shared: self.shared.clone(),
    }
  }
}

impl<V: Send + Sync + 'static> Default for Cache<V> {
  fn default() -> Self {
    Self::new()
  }
}

impl<V: Send + Sync + 'static> fmt::Debug for Cache<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let core = self.shared.core.lock();
    f.debug_struct("Cache")
      .field("count", &core.store.len())
      .field("closed", &core.closed)
      .field("metrics", &self.shared.metrics.snapshot())
      .finish_non_exhaustive()
  }
}

impl<V: Send + Sync + 'static> Cache<V> {
  /// Creates a cache with no TTL, no size limit, and no loader. Entries
  /// stored before a TTL is configured do not expire by time.
  pub fn new() -> Self {
    let (job_tx, job_rx) = crossbeam_channel::unbounded();
    let core = Arc::new(Mutex::new(CacheCore::new(job_tx)));
    let expiry_signal = Arc::new(Condvar::new());
    let metrics = Arc::new(Metrics::default());

    let janitor = Janitor::spawn(JanitorContext {
      core: core.clone(),
      expiry_signal: expiry_signal.clone(),
      metrics: metrics.clone(),
    });
    let notifier = Notifier::spawn(
      NotifierContext {
        core: core.clone(),
        expiry_signal: expiry_signal.clone(),
        metrics: metrics.clone(),
      },
      job_rx,
    );

    Self {
      shared: Arc::new(CacheShared {
        core,
        expiry_signal,
        metrics,
        workers: Mutex::new(Some(Workers { janitor, notifier })),
      }),
    }
  }

  /// Stores `value` under `key` with the cache-wide TTL.
  pub fn set(&self, key: &str, value: V) -> Result<(), Error> {
    self.set_with_ttl(key, value, Ttl::Global)
  }

  /// Stores `value` under `key` with its own TTL.
  ///
  /// A plain [`Duration`] is accepted here; `Duration::ZERO` converts to
  /// [`Ttl::Global`] and defers to the cache-wide TTL.
  /// Overwriting an existing key keeps the entry but replaces its value and
  /// recomputes its deadline from `ttl`; only brand-new entries fire the
  /// new-item callback. When a size limit is configured and the insertion
  /// would exceed it, the soonest-expiring entry is evicted first.
  pub fn set_with_ttl(&self, key: &str, value: V, ttl: impl Into<Ttl>) -> Result<(), Error> {
    let ttl = ttl.into();
    let mut core = self.shared.core.lock();
    if core.closed {
      return Err(Error::Closed);
    }
    core.upsert(&self.shared.metrics, Arc::from(key), Arc::new(value), ttl);
    drop(core);
    self.shared.expiry_signal.notify_one();
    Ok(())
  }

  /// Looks up `key`.
  ///
  /// A hit pushes the entry's deadline out by its effective TTL unless
  /// [`skip_ttl_extension_on_hit`](Cache::skip_ttl_extension_on_hit) is set.
  /// On a miss with a loader configured, the loader runs once per key no
  /// matter how many callers are waiting, and every waiter receives the same
  /// outcome. A miss without a loader is [`Error::NotFound`].
  pub fn get(&self, key: &str) -> Result<Arc<V>, Error> {
    let metrics = &self.shared.metrics;
    let mut core = self.shared.core.lock();
    if core.closed {
      return Err(Error::Closed);
    }

    let now = time::now_nanos();
    if let Some(entry) = core.store.get(key) {
      if !entry.is_expired(now) {
        let value = entry.value.clone();
        let ttl = entry.ttl;
        let previous_deadline = entry.expires_at;
        metrics.hits.fetch_add(1, Ordering::Relaxed);
        metrics.retrievals.fetch_add(1, Ordering::Relaxed);
        if !core.skip_ttl_extension_on_hit {
          let deadline = ttl.deadline(now, core.ttl);
          if deadline != previous_deadline {
            core.store.update_deadline(key, deadline);
            drop(core);
            // An extension can pull a parked janitor forward, for example
            // when the cache-wide TTL shrank since the entry was stored.
            self.shared.expiry_signal.notify_one();
            return Ok(value);
          }
        }
        return Ok(value);
      }
      // Present but past its deadline: the janitor owns the eviction, the
      // lookup just misses.
    }

    metrics.misses.fetch_add(1, Ordering::Relaxed);
    let Some(loader) = core.loader.clone() else {
      return Err(Error::NotFound);
    };

    if let Some(pending) = core.in_flight.get(key) {
      let pending = pending.clone();
      drop(core);
      let value = pending.wait()?;
      metrics.retrievals.fetch_add(1, Ordering::Relaxed);
      return Ok(value);
    }

    let key: Arc<str> = Arc::from(key);
    let load = Arc::new(InFlightLoad::new());
    core.in_flight.insert(key.clone(), load.clone());
    drop(core);

    // The loader runs on the calling thread, outside every cache lock, so
    // it may freely call back into the cache.
    let outcome = loader(&key);

    let mut core = self.shared.core.lock();
    core.in_flight.remove(&*key);
    let result = if core.closed {
      // Closed while loading: the result is discarded and every subscriber,
      // this caller included, observes the shutdown.
      Err(Error::Closed)
    } else {
      match outcome {
        Err(err) => Err(err),
        Ok((value, ttl)) => {
          let value = core.upsert(&self.shared.metrics, key.clone(), Arc::new(value), ttl);
          metrics.retrievals.fetch_add(1, Ordering::Relaxed);
          Ok(value)
        }
      }
    };
    drop(core);
    self.shared.expiry_signal.notify_one();
    load.complete(result.clone());
    result
  }

  /// Removes `key`, firing its terminal notification with reason
  /// [`EvictionReason::Removed`].
  pub fn remove(&self, key: &str) -> Result<(), Error> {
    let mut core = self.shared.core.lock();
    if core.closed {
      return Err(Error::Closed);
    }
    let Some((key, entry)) = core.store.remove(key) else {
      return Err(Error::NotFound);
    };
    self.shared.metrics.evicted.fetch_add(1, Ordering::Relaxed);
    core.enqueue(Job::Evicted {
      key,
      value: entry.value,
      reason: EvictionReason::Removed,
    });
    drop(core);
    self.shared.expiry_signal.notify_one();
    Ok(())
  }

  /// Removes every entry, firing a `Removed` notification for each.
  pub fn purge(&self) -> Result<(), Error> {
    let mut core = self.shared.core.lock();
    if core.closed {
      return Err(Error::Closed);
    }
    for (key, entry) in core.store.drain_all() {
      self.shared.metrics.evicted.fetch_add(1, Ordering::Relaxed);
      core.enqueue(Job::Evicted {
        key,
        value: entry.value,
        reason: EvictionReason::Removed,
      });
    }
    drop(core);
    self.shared.expiry_signal.notify_one();
    Ok(())
  }

  /// The number of live entries. Zero once the cache is closed.
  pub fn count(&self) -> usize {
    return self.shared.core.lock().store.len();
  }

  /// Closes the cache.
  ///
  /// Every remaining entry is drained through the notifier with reason
  /// [`EvictionReason::Closed`], in-flight loads observe [`Error::Closed`],
  /// and both background workers are joined once the callback queue is
  /// empty. Afterwards every lookup and mutation fails with
  /// [`Error::Closed`], as does a second `close`.
  ///
  /// Must not be called from inside a cache callback: the notifier cannot
  /// join itself.
  pub fn close(&self) -> Result<(), Error> {
    let mut core = self.shared.core.lock();
    if core.closed {
      return Err(Error::Closed);
    }
    debug!(remaining = core.store.len(), "closing cache");
    core.shut_down(&self.shared.metrics);
    drop(core);
    self.shared.expiry_signal.notify_all();

    // The janitor exits on the closed flag; the notifier exits once the
    // queue is drained and disconnected. Joining them here is the no-leak
    // guarantee.
    if let Some(workers) = self.shared.workers.lock().take() {
      workers.janitor.join();
      workers.notifier.join();
    }
    Ok(())
  }

  /// Sets the cache-wide TTL applied to entries stored with
  /// [`Ttl::Global`]. `Duration::ZERO` means no cache-wide TTL.
  ///
  /// Existing entries keep their current deadlines; the new value applies
  /// to later insertions and to hit extensions.
  pub fn set_ttl(&self, ttl: Duration) -> Result<(), Error> {
    let mut core = self.shared.core.lock();
    if core.closed {
      return Err(Error::Closed);
    }
    core.ttl = ttl;
    drop(core);
    self.shared.expiry_signal.notify_one();
    Ok(())
  }

  /// Caps the number of entries; zero means unlimited. When an insertion
  /// would exceed the cap, the soonest-expiring entry is evicted to make
  /// room.
  pub fn set_cache_size_limit(&self, limit: usize) {
    self.shared.core.lock().size_limit = limit;
  }

  /// Controls whether a hit pushes the entry's deadline out by its
  /// effective TTL. Extension is on by default.
  pub fn skip_ttl_extension_on_hit(&self, skip: bool) {
    self.shared.core.lock().skip_ttl_extension_on_hit = skip;
  }

  /// Installs the loader invoked on misses. Concurrent misses for one key
  /// share a single invocation; the loader's errors are broadcast to every
  /// waiter unchanged and are never cached.
  pub fn set_loader_function<F>(&self, loader: F)
  where
    F: Fn(&str) -> Result<(V, Ttl), Error> + Send + Sync + 'static,
  {
    self.shared.core.lock().loader = Some(Arc::new(loader));
  }

  /// Installs the callback fired for every entry that leaves the cache,
  /// whatever the reason.
  pub fn set_expiration_callback<F>(&self, callback: F)
  where
    F: Fn(&str, &V) + Send + Sync + 'static,
  {
    self.shared.core.lock().expiration_cb = Some(Arc::new(callback));
  }

  /// Installs the callback fired for every entry that leaves the cache,
  /// carrying the [`EvictionReason`]. It coexists with the plain expiration
  /// callback; a single terminal event fires each registered callback
  /// exactly once.
  pub fn set_expiration_reason_callback<F>(&self, callback: F)
  where
    F: Fn(&str, EvictionReason, &V) + Send + Sync + 'static,
  {
    self.shared.core.lock().reason_cb = Some(Arc::new(callback));
  }

  /// Installs the predicate consulted before a time-expired entry is
  /// evicted. Returning `false` keeps the entry and extends its deadline by
  /// its effective TTL; the verdict for one entry never affects the rest of
  /// the sweep. The predicate is not consulted for size evictions, explicit
  /// removals, or the close drain.
  pub fn set_check_expiration_callback<F>(&self, callback: F)
  where
    F: Fn(&str, &V) -> bool + Send + Sync + 'static,
  {
    self.shared.core.lock().check_cb = Some(Arc::new(callback));
  }

  /// Installs the callback fired when an insertion creates an entry that
  /// did not exist before. Overwrites do not fire it.
  pub fn set_new_item_callback<F>(&self, callback: F)
  where
    F: Fn(&str, &V) + Send + Sync + 'static,
  {
    self.shared.core.lock().new_item_cb = Some(Arc::new(callback));
  }

  /// A point-in-time snapshot of the activity counters.
  pub fn metrics(&self) -> MetricsSnapshot {
    return self.shared.metrics.snapshot();
  }
}
