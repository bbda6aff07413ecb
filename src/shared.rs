use crate::entry::{CacheEntry, Ttl};
use crate::error::Error;
use crate::listener::{
  CheckExpirationCallback, EvictionReason, ExpirationCallback, NewItemCallback, ReasonCallback,
};
use crate::loader::{InFlightLoad, LoaderFn};
use crate::metrics::Metrics;
use crate::store::EntryStore;
use crate::task::janitor::Janitor;
use crate::task::notifier::{Job, Notifier};
use crate::time;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use ahash::{HashMap, HashMapExt};
use crossbeam_channel::Sender;
use parking_lot::{Condvar, Mutex};

/// Everything guarded by the primary mutex: the entry store, the in-flight
/// loader map, the configuration knobs, and the lifecycle flag.
pub(crate) struct CacheCore<V: Send + Sync + 'static> {
  pub(crate) store: EntryStore<V>,
  pub(crate) in_flight: HashMap<Arc<str>, Arc<InFlightLoad<V>>>,
  /// Cache-wide TTL. Zero means entries stored with `Ttl::Global` do not
  /// expire by time.
  pub(crate) ttl: Duration,
  /// Maximum number of entries. Zero means unlimited.
  pub(crate) size_limit: usize,
  pub(crate) skip_ttl_extension_on_hit: bool,
  pub(crate) loader: Option<LoaderFn<V>>,
  pub(crate) expiration_cb: Option<ExpirationCallback<V>>,
  pub(crate) reason_cb: Option<ReasonCallback<V>>,
  pub(crate) check_cb: Option<CheckExpirationCallback<V>>,
  pub(crate) new_item_cb: Option<NewItemCallback<V>>,
  /// The only sender for the notifier queue. Dropping it on shutdown lets
  /// the notifier drain whatever is queued and stop.
  pub(crate) job_tx: Option<Sender<Job<V>>>,
  pub(crate) closed: bool,
}

impl<V: Send + Sync + 'static> CacheCore<V> {
  pub(crate) fn new(job_tx: Sender<Job<V>>) -> Self {
    Self {
      store: EntryStore::new(),
      in_flight: HashMap::new(),
      ttl: Duration::ZERO,
      size_limit: 0,
      skip_ttl_extension_on_hit: false,
      loader: None,
      expiration_cb: None,
      reason_cb: None,
      check_cb: None,
      new_item_cb: None,
      job_tx: Some(job_tx),
      closed: false,
    }
  }

  /// Queues a callback job. The queue is unbounded, so this never blocks
  /// while the primary lock is held.
  pub(crate) fn enqueue(&self, job: Job<V>) {
    if let Some(tx) = &self.job_tx {
      let _ = tx.send(job);
    }
  }

  /// Inserts or overwrites `key`, evicting under the size limit first and
  /// firing the new-item notification for entries that did not exist
  /// before. Returns the stored value.
  pub(crate) fn upsert(
    &mut self,
    metrics: &Metrics,
    key: Arc<str>,
    value: Arc<V>,
    ttl: Ttl,
  ) -> Arc<V> {
    let now = time::now_nanos();
    if let Some(entry) = self.store.get_mut(&key) {
      entry.value = value.clone();
      entry.ttl = ttl;
      entry.created_at = now;
      let deadline = ttl.deadline(now, self.ttl);
      self.store.update_deadline(&key, deadline);
      metrics.inserted.fetch_add(1, Ordering::Relaxed);
      return value;
    }

    // Make room before inserting. The victim is whatever expires soonest;
    // looping converges after the limit was lowered at runtime.
    if self.size_limit > 0 {
      while self.store.len() >= self.size_limit {
        let Some((victim_key, victim)) = self.store.pop_earliest() else {
          break;
        };
        metrics.evicted.fetch_add(1, Ordering::Relaxed);
        self.enqueue(Job::Evicted {
          key: victim_key,
          value: victim.value,
          reason: EvictionReason::EvictedSize,
        });
      }
    }

    let entry = CacheEntry::new(value.clone(), ttl, self.ttl, now);
    self.store.insert(key.clone(), entry);
    metrics.inserted.fetch_add(1, Ordering::Relaxed);
    self.enqueue(Job::NewItem {
      key,
      value: value.clone(),
    });
    value
  }

  /// Transitions to closed: drains every remaining entry through the
  /// notifier with reason `Closed`, fails all in-flight loads, and drops
  /// the queue sender so the notifier can drain and stop.
  pub(crate) fn shut_down(&mut self, metrics: &Metrics) {
    self.closed = true;
    for (key, entry) in self.store.drain_all() {
      metrics.evicted.fetch_add(1, Ordering::Relaxed);
      self.enqueue(Job::Evicted {
        key,
        value: entry.value,
        reason: EvictionReason::Closed,
      });
    }
    for (_, load) in self.in_flight.drain() {
      load.complete(Err(Error::Closed));
    }
    self.job_tx = None;
  }
}

/// The state a `Cache` handle points at.
pub(crate) struct CacheShared<V: Send + Sync + 'static> {
  pub(crate) core: Arc<Mutex<CacheCore<V>>>,
  /// Wakes the janitor whenever the soonest deadline may have changed.
  pub(crate) expiry_signal: Arc<Condvar>,
  pub(crate) metrics: Arc<Metrics>,
  pub(crate) workers: Mutex<Option<Workers>>,
}

/// Join handles for the two background workers.
pub(crate) struct Workers {
  pub(crate) janitor: Janitor,
  pub(crate) notifier: Notifier,
}

impl<V: Send + Sync + 'static> Drop for CacheShared<V> {
  fn drop(&mut self) {
    // A cache dropped without `close` still winds its workers down; the
    // remaining entries get their Closed notifications on the way out.
    let mut core = self.core.lock();
    if !core.closed {
      core.shut_down(&self.metrics);
    }
    drop(core);
    self.expiry_signal.notify_all();
  }
}
