use crate::entry::{CacheEntry, Ttl};
use crate::listener::EvictionReason;
use crate::metrics::Metrics;
use crate::shared::CacheCore;
use crate::time::{self, Nanos};

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;
use parking_lot::{Condvar, Mutex};
use tracing::debug;

/// A unit of callback work handed to the notifier. Each job carries a
/// snapshot taken under the primary lock; the callbacks themselves run
/// lockless.
pub(crate) enum Job<V> {
  /// An insertion created an entry that did not exist before.
  NewItem { key: Arc<str>, value: Arc<V> },
  /// An entry reached a terminal event.
  Evicted {
    key: Arc<str>,
    value: Arc<V>,
    reason: EvictionReason,
  },
  /// A due entry awaiting the check-expiration verdict.
  CheckExpired {
    key: Arc<str>,
    value: Arc<V>,
    ttl: Ttl,
    created_at: Nanos,
  },
}

/// The thread-safe pieces of the cache the notifier needs.
pub(crate) struct NotifierContext<V: Send + Sync + 'static> {
  pub(crate) core: Arc<Mutex<CacheCore<V>>>,
  pub(crate) expiry_signal: Arc<Condvar>,
  pub(crate) metrics: Arc<Metrics>,
}

/// The background worker that runs user callbacks.
///
/// A single thread consumes the job queue, so callbacks for a key fire in
/// event order and never run under the cache lock. The loop ends when the
/// queue is drained and the last sender is gone.
pub(crate) struct Notifier {
  handle: JoinHandle<()>,
}

impl Notifier {
  pub(crate) fn spawn<V: Send + Sync + 'static>(
    context: NotifierContext<V>,
    jobs: Receiver<Job<V>>,
  ) -> Self {
    let handle = thread::Builder::new()
      .name("lapse-notifier".into())
      .spawn(move || run(context, jobs))
      .expect("failed to spawn the notifier thread");
    Self { handle }
  }

  /// Waits for the worker to exit; it does so once the queue disconnects.
  pub(crate) fn join(self) {
    let _ = self.handle.join();
  }
}

fn run<V: Send + Sync + 'static>(context: NotifierContext<V>, jobs: Receiver<Job<V>>) {
  while let Ok(job) = jobs.recv() {
    match job {
      Job::NewItem { key, value } => {
        let callback = context.core.lock().new_item_cb.clone();
        if let Some(callback) = callback {
          callback(&key, &value);
        }
      }
      Job::Evicted { key, value, reason } => {
        fire_terminal(&context, &key, &value, reason);
      }
      Job::CheckExpired {
        key,
        value,
        ttl,
        created_at,
      } => {
        check_candidate(&context, key, value, ttl, created_at);
      }
    }
  }
  debug!("callback notifier stopped");
}

/// Fires the terminal notifications for one entry instance. Each registered
/// callback sees the event exactly once.
fn fire_terminal<V: Send + Sync + 'static>(
  context: &NotifierContext<V>,
  key: &str,
  value: &V,
  reason: EvictionReason,
) {
  let (expiration_cb, reason_cb) = {
    let core = context.core.lock();
    (core.expiration_cb.clone(), core.reason_cb.clone())
  };
  if let Some(callback) = expiration_cb {
    callback(key, value);
  }
  if let Some(callback) = reason_cb {
    callback(key, reason, value);
  }
}

/// Applies the check-expiration verdict to one due entry. A `false` verdict
/// re-admits the entry with a fresh deadline; the rest of the sweep is
/// unaffected either way.
fn check_candidate<V: Send + Sync + 'static>(
  context: &NotifierContext<V>,
  key: Arc<str>,
  value: Arc<V>,
  ttl: Ttl,
  created_at: Nanos,
) {
  let callback = context.core.lock().check_cb.clone();
  let evict = match callback {
    // The callback was unset while this candidate was in flight.
    None => true,
    Some(callback) => callback(&key, &value),
  };
  if evict {
    context.metrics.evicted.fetch_add(1, Ordering::Relaxed);
    fire_terminal(context, &key, &value, EvictionReason::Expired);
    return;
  }

  let mut core = context.core.lock();
  if core.closed {
    // The cache shut down while the verdict was pending; the entry still
    // owes its terminal notification.
    drop(core);
    context.metrics.evicted.fetch_add(1, Ordering::Relaxed);
    fire_terminal(context, &key, &value, EvictionReason::Closed);
    return;
  }
  if core.store.contains(&key) {
    // Re-set while the verdict was pending; the newer entry owns the key.
    return;
  }
  let now = time::now_nanos();
  let mut entry = CacheEntry::new(value, ttl, core.ttl, now);
  entry.created_at = created_at;
  core.store.insert(key, entry);
  drop(core);
  context.expiry_signal.notify_one();
}
