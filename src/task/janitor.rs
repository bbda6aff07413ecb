use crate::listener::EvictionReason;
use crate::metrics::Metrics;
use crate::shared::CacheCore;
use crate::task::notifier::Job;
use crate::time::{self, NEVER};

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

/// The thread-safe pieces of the cache the janitor needs.
pub(crate) struct JanitorContext<V: Send + Sync + 'static> {
  pub(crate) core: Arc<Mutex<CacheCore<V>>>,
  pub(crate) expiry_signal: Arc<Condvar>,
  pub(crate) metrics: Arc<Metrics>,
}

/// The background worker that expires entries in deadline order.
///
/// It keeps a single timer armed for the soonest deadline in the store:
/// sleep until that deadline (or until a mutation signals that it moved),
/// pop everything due, hand the snapshots to the notifier, re-arm. A store
/// whose earliest entry never expires parks the worker until a signal.
pub(crate) struct Janitor {
  handle: JoinHandle<()>,
}

impl Janitor {
  pub(crate) fn spawn<V: Send + Sync + 'static>(context: JanitorContext<V>) -> Self {
    let handle = thread::Builder::new()
      .name("lapse-janitor".into())
      .spawn(move || run(context))
      .expect("failed to spawn the janitor thread");
    Self { handle }
  }

  /// Waits for the worker to exit; it does so once the cache is closed.
  pub(crate) fn join(self) {
    let _ = self.handle.join();
  }
}

fn run<V: Send + Sync + 'static>(context: JanitorContext<V>) {
  debug!("expiration janitor running");
  let mut core = context.core.lock();
  loop {
    if core.closed {
      break;
    }

    let now = time::now_nanos();
    let mut swept = 0usize;
    while let Some(deadline) = core.store.earliest_deadline() {
      if deadline == NEVER || deadline > now {
        break;
      }
      let Some((key, entry)) = core.store.pop_earliest() else {
        break;
      };
      if core.check_cb.is_some() {
        // The notifier owns the verdict; the entry may come back.
        core.enqueue(Job::CheckExpired {
          key,
          value: entry.value,
          ttl: entry.ttl,
          created_at: entry.created_at,
        });
      } else {
        context.metrics.evicted.fetch_add(1, Ordering::Relaxed);
        core.enqueue(Job::Evicted {
          key,
          value: entry.value,
          reason: EvictionReason::Expired,
        });
      }
      swept += 1;
    }
    if swept > 0 {
      trace!(swept, "expiration sweep");
      continue;
    }

    match core.store.earliest_deadline() {
      None | Some(NEVER) => {
        context.expiry_signal.wait(&mut core);
      }
      Some(deadline) => {
        let until_due = Duration::from_nanos(deadline.saturating_sub(now));
        let _ = context.expiry_signal.wait_for(&mut core, until_due);
      }
    }
  }
  drop(core);
  debug!("expiration janitor stopped");
}
