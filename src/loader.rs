use crate::entry::Ttl;
use crate::error::Error;

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

/// The loader signature: produce a value and its TTL for a missing key, or
/// an error to broadcast to every waiting caller.
pub(crate) type LoaderFn<V> = Arc<dyn Fn(&str) -> Result<(V, Ttl), Error> + Send + Sync>;

/// A single-flight record for one key being loaded.
///
/// The first caller to miss registers one of these in the in-flight map and
/// runs the loader; every later caller for the same key blocks here and
/// receives the broadcast outcome.
pub(crate) struct InFlightLoad<V> {
  outcome: Mutex<Option<Result<Arc<V>, Error>>>,
  done: Condvar,
}

impl<V> InFlightLoad<V> {
  pub(crate) fn new() -> Self {
    Self {
      outcome: Mutex::new(None),
      done: Condvar::new(),
    }
  }

  /// Publishes the outcome and wakes every waiter. The first publication
  /// wins; a close broadcast and a late loader completion can race here.
  pub(crate) fn complete(&self, result: Result<Arc<V>, Error>) {
    let mut outcome = self.outcome.lock();
    if outcome.is_none() {
      *outcome = Some(result);
      self.done.notify_all();
    }
  }

  /// Blocks until an outcome is published.
  pub(crate) fn wait(&self) -> Result<Arc<V>, Error> {
    let mut outcome = self.outcome.lock();
    loop {
      if let Some(result) = outcome.as_ref() {
        return result.clone();
      }
      self.done.wait(&mut outcome);
    }
  }
}
