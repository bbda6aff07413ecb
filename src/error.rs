use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Errors returned by cache operations.
///
/// `NotFound` and `Closed` are the only errors the cache itself produces.
/// Anything a loader returns travels to every waiting caller unchanged,
/// either as one of those two sentinels or wrapped in `Loader`.
#[derive(Debug, Clone)]
pub enum Error {
  /// The key is not present, and no loader produced a value for it.
  NotFound,
  /// The cache has been closed; lookups and mutations are no longer
  /// accepted.
  Closed,
  /// The configured loader failed. The original error is carried unchanged.
  Loader(Arc<dyn StdError + Send + Sync + 'static>),
}

impl Error {
  /// Wraps a loader-supplied error for broadcast to every waiting caller.
  pub fn loader<E>(err: E) -> Self
  where
    E: StdError + Send + Sync + 'static,
  {
    Error::Loader(Arc::new(err))
  }
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Error::NotFound => write!(f, "key not found"),
      Error::Closed => write!(f, "cache is closed"),
      Error::Loader(err) => write!(f, "loader failed: {err}"),
    }
  }
}

impl StdError for Error {
  fn source(&self) -> Option<&(dyn StdError + 'static)> {
    match self {
      Error::Loader(err) => Some(err.as_ref()),
      _ => None,
    }
  }
}

impl PartialEq for Error {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Error::NotFound, Error::NotFound) => true,
      (Error::Closed, Error::Closed) => true,
      // Loader errors are only equal when they are the same broadcast.
      (Error::Loader(a), Error::Loader(b)) => Arc::ptr_eq(a, b),
      _ => false,
    }
  }
}

impl Eq for Error {}
