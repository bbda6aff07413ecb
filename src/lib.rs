// src/lib.rs

//! An in-memory key-value cache with per-entry time-to-live, a bounded
//! capacity, eviction notifications, and a single-flight loader.
//!
//! Entries expire in wall-clock order: a single background janitor keeps one
//! timer armed for the soonest deadline in an indexed min-heap, and a
//! dedicated notifier thread delivers every eviction notification so user
//! callbacks never run under the cache lock. Concurrent misses for the same
//! key coalesce into one loader call whose outcome is broadcast to every
//! waiter.
//!
//! ```
//! use lapse::{Cache, Ttl};
//! use std::time::Duration;
//!
//! let cache: Cache<String> = Cache::new();
//! cache.set_ttl(Duration::from_secs(60)).unwrap();
//! cache.set("session", "alice".to_string()).unwrap();
//! assert_eq!(*cache.get("session").unwrap(), "alice");
//!
//! // Pin an entry regardless of the cache-wide TTL.
//! cache.set_with_ttl("config", "v2".to_string(), Ttl::Never).unwrap();
//!
//! cache.close().unwrap();
//! ```

mod cache;
mod entry;
mod error;
mod listener;
mod loader;
mod metrics;
mod shared;
mod store;
mod task;
mod time;

pub use cache::Cache;
pub use entry::Ttl;
pub use error::Error;
pub use listener::EvictionReason;
pub use metrics::MetricsSnapshot;
