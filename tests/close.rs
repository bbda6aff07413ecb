use lapse::{Cache, Error};
use std::time::Duration;

#[test]
fn mutations_after_close_fail_with_closed() {
  let cache: Cache<i32> = Cache::new();
  cache.set_ttl(Duration::from_secs(360_000)).unwrap();
  cache.set("1", 1).unwrap();
  cache.set("2", 1).unwrap();
  cache.set("3", 1).unwrap();

  assert!(cache.get("1").is_ok());
  assert!(cache.set("broken", 1).is_ok());
  assert_eq!(cache.remove("broken2").unwrap_err(), Error::NotFound);
  assert!(cache.purge().is_ok());
  assert!(cache
    .set_with_ttl("broken", 2, Duration::from_secs(60))
    .is_ok());
  assert!(cache.set_ttl(Duration::from_secs(3600)).is_ok());

  cache.close().unwrap();

  assert_eq!(cache.get("broken3").unwrap_err(), Error::Closed);
  assert_eq!(cache.set("broken", 1).unwrap_err(), Error::Closed);
  assert_eq!(cache.remove("broken2").unwrap_err(), Error::Closed);
  assert_eq!(cache.purge().unwrap_err(), Error::Closed);
  assert_eq!(
    cache
      .set_with_ttl("broken", 2, Duration::from_secs(60))
      .unwrap_err(),
    Error::Closed
  );
  assert_eq!(
    cache.set_ttl(Duration::from_secs(3600)).unwrap_err(),
    Error::Closed
  );
  assert_eq!(cache.count(), 0);
}

#[test]
fn closing_twice_reports_closed() {
  let cache: Cache<&str> = Cache::new();
  cache.set("test", "!").unwrap();
  cache.close().unwrap();
  assert_eq!(cache.close().unwrap_err(), Error::Closed);
}

#[test]
fn close_counts_the_drain_as_evictions() {
  let cache: Cache<i32> = Cache::new();
  cache.set_ttl(Duration::from_secs(360_000)).unwrap();
  for i in 0..5 {
    cache.set(&format!("key{i}"), i).unwrap();
  }
  cache.close().unwrap();
  assert_eq!(cache.metrics().evicted, 5);
  assert_eq!(cache.count(), 0);
}

#[test]
fn a_clone_observes_the_close() {
  let cache: Cache<i32> = Cache::new();
  let clone = cache.clone();
  cache.set("key", 1).unwrap();
  clone.close().unwrap();
  assert_eq!(cache.get("key").unwrap_err(), Error::Closed);
  assert_eq!(cache.close().unwrap_err(), Error::Closed);
}
