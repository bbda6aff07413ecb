use lapse::{Cache, Error};
use std::time::Duration;

#[test]
fn get_returns_what_set_stored() {
  let cache: Cache<String> = Cache::new();
  cache.set("hello", "world".to_string()).unwrap();
  assert_eq!(*cache.get("hello").unwrap(), "world");
  cache.close().unwrap();
}

#[test]
fn get_on_a_missing_key_is_not_found() {
  let cache: Cache<String> = Cache::new();
  assert_eq!(cache.get("hello").unwrap_err(), Error::NotFound);
  cache.close().unwrap();
}

#[test]
fn overwriting_replaces_the_value_in_place() {
  let cache: Cache<i32> = Cache::new();
  cache.set("key", 1).unwrap();
  cache.set("key", 2).unwrap();
  assert_eq!(*cache.get("key").unwrap(), 2);
  assert_eq!(cache.count(), 1);
  cache.close().unwrap();
}

#[test]
fn removing_twice_reports_not_found() {
  let cache: Cache<&str> = Cache::new();
  cache.set("key", "value").unwrap();
  assert_eq!(cache.remove("key"), Ok(()));
  assert_eq!(cache.remove("key"), Err(Error::NotFound));
  assert_eq!(cache.count(), 0);
  cache.close().unwrap();
}

#[test]
fn purge_empties_the_cache() {
  let cache: Cache<&str> = Cache::new();
  for key in ["a", "b", "c"] {
    cache.set(key, "value").unwrap();
  }
  assert_eq!(cache.count(), 3);
  cache.purge().unwrap();
  assert_eq!(cache.count(), 0);
  assert_eq!(cache.metrics().evicted, 3);
  cache.close().unwrap();
}

#[test]
fn metrics_track_activity() {
  let cache: Cache<&str> = Cache::new();
  cache.set_ttl(Duration::from_secs(1)).unwrap();
  cache.set("myKey", "myData").unwrap();
  cache
    .set_with_ttl("myKey2", "myData", Duration::from_secs(1))
    .unwrap();

  cache.get("myKey").unwrap();
  assert_eq!(cache.get("myMiss").unwrap_err(), Error::NotFound);

  let metrics = cache.metrics();
  assert_eq!(metrics.inserted, 2);
  assert_eq!(metrics.hits, 1);
  assert_eq!(metrics.misses, 1);
  assert_eq!(metrics.retrievals, 1);
  assert_eq!(metrics.evicted, 0);

  cache.purge().unwrap();
  assert_eq!(cache.metrics().evicted, 2);
  cache.close().unwrap();
}

#[test]
fn counters_never_go_backwards() {
  let cache: Cache<i32> = Cache::new();
  let mut previous = cache.metrics();
  for i in 0..20 {
    let key = format!("key{}", i % 5);
    cache.set(&key, i).unwrap();
    let _ = cache.get(&key);
    let _ = cache.get("absent");
    let _ = cache.remove(&key);

    let current = cache.metrics();
    assert!(current.inserted >= previous.inserted);
    assert!(current.hits >= previous.hits);
    assert!(current.misses >= previous.misses);
    assert!(current.retrievals >= previous.retrievals);
    assert!(current.evicted >= previous.evicted);
    previous = current;
  }
  cache.close().unwrap();
}
