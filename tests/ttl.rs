use lapse::{Cache, Error, Ttl};
use std::thread;
use std::time::{Duration, Instant};

const SHORT_TTL: Duration = Duration::from_millis(100);
const SLEEP_MARGIN: Duration = Duration::from_millis(150);

#[test]
fn entries_expire_after_the_global_ttl() {
  let cache: Cache<&str> = Cache::new();
  cache.set_ttl(SHORT_TTL).unwrap();
  cache.set("key_1", "value").unwrap();
  cache.set("key_2", "value").unwrap();
  thread::sleep(SHORT_TTL + SLEEP_MARGIN);
  assert_eq!(cache.count(), 0, "cache should be empty");
  cache.close().unwrap();
}

#[test]
fn entries_without_any_ttl_never_expire() {
  let cache: Cache<&str> = Cache::new();
  cache.set("key", "value").unwrap();
  thread::sleep(Duration::from_millis(50));
  assert_eq!(*cache.get("key").unwrap(), "value");
  cache.close().unwrap();
}

#[test]
fn a_per_entry_ttl_overrides_a_shorter_global_ttl() {
  let cache: Cache<&str> = Cache::new();
  cache.set_ttl(Duration::from_millis(50)).unwrap();
  cache
    .set_with_ttl("key", "value", Duration::from_millis(100))
    .unwrap();
  thread::sleep(Duration::from_millis(150) + SLEEP_MARGIN);
  assert_eq!(cache.get("key").unwrap_err(), Error::NotFound);
  cache.close().unwrap();
}

#[test]
fn entries_stored_before_a_global_ttl_keep_their_deadline() {
  let cache: Cache<&str> = Cache::new();
  cache.set("key_1", "value").unwrap();
  cache.set_ttl(SHORT_TTL).unwrap();
  cache.set("key_2", "value").unwrap();
  thread::sleep(SHORT_TTL + SLEEP_MARGIN);
  assert_eq!(cache.count(), 1, "only the pre-TTL entry should remain");
  assert!(cache.get("key_1").is_ok());
  cache.close().unwrap();
}

#[test]
fn a_hit_adopts_a_newly_configured_global_ttl() {
  let cache: Cache<&str> = Cache::new();
  cache.set("key", "value").unwrap();
  thread::sleep(Duration::from_millis(50));
  assert!(cache.get("key").is_ok());

  // The entry was stored with no TTL anywhere; the next hit re-anchors its
  // deadline against the TTL configured now.
  cache.set_ttl(SHORT_TTL).unwrap();
  assert!(cache.get("key").is_ok());

  thread::sleep(SHORT_TTL + SLEEP_MARGIN);
  assert_eq!(cache.get("key").unwrap_err(), Error::NotFound);
  cache.close().unwrap();
}

#[test]
fn hits_keep_extending_the_deadline() {
  let cache: Cache<&str> = Cache::new();
  cache.set_ttl(SHORT_TTL).unwrap();
  cache.set("test", "!").unwrap();
  let start = Instant::now();
  while start.elapsed() < Duration::from_secs(1) {
    assert!(
      cache.get("test").is_ok(),
      "entry expired despite constant hits"
    );
    thread::sleep(Duration::from_millis(10));
  }
  cache.close().unwrap();
}

#[test]
fn skipping_extension_lets_a_hot_entry_expire() {
  let cache: Cache<&str> = Cache::new();
  cache.set_ttl(SHORT_TTL).unwrap();
  cache.skip_ttl_extension_on_hit(true);
  cache.set("test", "!").unwrap();
  let start = Instant::now();
  while cache.get("test").is_ok() {
    assert!(start.elapsed() < Duration::from_secs(5), "entry never expired");
    thread::sleep(Duration::from_millis(5));
  }
  cache.close().unwrap();
}

#[test]
fn a_zero_per_entry_ttl_defers_to_the_global_ttl() {
  let cache: Cache<&str> = Cache::new();
  cache.set_ttl(SHORT_TTL).unwrap();
  cache.set_with_ttl("key", "value", Duration::ZERO).unwrap();
  assert!(
    cache.get("key").is_ok(),
    "a zero TTL must not expire the entry immediately"
  );
  thread::sleep(SHORT_TTL + SLEEP_MARGIN);
  assert_eq!(cache.count(), 0, "the entry should follow the global TTL");
  cache.close().unwrap();
}

#[test]
fn a_zero_per_entry_ttl_without_a_global_ttl_never_expires() {
  let cache: Cache<&str> = Cache::new();
  cache.set_with_ttl("key", "value", Duration::ZERO).unwrap();
  thread::sleep(Duration::from_millis(50));
  assert!(cache.get("key").is_ok());
  cache.close().unwrap();
}

#[test]
fn never_expiring_entries_outlive_the_global_ttl() {
  let cache: Cache<&str> = Cache::new();
  cache.set_ttl(SHORT_TTL).unwrap();
  cache.set_with_ttl("pinned", "value", Ttl::Never).unwrap();
  thread::sleep(SHORT_TTL + SLEEP_MARGIN);
  assert_eq!(cache.count(), 1);
  assert!(cache.get("pinned").is_ok());
  cache.close().unwrap();
}

#[test]
fn overwriting_resets_value_and_deadline() {
  let cache: Cache<&str> = Cache::new();
  cache.set_ttl(Duration::from_millis(100)).unwrap();
  cache
    .set_with_ttl("key", "value", Duration::from_millis(50))
    .unwrap();
  thread::sleep(Duration::from_millis(30));
  cache
    .set_with_ttl("key", "value2", Duration::from_millis(50))
    .unwrap();
  assert_eq!(*cache.get("key").unwrap(), "value2");
  cache.close().unwrap();
}
