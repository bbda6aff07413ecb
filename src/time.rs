use once_cell::sync::Lazy;
use std::time::{Duration, Instant};

// Every timestamp is measured from this process-local origin, captured the
// first time anything reads the clock.
static CLOCK_ORIGIN: Lazy<Instant> = Lazy::new(Instant::now);

/// A timestamp in nanoseconds since the clock origin.
pub(crate) type Nanos = u64;

/// Sentinel deadline for entries that never expire by time. It sorts after
/// every real deadline.
pub(crate) const NEVER: Nanos = u64::MAX;

/// The current time as nanoseconds since the clock origin.
#[inline]
pub(crate) fn now_nanos() -> Nanos {
  Instant::now()
    .saturating_duration_since(*CLOCK_ORIGIN)
    .as_nanos() as u64
}

/// The deadline `duration` past `from`, saturating into the sentinel for
/// absurdly large durations.
#[inline]
pub(crate) fn deadline_after(from: Nanos, duration: Duration) -> Nanos {
  from.saturating_add(duration.as_nanos().min(u128::from(u64::MAX)) as u64)
}
