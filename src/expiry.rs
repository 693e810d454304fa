//! Expiration policy.
//!
//! Expirations are absolute Unix timestamps in whole seconds. Every
//! comparison against "now" goes through [`is_expired`] or through SQL that
//! binds [`Clock::now`] as a parameter, so reads, counts and cleanup agree on
//! one clock and one unit.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Unix timestamp in seconds.
pub type Timestamp = i64;

/// Source of the current time for expiry decisions.
pub trait Clock: Send + Sync {
    /// Current Unix time in seconds.
    fn now(&self) -> Timestamp;
}

/// Wall clock. A system time before the epoch reads as 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| Timestamp::try_from(d.as_secs()).unwrap_or(Timestamp::MAX))
    }
}

/// Manually driven clock for tests and simulations.
#[derive(Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Creates a clock fixed at `now`.
    pub const fn new(now: Timestamp) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    /// Moves the clock to `now`.
    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(duration_secs(by), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualClock").field("now", &self.now()).finish()
    }
}

/// Maps the "never expires" encodings (zero, negative) to `None`.
pub const fn normalize(expires_at: Option<Timestamp>) -> Option<Timestamp> {
    match expires_at {
        Some(t) if t > 0 => Some(t),
        _ => None,
    }
}

/// True when `expires_at` is set and not after `now`.
pub const fn is_expired(expires_at: Option<Timestamp>, now: Timestamp) -> bool {
    match normalize(expires_at) {
        Some(t) => t <= now,
        None => false,
    }
}

/// Absolute expiration `ttl` from `now`, saturating at `Timestamp::MAX`.
pub fn deadline(now: Timestamp, ttl: Duration) -> Timestamp {
    now.saturating_add(duration_secs(ttl))
}

/// Seconds remaining until `expires_at`, or `None` for unbounded records.
/// Already-expired records report zero.
pub fn remaining(expires_at: Option<Timestamp>, now: Timestamp) -> Option<Duration> {
    normalize(expires_at)
        .map(|t| Duration::from_secs(u64::try_from(t.saturating_sub(now)).unwrap_or(0)))
}

fn duration_secs(d: Duration) -> Timestamp {
    Timestamp::try_from(d.as_secs()).unwrap_or(Timestamp::MAX)
}
