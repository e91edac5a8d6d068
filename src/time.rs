use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

pub type Timestamp = DateTime<Utc>;

/// Source of "now" for lease validity decisions.
///
/// The store's clock is authoritative for expiry; injecting a clock keeps
/// expiry behaviour deterministic in tests.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> Timestamp;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// A clock that only moves when told to. Test tooling.
#[derive(Debug)]
pub struct ManualClock {
    base: Timestamp,
    offset_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(base: Timestamp) -> Self {
        Self {
            base,
            offset_ms: AtomicI64::new(0),
        }
    }

    /// Start at the Unix epoch, so test timestamps read as plain offsets.
    pub fn at_epoch() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn advance(&self, by: std::time::Duration) {
        self.offset_ms
            .fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, millis: i64) {
        self.offset_ms.fetch_add(millis, Ordering::SeqCst);
    }

    /// Jump to an absolute offset from the base time.
    pub fn set_ms(&self, millis: i64) {
        self.offset_ms.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.base + Duration::milliseconds(self.offset_ms.load(Ordering::SeqCst))
    }
}
