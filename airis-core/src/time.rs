//! Time sources for record timestamps
//!
//! Records carry a millisecond timestamp taken from a [`TimeSource`]:
//! - System clock (when `std` is available)
//! - Fixed clock (tests and replay)
//! - Any board RTC implementing the trait
//!
//! [`MonotonicClock`] wraps a source so timestamps never repeat or go
//! backwards inside one run, even when the wall clock is stepped.

use core::cell::Cell;

/// Timestamp in milliseconds since epoch (or device boot for monotonic)
pub type Timestamp = u64;

/// Source of time for the system
pub trait TimeSource {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;

    /// Check if this source provides wall clock time (vs monotonic)
    fn is_wall_clock(&self) -> bool;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now(&self) -> Timestamp {
        (**self).now()
    }

    fn is_wall_clock(&self) -> bool {
        (**self).is_wall_clock()
    }
}

/// System time source (requires std)
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTime;

#[cfg(feature = "std")]
impl TimeSource for SystemTime {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime as StdSystemTime, UNIX_EPOCH};

        StdSystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }

    fn is_wall_clock(&self) -> bool {
        true
    }
}

/// Fixed time source for testing
///
/// Interior mutability lets a test advance the clock while the aggregator
/// holds a shared reference to it.
#[derive(Debug, Clone, Default)]
pub struct FixedTime {
    timestamp: Cell<Timestamp>,
}

impl FixedTime {
    /// Clock frozen at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp: Cell::new(timestamp) }
    }

    /// Jump to `timestamp`
    pub fn set(&self, timestamp: Timestamp) {
        self.timestamp.set(timestamp);
    }

    /// Move forward by `ms`
    pub fn advance(&self, ms: u64) {
        self.timestamp.set(self.timestamp.get().saturating_add(ms));
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp.get()
    }

    fn is_wall_clock(&self) -> bool {
        false
    }
}

/// Strictly increasing view of another time source
///
/// If the inner source stalls or steps backwards, the previous timestamp plus
/// one millisecond is returned instead.
#[derive(Debug)]
pub struct MonotonicClock<T> {
    source: T,
    last: Cell<Option<Timestamp>>,
}

impl<T: TimeSource> MonotonicClock<T> {
    /// Wrap `source`
    pub fn new(source: T) -> Self {
        Self { source, last: Cell::new(None) }
    }

    /// The wrapped source
    pub fn source(&self) -> &T {
        &self.source
    }
}

impl<T: TimeSource> TimeSource for MonotonicClock<T> {
    fn now(&self) -> Timestamp {
        let current = self.source.now();
        let next = match self.last.get() {
            Some(last) if current <= last => {
                log::debug!("Clock did not advance ({} <= {}), nudging", current, last);
                last.saturating_add(1)
            }
            _ => current,
        };
        self.last.set(Some(next));
        next
    }

    fn is_wall_clock(&self) -> bool {
        self.source.is_wall_clock()
    }
}

/// Milliseconds elapsed from `earlier` to `later`, zero if the clock went backwards
pub fn elapsed_ms(earlier: Timestamp, later: Timestamp) -> u64 {
    later.saturating_sub(earlier)
}
