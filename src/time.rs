//! Clock abstraction.
//!
//! Staleness, entry-id derivation and simulation ids all depend on "now".
//! Both the store and the simulator take an injected [`Clock`] so that tests
//! can move time forward explicitly instead of sleeping.

use std::fmt;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current wall-clock time in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A manually driven clock for deterministic tests.
///
/// Time only moves when [`ManualClock::advance`] or [`ManualClock::set`] is
/// called. Clones share the same underlying instant.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use zeropoint::time::{Clock, ManualClock};
///
/// let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
/// let clock = ManualClock::at(start);
/// clock.advance(Duration::days(8));
/// assert_eq!(clock.now(), start + Duration::days(8));
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<RwLock<DateTime<Utc>>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    #[must_use]
    pub fn at(start: DateTime<Utc>) -> Self {
        Self {
            current: Arc::new(RwLock::new(start)),
        }
    }

    /// Create a clock frozen at the current system time.
    #[must_use]
    pub fn starting_now() -> Self {
        Self::at(Utc::now())
    }

    /// Move time forward (or backward, for a negative duration).
    pub fn advance(&self, by: Duration) {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard += by;
    }

    /// Jump to an absolute instant.
    pub fn set(&self, to: DateTime<Utc>) {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.current.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Shared clock handle used by the store and the simulator.
pub type SharedClock = Arc<dyn Clock>;

/// Returns a shared handle to the system clock.
#[must_use]
pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_manual_clock_is_frozen_until_advanced() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let clock = ManualClock::at(start);
        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::hours(2));
        assert_eq!(clock.now(), start + Duration::hours(2));
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::starting_now();
        let other = clock.clone();
        clock.advance(Duration::days(1));
        assert_eq!(clock.now(), other.now());
    }

    #[test]
    fn test_manual_clock_set() {
        let clock = ManualClock::starting_now();
        let target = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        clock.set(target);
        assert_eq!(clock.now(), target);
    }

    #[test]
    fn test_system_clock_moves_forward() {
        let clock = system_clock();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
