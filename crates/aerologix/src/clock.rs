//! Wall-clock source for session timing.
//!
//! Session arithmetic only ever compares "now" against a stored start time,
//! so the clock is injected to keep that arithmetic testable.

use chrono::{DateTime, Utc};

/// A source of the current time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: std::sync::Arc<std::sync::Mutex<DateTime<Utc>>>,
}

#[cfg(test)]
impl ManualClock {
    /// Create a clock frozen at the given epoch offset in milliseconds.
    pub fn at_millis(millis: i64) -> Self {
        let start = DateTime::from_timestamp_millis(millis).expect("valid timestamp");
        Self {
            now: std::sync::Arc::new(std::sync::Mutex::new(start)),
        }
    }

    /// Move the clock to the given epoch offset in milliseconds.
    pub fn set_millis(&self, millis: i64) {
        *self.now.lock().unwrap() = DateTime::from_timestamp_millis(millis).expect("valid timestamp");
    }

    /// Advance the clock by the given number of milliseconds.
    pub fn advance_millis(&self, millis: i64) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::milliseconds(millis);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_moves_forward() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::at_millis(0);
        assert_eq!(clock.now().timestamp_millis(), 0);

        clock.advance_millis(1500);
        assert_eq!(clock.now().timestamp_millis(), 1500);

        clock.set_millis(60_000);
        assert_eq!(clock.now().timestamp_millis(), 60_000);
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::at_millis(0);
        let other = clock.clone();
        clock.advance_millis(42);
        assert_eq!(other.now().timestamp_millis(), 42);
    }
}
