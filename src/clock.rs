//! Time sources for the rate limiter.
//!
//! The rate limiter never reads the system time directly; it asks a
//! [`Clock`] that was handed to it at construction time. This allows
//! mocking the passage of time in tests with [`FakeAbsoluteClock`].

use parking_lot::Mutex;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A measurement from a clock.
pub trait Reference: Sized + PartialEq + Eq + Ord + Copy + Clone + Send + Sync + Debug {
    /// Determines the time that separates two measurements of a
    /// clock. Returns the zero duration if `earlier` is actually
    /// later than `self`.
    fn duration_since(&self, earlier: Self) -> Duration;
}

/// A time source used by rate limiters.
pub trait Clock: Clone {
    /// A measurement of a monotonically increasing clock.
    type Instant: Reference;

    /// Returns a measurement of the clock.
    fn now(&self) -> Self::Instant;
}

/// The default clock that reports [`Instant`]s.
pub type DefaultClock = MonotonicClock;

impl Reference for Instant {
    fn duration_since(&self, earlier: Self) -> Duration {
        self.saturating_duration_since(earlier)
    }
}

/// The monotonic clock implemented by [`Instant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    type Instant = Instant;

    fn now(&self) -> Self::Instant {
        Instant::now()
    }
}

/// A mock implementation of a clock tracking [`Instant`]s. All it
/// does is keep track of what "now" is by allowing the program to
/// increment the current time (taken at time of construction) by some
/// arbitrary [`Duration`].
///
/// Clones share the same notion of "now": advancing one advances all
/// of them.
#[derive(Debug, Clone)]
pub struct FakeAbsoluteClock {
    now: Arc<Mutex<Instant>>,
}

impl Default for FakeAbsoluteClock {
    fn default() -> Self {
        FakeAbsoluteClock::starting_at(Instant::now())
    }
}

impl FakeAbsoluteClock {
    /// Constructs a fake clock that reads `start` until advanced.
    pub fn starting_at(start: Instant) -> Self {
        FakeAbsoluteClock {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Advances the fake clock by the given amount.
    pub fn advance(&self, by: Duration) {
        *(self.now.lock()) += by
    }
}

impl Clock for FakeAbsoluteClock {
    type Instant = Instant;

    fn now(&self) -> Self::Instant {
        *self.now.lock()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fake_clock_clones_share_time() {
        let clock = FakeAbsoluteClock::default();
        let other = clock.clone();
        let start = clock.now();
        other.advance(Duration::from_secs(3));
        assert_eq!(start + Duration::from_secs(3), clock.now());
    }

    /// A clock that counts whole seconds and supports nothing but
    /// comparison and distance.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    struct Tick(u64);

    impl Reference for Tick {
        fn duration_since(&self, earlier: Self) -> Duration {
            Duration::from_secs(self.0.saturating_sub(earlier.0))
        }
    }

    #[derive(Debug, Clone, Default)]
    struct TickClock(Arc<Mutex<u64>>);

    impl Clock for TickClock {
        type Instant = Tick;

        fn now(&self) -> Tick {
            Tick(*self.0.lock())
        }
    }

    #[test]
    fn any_ordered_measurement_drives_a_limiter() {
        let clock = TickClock::default();
        let lim = crate::RateLimiter::<u32>::build_with_capacity(nonzero!(2u32))
            .with_clock(clock.clone())
            .per(Duration::from_secs(10))
            .build()
            .unwrap();
        assert!(lim.admit(1).is_allowed());
        assert!(lim.admit(1).is_allowed());
        let denied = lim.admit(1);
        assert_eq!(Duration::from_secs(5), denied.retry_after());

        *clock.0.lock() = 5;
        assert!(lim.admit(1).is_allowed());
        assert_eq!(vec![1], lim.cleanup_at(None, Tick(26)));
    }

    #[test]
    fn instants_never_go_negative() {
        let now = Instant::now();
        let later = now + Duration::from_millis(5);
        assert_eq!(Duration::new(0, 0), Reference::duration_since(&now, later));
        assert_eq!(
            Duration::from_millis(5),
            Reference::duration_since(&later, now)
        );
    }
}
