//! Random additional wait time.
//!
//! With Jitter, throttling decisions report a retry hint that is
//! artificially inflated by a random duration (capped at a maximum,
//! with an optional minimum). This helps avoid thundering herds when
//! many throttled clients come back at the same instant.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A time interval specification that gets added to the wait time
/// returned with negative decisions.
#[derive(Debug, PartialEq, Eq, Default, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Jitter {
    min: Duration,
    interval: Duration,
}

impl Jitter {
    /// Constructs a new Jitter interval, waiting at most a duration of `max`.
    pub fn up_to(max: Duration) -> Jitter {
        Jitter {
            min: Duration::new(0, 0),
            interval: max,
        }
    }

    /// Constructs a new Jitter interval, waiting at least `min` and at most `min+interval`.
    pub fn new(min: Duration, interval: Duration) -> Jitter {
        Jitter { min, interval }
    }

    /// Returns a random amount of jitter within the configured interval.
    pub(crate) fn get(&self) -> Duration {
        let range = rand::random::<f32>();
        self.min.saturating_add(self.interval.mul_f32(range))
    }
}
