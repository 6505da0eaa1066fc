//! A classic token bucket with lazy refill.

use crate::clock::Reference;
use crate::thread_safety::ThreadsafeWrapper;
use crate::{ConfigError, Decision};

use std::cmp;
use std::num::NonZeroU32;
use std::time::Duration;

/// Implements the token bucket rate-limiting algorithm. The bucket
/// holds up to `capacity` tokens, each admitted request takes one
/// out, and tokens flow back in at a steady rate of `capacity` per
/// `window`. Requests that find less than one token in the bucket are
/// denied.
///
/// # Refill implementation
///
/// Instead of having a background task top up the bucket, this
/// implementation re-computes the fill level of the bucket on every
/// call to [`test_and_update`](#method.test_and_update), from the time
/// that passed since the previous call.
///
/// # Token accounting
///
/// Tokens are kept as a time budget rather than as a float: one
/// token is worth one *emission interval* (`window / capacity`), the
/// time it takes the bucket to refill a single token. The refill is
/// then plain addition of elapsed time, capped at the budget of a
/// full bucket, and the wait time for a denied request is exactly the
/// budget that is still missing for one token.
///
/// # Example
/// ```
/// # use std::time::{Duration, Instant};
/// # use shortlink_gatekeeper::RateLimiter;
/// # #[macro_use] extern crate nonzero_ext;
/// # fn main () {
/// let lim = RateLimiter::<&str>::new(nonzero!(2u32), Duration::from_secs(60)).unwrap();
/// let now = Instant::now();
/// assert!(lim.admit_at("client", now).is_allowed());
/// assert!(lim.admit_at("client", now).is_allowed());
/// let denied = lim.admit_at("client", now);
/// assert!(!denied.is_allowed());
/// assert_eq!(Duration::from_secs(30), denied.retry_after());
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBucket {
    capacity: NonZeroU32,
    window: Duration,
    emission_interval: Duration,
    full: Duration,
}

/// Represents the state of a single client's bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketState<P: Reference> {
    budget: Duration,
    last_refill: P,
}

impl<P: Reference> BucketState<P> {
    /// The last time instant the bucket's fill level was computed.
    pub fn last_refill(&self) -> P {
        self.last_refill
    }
}

impl TokenBucket {
    /// Constructs the bucket parameters for `capacity` tokens that
    /// refill completely within `window`.
    pub fn construct(capacity: NonZeroU32, window: Duration) -> Result<TokenBucket, ConfigError> {
        if window == Duration::new(0, 0) {
            return Err(ConfigError::ZeroWindow);
        }
        let emission_interval = window / capacity.get();
        if emission_interval == Duration::new(0, 0) {
            return Err(ConfigError::InconsistentCapacity { capacity, window });
        }
        Ok(TokenBucket {
            capacity,
            window,
            emission_interval,
            full: emission_interval * capacity.get(),
        })
    }

    /// The burst size of each bucket.
    pub fn capacity(&self) -> NonZeroU32 {
        self.capacity
    }

    /// The time in which an empty bucket refills completely.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// The time it takes to refill one token, i.e. `1 / refill rate`.
    pub fn emission_interval(&self) -> Duration {
        self.emission_interval
    }

    /// A bucket as it looks on first contact with a client: full.
    pub fn full_bucket<P: Reference>(&self, at: P) -> BucketState<P> {
        BucketState {
            budget: self.full,
            last_refill: at,
        }
    }

    /// Returns the (fractional) number of tokens in the bucket as of
    /// its last refill.
    pub fn tokens<P: Reference>(&self, state: &BucketState<P>) -> f64 {
        state.budget.as_secs_f64() / self.emission_interval.as_secs_f64()
    }

    fn whole_tokens(&self, budget: Duration) -> u32 {
        // budget never exceeds `full`, so this fits in a u32.
        (budget.as_nanos() / self.emission_interval.as_nanos()) as u32
    }

    /// Refills the bucket up to the instant `t0`, then tests whether
    /// one token can be taken out of it. The refill is always
    /// recorded; the token is only removed if the request is
    /// admitted.
    pub(crate) fn test_and_update<P: Reference>(
        &self,
        state: &ThreadsafeWrapper<BucketState<P>>,
        t0: P,
    ) -> Decision {
        state.measure_and_replace(|state| {
            let last = state.last_refill;
            // Prevent time travel: If any parallel calls get re-ordered,
            // or any tests attempt silly things, make sure to answer from
            // the last query onwards instead.
            let t0 = cmp::max(t0, last);
            let budget = cmp::min(
                self.full,
                state.budget.saturating_add(t0.duration_since(last)),
            );
            if budget >= self.emission_interval {
                let budget = budget - self.emission_interval;
                (
                    Decision::allowed(self.capacity.get(), self.whole_tokens(budget)),
                    Some(BucketState {
                        budget,
                        last_refill: t0,
                    }),
                )
            } else {
                (
                    Decision::denied(self.capacity.get(), self.emission_interval - budget),
                    Some(BucketState {
                        budget,
                        last_refill: t0,
                    }),
                )
            }
        })
    }
}
