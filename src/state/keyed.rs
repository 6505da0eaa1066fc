//! An in-memory rate limiter that keeps one bucket per client key.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::{
    algorithms::{BucketState, TokenBucket},
    clock::{Clock, DefaultClock, Reference},
    config::RateLimitConfig,
    thread_safety::ThreadsafeWrapper,
    ConfigError, Decision,
};

type Bucket<C> = ThreadsafeWrapper<BucketState<<C as Clock>::Instant>>;

/// A rate limiter that makes one independent admission decision per
/// key (e.g. per client IP address).
///
/// Buckets are created lazily, full, the first time a key is
/// checked, and live until [`cleanup_at`](#method.cleanup_at) finds
/// them idle. Clones of a `RateLimiter` share all buckets, so one
/// limiter can be handed to any number of request handler threads.
///
/// # Thread safety
/// Every bucket sits behind its own lock, which is held for the whole
/// refill-and-take step. The map from keys to buckets is locked only
/// to look up or insert a bucket, never while a decision is made.
pub struct RateLimiter<K: Eq + Hash + Clone, C: Clock = DefaultClock> {
    algorithm: TokenBucket,
    retention: Duration,
    clock: C,
    buckets: Arc<Mutex<HashMap<K, Bucket<C>>>>,
}

impl<K, C> Clone for RateLimiter<K, C>
where
    K: Eq + Hash + Clone,
    C: Clock,
{
    fn clone(&self) -> Self {
        RateLimiter {
            algorithm: self.algorithm,
            retention: self.retention,
            clock: self.clock.clone(),
            buckets: self.buckets.clone(),
        }
    }
}

impl<K, C> fmt::Debug for RateLimiter<K, C>
where
    K: Eq + Hash + Clone,
    C: Clock,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(
            f,
            "RateLimiter{{{params:?}, buckets: {n}}}",
            params = self.algorithm,
            n = self.len()
        )
    }
}

impl<K> RateLimiter<K, DefaultClock>
where
    K: Eq + Hash + Clone,
{
    /// Construct a new rate limiter that admits `capacity` requests
    /// per `window` and key, reading time from the monotonic clock.
    pub fn new(capacity: NonZeroU32, window: Duration) -> Result<Self, ConfigError> {
        Self::build_with_capacity(capacity).per(window).build()
    }

    /// Return a builder that can be used to construct a rate limiter
    /// using the parameters passed to the Builder.
    pub fn build_with_capacity(capacity: NonZeroU32) -> Builder<K, DefaultClock> {
        Builder {
            capacity,
            window: Duration::from_secs(60),
            retention: None,
            clock: DefaultClock::default(),
            keys: PhantomData,
        }
    }
}

impl<K, C> RateLimiter<K, C>
where
    K: Eq + Hash + Clone,
    C: Clock,
{
    /// Constructs a rate limiter from its configuration section.
    pub fn from_config(config: &RateLimitConfig, clock: C) -> Result<Self, ConfigError> {
        let mut builder = RateLimiter::<K>::build_with_capacity(config.capacity).with_clock(clock);
        builder.per(config.window);
        if let Some(retention) = config.retention {
            builder.retain_for(retention);
        }
        builder.build()
    }

    /// The bucket parameters this limiter decides with.
    pub fn algorithm(&self) -> &TokenBucket {
        &self.algorithm
    }

    /// The clock this limiter reads the current time from.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// How long a bucket may sit idle before the default cleanup
    /// removes it.
    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Tests whether a request from `key` can be admitted right now,
    /// as reported by the limiter's clock. See
    /// [`admit_at`](#method.admit_at).
    pub fn admit(&self, key: K) -> Decision {
        self.admit_at(key, self.clock.now())
    }

    /// Tests whether a request from `key` can be admitted at the
    /// instant `at`, and takes a token out of its bucket if so.
    ///
    /// A key that was never seen before gets a full bucket. This
    /// never fails; a negative answer is a [`Decision`] like any
    /// other.
    pub fn admit_at(&self, key: K, at: C::Instant) -> Decision {
        let bucket = self.bucket_for(key, at);
        let decision = self.algorithm.test_and_update(&bucket, at);
        trace!(
            allowed = decision.is_allowed(),
            remaining = decision.remaining(),
            "admission decision"
        );
        decision
    }

    fn bucket_for(&self, key: K, at: C::Instant) -> Bucket<C> {
        let algorithm = &self.algorithm;
        let mut buckets = self.buckets.lock();
        buckets
            .entry(key)
            .or_insert_with(|| {
                debug!("creating bucket for new client");
                ThreadsafeWrapper::new(algorithm.full_bucket(at))
            })
            .clone()
    }

    /// Returns a copy of the bucket state for `key`, if the key has a
    /// bucket. Does not create a bucket, and does not refill it.
    pub fn snapshot(&self, key: &K) -> Option<BucketState<C::Instant>> {
        let bucket = self.buckets.lock().get(key).cloned();
        bucket.map(|b| b.snapshot())
    }

    /// Returns the number of buckets currently tracked.
    pub fn len(&self) -> usize {
        self.buckets.lock().len()
    }

    /// Returns `true` if no key has a bucket.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes idle buckets, using the configured retention as of the
    /// clock's current time. See [`cleanup_at`](#method.cleanup_at).
    pub fn cleanup(&self) -> Vec<K> {
        self.cleanup_at(None, self.clock.now())
    }

    /// Removes the keys from this rate limiter that can be expired
    /// safely, and returns them.
    ///
    /// To be eligible for expiration, a key's bucket must not have
    /// been refilled for longer than `min_age` (the limiter's
    /// retention if `None`) as of the instant `at`. Any bucket that
    /// was idle for at least one window is full again, so removing it
    /// is indistinguishable from keeping it.
    ///
    /// # Race conditions
    /// Since this is happening concurrently with other operations,
    /// race conditions can & will occur. A request that looked up a
    /// bucket just before it got expired still decides against the
    /// expired bucket; the next request for that key starts over with
    /// a full one.
    pub fn cleanup_at<D: Into<Option<Duration>>>(&self, min_age: D, at: C::Instant) -> Vec<K> {
        let min_age = min_age.into().unwrap_or(self.retention);
        let mut removed = vec![];
        let mut buckets = self.buckets.lock();
        buckets.retain(|key, bucket| {
            let idle = at.duration_since(bucket.snapshot().last_refill());
            let keep = idle <= min_age;
            if !keep {
                removed.push(key.clone());
            }
            keep
        });
        if !removed.is_empty() {
            debug!(
                removed = removed.len(),
                remaining = buckets.len(),
                "expired idle buckets"
            );
        }
        removed
    }
}

/// An object that allows incrementally constructing [`RateLimiter`]
/// objects.
pub struct Builder<K, C>
where
    K: Eq + Hash + Clone,
    C: Clock,
{
    capacity: NonZeroU32,
    window: Duration,
    retention: Option<Duration>,
    clock: C,
    keys: PhantomData<K>,
}

impl<K, C> Builder<K, C>
where
    K: Eq + Hash + Clone,
    C: Clock,
{
    /// Sets the "unit of time" within which an empty bucket refills
    /// completely. Defaults to one minute.
    pub fn per(&mut self, window: Duration) -> &mut Builder<K, C> {
        self.window = window;
        self
    }

    /// Sets how long a bucket may be idle before the default cleanup
    /// expires it. Defaults to twice the window, capped at
    /// [`Duration::MAX`].
    pub fn retain_for(&mut self, retention: Duration) -> &mut Builder<K, C> {
        self.retention = Some(retention);
        self
    }

    /// Replaces the time source, e.g. with a
    /// [`FakeAbsoluteClock`](../../clock/struct.FakeAbsoluteClock.html)
    /// in tests.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Builder<K, C2> {
        Builder {
            capacity: self.capacity,
            window: self.window,
            retention: self.retention,
            clock,
            keys: PhantomData,
        }
    }

    /// Builds a rate limiter with the specified parameters.
    pub fn build(&self) -> Result<RateLimiter<K, C>, ConfigError> {
        let algorithm = TokenBucket::construct(self.capacity, self.window)?;
        Ok(RateLimiter {
            algorithm,
            retention: self
                .retention
                .unwrap_or_else(|| self.window.saturating_mul(2)),
            clock: self.clock.clone(),
            buckets: Arc::new(Mutex::new(HashMap::new())),
        })
    }
}
