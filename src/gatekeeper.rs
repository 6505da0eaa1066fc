//! The composition of admission control and code allocation that
//! guards short-link creation.

use std::num::NonZeroU32;

use thiserror::Error;
use tracing::{debug, info};

use crate::allocator::{Allocation, IdentifierAllocator};
use crate::client::client_key;
use crate::clock::{Clock, DefaultClock};
use crate::store::{CodeStore, Insertion};
use crate::{AllocationError, ConfigError, Decision, GatekeeperConfig, Jitter, RateLimiter};

/// Why a creation request was turned away.
#[derive(Debug, Error)]
pub enum Rejection {
    /// The client ran out of quota. Not a failure: the decision says
    /// when to come back.
    #[error("too many requests, retry after {:?}", .0.retry_after())]
    Throttled(Decision),

    /// No code could be allocated.
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    /// Every generated code lost the race to a concurrent insert.
    #[error("generated codes kept colliding on insert, gave up after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

/// A successful pass through the gatekeeper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    /// The admission decision, for the rate-limit response headers.
    pub decision: Decision,
    /// The allocated code.
    pub allocation: Allocation,
}

/// Protects short-link creation: throttles each client, then
/// allocates a code for the ones that get through.
///
/// The rate limiter is always consulted first, so throttled clients
/// never cause store traffic.
#[derive(Debug)]
pub struct Gatekeeper<S, C: Clock = DefaultClock> {
    limiter: RateLimiter<String, C>,
    allocator: IdentifierAllocator<S>,
    fallback_client_key: String,
    jitter: Option<Jitter>,
    insert_attempts: NonZeroU32,
}

impl<S: CodeStore> Gatekeeper<S, DefaultClock> {
    /// Constructs a gatekeeper that reads time from the monotonic
    /// clock.
    pub fn new(store: S, config: GatekeeperConfig) -> Result<Self, ConfigError> {
        Self::with_clock(store, config, DefaultClock::default())
    }
}

impl<S: CodeStore, C: Clock> Gatekeeper<S, C> {
    /// Constructs a gatekeeper with an explicit time source.
    pub fn with_clock(store: S, config: GatekeeperConfig, clock: C) -> Result<Self, ConfigError> {
        let limiter = RateLimiter::from_config(&config.rate_limit, clock)?;
        let allocator = IdentifierAllocator::with_config(store, config.allocator)?;
        Ok(Gatekeeper {
            limiter,
            allocator,
            fallback_client_key: config.fallback_client_key,
            jitter: config.jitter,
            insert_attempts: config.insert_attempts,
        })
    }

    pub fn limiter(&self) -> &RateLimiter<String, C> {
        &self.limiter
    }

    pub fn allocator(&self) -> &IdentifierAllocator<S> {
        &self.allocator
    }

    /// Derives the client key from request headers, using the
    /// configured fallback key for clients without an address hint.
    pub fn client_key<'a, I>(&self, headers: I) -> String
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        client_key(headers, &self.fallback_client_key)
    }

    /// Admits `client` against its quota, applying the configured
    /// jitter to denials.
    pub fn admit(&self, client: &str) -> Result<Decision, Rejection> {
        let decision = self.limiter.admit(client.to_string());
        if decision.is_allowed() {
            return Ok(decision);
        }
        let decision = match &self.jitter {
            Some(jitter) => decision.jitter(jitter),
            None => decision,
        };
        info!(retry_after = ?decision.retry_after(), "throttled link creation");
        Err(Rejection::Throttled(decision))
    }

    /// Runs one creation request through the gatekeeper: rate limit
    /// first, then allocation. The caller persists the returned code
    /// with [`CodeStore::insert_if_absent`].
    pub fn check(&self, client: &str, alias: Option<&str>) -> Result<Grant, Rejection> {
        let decision = self.admit(client)?;
        let allocation = self.allocator.allocate(alias)?;
        Ok(Grant {
            decision,
            allocation,
        })
    }

    /// Like [`check`](#method.check), and also persists the link
    /// through the allocator's store.
    ///
    /// The insert is the authoritative uniqueness check. If it finds
    /// a custom alias taken after the probe said it was free, the
    /// request fails with [`AllocationError::AliasConflict`], exactly
    /// as if the probe had caught it. A generated code that lost the
    /// race is replaced by a fresh allocation, up to the configured
    /// number of insert attempts. The client is charged one token per
    /// call, however many attempts it takes.
    pub fn shorten(
        &self,
        client: &str,
        alias: Option<&str>,
        target: &str,
    ) -> Result<Grant, Rejection> {
        let decision = self.admit(client)?;
        let attempts = self.insert_attempts.get();
        for attempt in 1..=attempts {
            let allocation = self.allocator.allocate(alias)?;
            let inserted = self
                .allocator
                .store()
                .insert_if_absent(allocation.code(), target)
                .map_err(AllocationError::from)?;
            match inserted {
                Insertion::Inserted => {
                    return Ok(Grant {
                        decision,
                        allocation,
                    })
                }
                Insertion::Conflict if allocation.is_custom() => {
                    return Err(AllocationError::AliasConflict {
                        alias: allocation.into_code(),
                    }
                    .into());
                }
                Insertion::Conflict => {
                    debug!(attempt, attempts, "generated code was taken on insert")
                }
            }
        }
        Err(Rejection::Exhausted { attempts })
    }
}
