//! # Write-path gatekeeping for a link shortener
//!
//! This crate guards the creation of short links with two
//! independent parts, composed by the [`Gatekeeper`]:
//!
//! * a per-client admission controller, the [`RateLimiter`], which
//!   throttles clients with a
//!   [token bucket](https://en.wikipedia.org/wiki/Token_bucket), and
//! * an [`IdentifierAllocator`], which hands out short codes that are
//!   unique with high probability, without a central sequence and
//!   without locking the store.
//!
//! Everything else a link shortener does (rendering, redirects,
//! analytics) lives elsewhere; the only collaborator this crate talks
//! to is the [`CodeStore`] that holds issued codes.
//!
//! ## Interface
//!
//! A gatekeeper is constructed from a [`GatekeeperConfig`] and a
//! store, and then asked once per creation request:
//!
//! ```rust
//! use http::StatusCode;
//! use shortlink_gatekeeper::{Gatekeeper, GatekeeperConfig, MemoryCodeStore, Rejection};
//!
//! let gk = Gatekeeper::new(MemoryCodeStore::new(), GatekeeperConfig::default()).unwrap();
//! let client = gk.client_key(vec![("x-forwarded-for", "203.0.113.5")]);
//!
//! let grant = gk.shorten(&client, Some("Launch"), "https://example.com/launch").unwrap();
//! assert_eq!("launch", grant.allocation.code());
//!
//! match gk.shorten(&client, Some("launch"), "https://example.com/other") {
//!     Err(rejection @ Rejection::Allocation(_)) => assert_eq!(StatusCode::CONFLICT, rejection.status()),
//!     other => panic!("expected a conflict, got {:?}", other),
//! }
//! ```
//!
//! The gatekeeper always asks the rate limiter first; a throttled
//! client never causes any store traffic. The negative decision comes
//! with the time after which the client's next request would be
//! admitted, which [`Rejection::headers`] turns into a `Retry-After`
//! header.
//!
//! ## Rate limiting
//!
//! Each client key gets its own bucket of `capacity` tokens, which
//! refills at `capacity` tokens per `window`. Buckets are refilled
//! lazily, whenever a key is checked, so idle clients cost nothing
//! but memory; a [`Sweeper`] can expire buckets that have been idle
//! for a while.
//!
//! The bucket state lives in an explicit [`RateLimiter`] value that
//! reads time from an injected [`Clock`](clock::Clock). There is no
//! process-wide table, and tests can drive time by hand:
//!
//! ```rust
//! # #[macro_use] extern crate nonzero_ext;
//! # fn main () {
//! use std::time::Duration;
//! use shortlink_gatekeeper::{clock::FakeAbsoluteClock, RateLimiter};
//!
//! let clock = FakeAbsoluteClock::default();
//! let lim = RateLimiter::<&str>::build_with_capacity(nonzero!(5u32))
//!     .with_clock(clock.clone())
//!     .per(Duration::from_secs(60))
//!     .build()
//!     .unwrap();
//! for _ in 0..5 {
//!     assert!(lim.admit("198.51.100.7").is_allowed());
//! }
//! let denied = lim.admit("198.51.100.7");
//! assert_eq!(Duration::from_secs(12), denied.retry_after());
//!
//! clock.advance(denied.retry_after());
//! assert!(lim.admit("198.51.100.7").is_allowed());
//! # }
//! ```
//!
//! The limiter state is local to the process. Several instances
//! behind a load balancer each enforce their own quota, so the
//! effective rate is multiplied by the number of instances.
//!
//! ## Allocating codes
//!
//! Custom aliases are validated (four to ten ASCII letters or digits),
//! lowercased and probed once. Generated codes are six characters
//! drawn from the operating system's secure random number generator
//! and probed until one is free; after ten collisions, the allocator
//! stops probing and returns an eight character code, trading a
//! verified answer for bounded latency (see [`Provenance`]).
//!
//! A probe can only ever be a hint. The store's atomic
//! [`insert_if_absent`](CodeStore::insert_if_absent) is the real
//! uniqueness check, and callers persisting the code must be prepared
//! for it to report a conflict.
//!
//! ## Thread-safe operation
//!
//! Gatekeepers and rate limiters are `Sync` and can be shared between
//! request handler threads; admission decisions for a single key are
//! linearizable.

#[macro_use]
extern crate nonzero_ext;

pub mod algorithms;
pub mod allocator;
pub mod client;
pub mod clock;
pub mod config;
mod decision;
mod errors;
mod gatekeeper;
mod jitter;
pub mod prelude;
pub mod response;
pub mod state;
pub mod store;
mod thread_safety;

#[doc(hidden)]
pub mod test_utilities;

pub use self::allocator::{Allocation, IdentifierAllocator, Provenance};
pub use self::config::{AllocatorConfig, GatekeeperConfig, RateLimitConfig};
pub use self::decision::Decision;
pub use self::errors::*;
pub use self::gatekeeper::{Gatekeeper, Grant, Rejection};
pub use self::jitter::Jitter;
pub use self::state::{RateLimiter, Sweeper};
pub use self::store::{CodeStore, Insertion, MemoryCodeStore};
