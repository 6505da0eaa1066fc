#![doc(hidden)]
//! A module for code shared between integration tests & benchmarks in this crate.

pub mod stores;

use std::time::Instant;

/// Returns a "current" moment that's suitable for tests.
pub fn current_moment() -> Instant {
    Instant::now()
}
