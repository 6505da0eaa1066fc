use crate::jitter::Jitter;
use std::time::Duration;

/// A decision on a single admission check from the rate limiter.
///
/// Decisions are never stored; they carry everything a request
/// handler needs to either proceed or tell the client when to come
/// back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    allowed: bool,
    limit: u32,
    remaining: u32,
    retry_after: Duration,
}

impl Decision {
    pub(crate) fn allowed(limit: u32, remaining: u32) -> Decision {
        Decision {
            allowed: true,
            limit,
            remaining,
            retry_after: Duration::new(0, 0),
        }
    }

    pub(crate) fn denied(limit: u32, retry_after: Duration) -> Decision {
        Decision {
            allowed: false,
            limit,
            remaining: 0,
            retry_after,
        }
    }

    /// Returns `true` iff the request was admitted.
    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// The bucket capacity the decision was made against.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Whole tokens left in the bucket after this decision. Always 0
    /// for denials.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// The minimum time to wait until a request from the same client
    /// can be admitted. Zero for admitted requests.
    ///
    /// This does not account for thundering herds; see
    /// [`jitter`](#method.jitter).
    pub fn retry_after(&self) -> Duration {
        self.retry_after
    }

    /// Inflates the wait time of a denial by a random amount drawn
    /// from `jitter`. Admitted decisions are returned unchanged.
    pub fn jitter(self, jitter: &Jitter) -> Decision {
        if self.allowed {
            return self;
        }
        Decision {
            retry_after: self.retry_after.saturating_add(jitter.get()),
            ..self
        }
    }
}
