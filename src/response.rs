//! What the HTTP layer has to put on the wire for each outcome.
//!
//! This module speaks the [`http`] crate's vocabulary but does not
//! depend on any server framework; handlers copy the status code and
//! header map into their own response type.

use std::time::Duration;

use http::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use http::StatusCode;

use crate::{AllocationError, Decision, Rejection};

/// Header with the bucket capacity.
pub const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
/// Header with the tokens left after this request.
pub const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Rounds a wait time up to whole seconds, as `Retry-After` wants
/// them. Rounding down could send clients back too early.
pub fn retry_after_secs(wait: Duration) -> u64 {
    if wait.subsec_nanos() > 0 {
        wait.as_secs().saturating_add(1)
    } else {
        wait.as_secs()
    }
}

impl Decision {
    /// The rate-limit headers for a response to this decision. The
    /// `Retry-After` hint is only present on denials.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(3);
        headers.insert(LIMIT_HEADER, HeaderValue::from(self.limit()));
        headers.insert(REMAINING_HEADER, HeaderValue::from(self.remaining()));
        if !self.is_allowed() {
            headers.insert(
                RETRY_AFTER,
                HeaderValue::from(retry_after_secs(self.retry_after())),
            );
        }
        headers
    }
}

impl Rejection {
    /// The HTTP status code this rejection maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::Throttled(_) => StatusCode::TOO_MANY_REQUESTS,
            Rejection::Allocation(AllocationError::Validation(_)) => StatusCode::BAD_REQUEST,
            Rejection::Allocation(AllocationError::AliasConflict { .. }) => StatusCode::CONFLICT,
            Rejection::Allocation(AllocationError::Transient(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Rejection::Exhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Headers to send along with [`status`](#method.status).
    pub fn headers(&self) -> HeaderMap {
        match self {
            Rejection::Throttled(decision) => decision.headers(),
            _ => HeaderMap::new(),
        }
    }
}
