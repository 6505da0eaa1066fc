//! Configuration for the gatekeeper and its components.
//!
//! Every section has a `Default` matching what the link-shortening
//! front end runs with: five creations per client and minute, six
//! character codes, ten collision probes. With the `serde` feature
//! enabled, all sections can be deserialized, and missing fields fall
//! back to these defaults.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;

use crate::client::FALLBACK_CLIENT_KEY;
use crate::{ConfigError, Jitter};

/// Parameters of the per-client admission controller.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RateLimitConfig {
    /// Burst size: how many requests a fresh client can make back to
    /// back.
    pub capacity: NonZeroU32,
    /// Time for an empty bucket to refill completely.
    pub window: Duration,
    /// How long an idle bucket is kept. Twice the window if unset.
    pub retention: Option<Duration>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            capacity: nonzero!(5u32),
            window: Duration::from_secs(60),
            retention: None,
        }
    }
}

/// Parameters of the short code allocator.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AllocatorConfig {
    /// Length of generated codes.
    pub default_length: usize,
    /// How many generated candidates are probed before giving up on
    /// verified uniqueness.
    pub max_attempts: NonZeroU32,
    /// How many characters the unverified fallback code is longer
    /// than `default_length`.
    pub escalation: usize,
    /// Shortest accepted custom alias.
    pub alias_min_len: usize,
    /// Longest accepted custom alias.
    pub alias_max_len: usize,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        AllocatorConfig {
            default_length: 6,
            max_attempts: nonzero!(10u32),
            escalation: 2,
            alias_min_len: 4,
            alias_max_len: 10,
        }
    }
}

impl AllocatorConfig {
    /// Checks that the configured lengths can produce codes at all.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_length == 0 {
            return Err(ConfigError::ZeroCodeLength);
        }
        if self.alias_min_len == 0 || self.alias_min_len > self.alias_max_len {
            return Err(ConfigError::AliasBounds {
                min: self.alias_min_len,
                max: self.alias_max_len,
            });
        }
        Ok(())
    }

    /// Length of the code handed out when every probe collided.
    pub fn fallback_length(&self) -> usize {
        self.default_length + self.escalation
    }
}

/// Configuration of a whole [`Gatekeeper`](crate::Gatekeeper).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GatekeeperConfig {
    pub rate_limit: RateLimitConfig,
    pub allocator: AllocatorConfig,
    /// The key shared by all clients without a network address hint.
    pub fallback_client_key: String,
    /// Random extra wait added to retry hints of throttled requests.
    pub jitter: Option<Jitter>,
    /// How often [`shorten`](crate::Gatekeeper::shorten) re-allocates
    /// a generated code that lost the insert race.
    pub insert_attempts: NonZeroU32,
}

impl Default for GatekeeperConfig {
    fn default() -> Self {
        GatekeeperConfig {
            rate_limit: RateLimitConfig::default(),
            allocator: AllocatorConfig::default(),
            fallback_client_key: FALLBACK_CLIENT_KEY.to_string(),
            jitter: None,
            insert_attempts: nonzero!(3u32),
        }
    }
}
