use std::error::Error as StdError;
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;

/// An error that is returned when constructing a gatekeeper component
/// from parameters that can never work.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The refill window is zero, which would make every bucket
    /// refill instantly.
    #[error("refill window must be longer than zero")]
    ZeroWindow,

    /// The bucket capacity is so large that a single token would
    /// refill in less than a nanosecond.
    #[error("bucket capacity {capacity} too large to refill within {window:?}")]
    InconsistentCapacity {
        capacity: NonZeroU32,
        window: Duration,
    },

    /// Generated codes must have at least one character.
    #[error("generated code length must be at least 1")]
    ZeroCodeLength,

    /// The custom alias length bounds admit no length at all.
    #[error("alias length bounds {min}..={max} admit no alias")]
    AliasBounds { min: usize, max: usize },
}

/// Describes why a caller-supplied alias was rejected before the
/// store was consulted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AliasError {
    #[error("alias must be at least {min} characters long, got {len}")]
    TooShort { len: usize, min: usize },

    #[error("alias must be at most {max} characters long, got {len}")]
    TooLong { len: usize, max: usize },

    #[error("alias may only contain letters and digits, found {ch:?} at position {position}")]
    InvalidCharacter { ch: char, position: usize },
}

/// A failure of the code store itself (unreachable, timed out, ...),
/// as opposed to a negative answer from it.
#[derive(Debug, Error)]
#[error("code store unavailable: {source}")]
pub struct StoreError {
    #[source]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

impl StoreError {
    /// Wraps the store implementation's own error.
    pub fn new<E>(source: E) -> StoreError
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        StoreError {
            source: source.into(),
        }
    }
}

/// Gives information about why [`allocate`] could not hand out a
/// code.
///
/// `Validation` and `AliasConflict` are the caller's to fix; a
/// `Transient` error means the store could not be asked, and the
/// caller may retry with its own backoff policy.
///
/// [`allocate`]: crate::IdentifierAllocator::allocate
#[derive(Debug, Error)]
pub enum AllocationError {
    /// The custom alias is malformed.
    #[error("invalid alias: {0}")]
    Validation(#[from] AliasError),

    /// The (normalized) custom alias is already in use.
    #[error("alias {alias:?} is already taken")]
    AliasConflict { alias: String },

    /// The code store could not answer an existence probe.
    #[error(transparent)]
    Transient(#[from] StoreError),
}

impl AllocationError {
    /// Returns `true` if retrying the same request later might
    /// succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, AllocationError::Transient(_))
    }
}
