//! Handing out short codes without a central sequence.
//!
//! The allocator keeps no state between calls. It either validates a
//! custom alias, or draws random codes and probes the [`CodeStore`]
//! for each one until it finds a free code or runs out of attempts.
//!
//! Probing only makes collisions unlikely; it cannot exclude them,
//! since another request may claim the same code between the probe
//! and the caller's insert. The caller must therefore persist with
//! [`CodeStore::insert_if_absent`] and treat a conflict there as a
//! normal outcome.

mod alias;
mod code;

pub use self::alias::normalize_alias;
pub use self::code::{is_code, ALPHABET};

use rand::rngs::OsRng;
use tracing::{debug, trace, warn};

use self::code::random_code;
use crate::{AllocationError, AllocatorConfig, CodeStore, ConfigError};

/// Where an allocated code came from, and how much its uniqueness
/// was checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// A caller-supplied alias that was free when probed.
    Custom,
    /// A random code that was free when probed.
    Generated,
    /// A random, longer code that was never probed, because every
    /// probed candidate collided. It is only *likely* to be unique.
    Unverified,
}

/// A short code ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    code: String,
    provenance: Provenance,
}

impl Allocation {
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn into_code(self) -> String {
        self.code
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    /// Returns `true` if the code is the caller's own alias.
    pub fn is_custom(&self) -> bool {
        self.provenance == Provenance::Custom
    }

    /// Returns `false` for codes from the unprobed fallback path.
    pub fn is_verified(&self) -> bool {
        self.provenance != Provenance::Unverified
    }
}

/// Produces short codes that are, with high probability, not yet
/// present in the store `S`.
#[derive(Debug)]
pub struct IdentifierAllocator<S> {
    store: S,
    config: AllocatorConfig,
}

impl<S: CodeStore> IdentifierAllocator<S> {
    /// Constructs an allocator with the default parameters: six
    /// character codes, ten probes, aliases of four to ten
    /// characters.
    pub fn new(store: S) -> Self {
        IdentifierAllocator {
            store,
            config: AllocatorConfig::default(),
        }
    }

    /// Constructs an allocator with the given parameters.
    pub fn with_config(store: S, config: AllocatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(IdentifierAllocator { store, config })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Returns a code for a new short link: the normalized `alias` if
    /// one is given, a random code otherwise. An empty alias counts
    /// as no alias.
    ///
    /// # Errors
    /// * [`AllocationError::Validation`] if the alias is malformed.
    /// * [`AllocationError::AliasConflict`] if the alias is taken.
    /// * [`AllocationError::Transient`] if the store could not be
    ///   probed. The allocator never retries this itself.
    pub fn allocate(&self, alias: Option<&str>) -> Result<Allocation, AllocationError> {
        match alias.filter(|alias| !alias.is_empty()) {
            Some(alias) => self.allocate_custom(alias),
            None => self.generate(),
        }
    }

    fn allocate_custom(&self, alias: &str) -> Result<Allocation, AllocationError> {
        let code = normalize_alias(alias, self.config.alias_min_len, self.config.alias_max_len)?;
        if self.probe(&code)? {
            return Err(AllocationError::AliasConflict { alias: code });
        }
        Ok(Allocation {
            code,
            provenance: Provenance::Custom,
        })
    }

    fn generate(&self) -> Result<Allocation, AllocationError> {
        let max_attempts = self.config.max_attempts.get();
        for attempt in 1..=max_attempts {
            let candidate = random_code(&mut OsRng, self.config.default_length);
            if !self.probe(&candidate)? {
                return Ok(Allocation {
                    code: candidate,
                    provenance: Provenance::Generated,
                });
            }
            debug!(attempt, max_attempts, "generated code collided");
        }

        let code = random_code(&mut OsRng, self.config.fallback_length());
        warn!(
            attempts = max_attempts,
            length = code.len(),
            "every probed code collided, handing out an unverified longer code"
        );
        Ok(Allocation {
            code,
            provenance: Provenance::Unverified,
        })
    }

    fn probe(&self, code: &str) -> Result<bool, AllocationError> {
        trace!(code, "probing code store");
        self.store.exists(code).map_err(|err| {
            warn!(error = %err, "code store probe failed");
            AllocationError::Transient(err)
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::MemoryCodeStore;

    #[test]
    fn empty_alias_means_generate() {
        let alloc = IdentifierAllocator::new(MemoryCodeStore::new());
        let allocation = alloc.allocate(Some("")).unwrap();
        assert_eq!(Provenance::Generated, allocation.provenance());
        assert_eq!(6, allocation.code().len());
    }

    #[test]
    fn custom_aliases_are_lowercased() {
        let alloc = IdentifierAllocator::new(MemoryCodeStore::new());
        let allocation = alloc.allocate(Some("MyLink")).unwrap();
        assert!(allocation.is_custom());
        assert!(allocation.is_verified());
        assert_eq!("mylink", allocation.into_code());
    }

    #[test]
    fn rejects_bad_config() {
        let config = AllocatorConfig {
            alias_min_len: 8,
            alias_max_len: 4,
            ..AllocatorConfig::default()
        };
        assert!(IdentifierAllocator::with_config(MemoryCodeStore::new(), config).is_err());
    }
}
