//! The persistence collaborator, as far as the gatekeeper sees it.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::StoreError;

/// Outcome of an atomic insert into a [`CodeStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// The code was free and now maps to the target.
    Inserted,
    /// Another record already holds the code; nothing was written.
    Conflict,
}

/// The store holding issued short codes.
///
/// `exists` is a best-effort probe: a `false` answer may already be
/// stale by the time the caller acts on it. Only `insert_if_absent`
/// (backed by a uniqueness constraint in a real database) decides
/// whether a code is really free.
///
/// Implementations may block on network I/O in either method.
pub trait CodeStore {
    /// Returns whether a record with `code` exists.
    fn exists(&self, code: &str) -> Result<bool, StoreError>;

    /// Atomically stores `code -> target` unless `code` is taken.
    fn insert_if_absent(&self, code: &str, target: &str) -> Result<Insertion, StoreError>;
}

impl<'a, S: CodeStore + ?Sized> CodeStore for &'a S {
    fn exists(&self, code: &str) -> Result<bool, StoreError> {
        (**self).exists(code)
    }

    fn insert_if_absent(&self, code: &str, target: &str) -> Result<Insertion, StoreError> {
        (**self).insert_if_absent(code, target)
    }
}

impl<S: CodeStore + ?Sized> CodeStore for Arc<S> {
    fn exists(&self, code: &str) -> Result<bool, StoreError> {
        (**self).exists(code)
    }

    fn insert_if_absent(&self, code: &str, target: &str) -> Result<Insertion, StoreError> {
        (**self).insert_if_absent(code, target)
    }
}

/// A process-local code store, for tests and single-instance
/// deployments.
#[derive(Debug, Default)]
pub struct MemoryCodeStore {
    links: RwLock<HashMap<String, String>>,
}

impl MemoryCodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the target a code points to.
    pub fn get(&self, code: &str) -> Option<String> {
        self.links.read().get(code).cloned()
    }

    pub fn len(&self) -> usize {
        self.links.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.read().is_empty()
    }
}

impl CodeStore for MemoryCodeStore {
    fn exists(&self, code: &str) -> Result<bool, StoreError> {
        Ok(self.links.read().contains_key(code))
    }

    fn insert_if_absent(&self, code: &str, target: &str) -> Result<Insertion, StoreError> {
        let mut links = self.links.write();
        if links.contains_key(code) {
            return Ok(Insertion::Conflict);
        }
        links.insert(code.to_string(), target.to_string());
        Ok(Insertion::Inserted)
    }
}
