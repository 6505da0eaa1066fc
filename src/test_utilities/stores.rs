//! Code stores that misbehave on purpose.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{CodeStore, Insertion, MemoryCodeStore, StoreError};

/// Claims that the first `taken` distinct codes it is asked about
/// exist, as if the store were densely filled around them. Every code
/// after that is free.
#[derive(Debug)]
pub struct CollidingStore {
    taken: usize,
    offered: Mutex<Vec<String>>,
}

impl CollidingStore {
    pub fn new(taken: usize) -> Self {
        CollidingStore {
            taken,
            offered: Mutex::new(vec![]),
        }
    }

    /// Every code probed so far, in order.
    pub fn offered(&self) -> Vec<String> {
        self.offered.lock().clone()
    }
}

impl CodeStore for CollidingStore {
    fn exists(&self, code: &str) -> Result<bool, StoreError> {
        let mut offered = self.offered.lock();
        let distinct_before = offered.iter().collect::<HashSet<_>>().len();
        let seen = offered.iter().any(|c| c == code);
        offered.push(code.to_string());
        Ok(seen || distinct_before < self.taken)
    }

    fn insert_if_absent(&self, _code: &str, _target: &str) -> Result<Insertion, StoreError> {
        Ok(Insertion::Inserted)
    }
}

/// A store that can't be reached.
#[derive(Debug, Default)]
pub struct UnreachableStore {
    probes: AtomicUsize,
}

impl UnreachableStore {
    /// How often the store was asked anything.
    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

impl CodeStore for UnreachableStore {
    fn exists(&self, _code: &str) -> Result<bool, StoreError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::new("connection refused"))
    }

    fn insert_if_absent(&self, _code: &str, _target: &str) -> Result<Insertion, StoreError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::new("connection refused"))
    }
}

/// Simulates concurrent writers: every probe says the code is free,
/// but the first `lost` inserts find the code already claimed by
/// someone else. Later inserts go through to a [`MemoryCodeStore`].
#[derive(Debug)]
pub struct RacingStore {
    lost: AtomicUsize,
    inner: MemoryCodeStore,
}

impl RacingStore {
    pub fn new(lost: usize) -> Self {
        RacingStore {
            lost: AtomicUsize::new(lost),
            inner: MemoryCodeStore::new(),
        }
    }

    /// The records that were actually written.
    pub fn inner(&self) -> &MemoryCodeStore {
        &self.inner
    }
}

impl CodeStore for RacingStore {
    fn exists(&self, _code: &str) -> Result<bool, StoreError> {
        Ok(false)
    }

    fn insert_if_absent(&self, code: &str, target: &str) -> Result<Insertion, StoreError> {
        let raced = self
            .lost
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if raced {
            return Ok(Insertion::Conflict);
        }
        self.inner.insert_if_absent(code, target)
    }
}
