use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Interior mutability for a single bucket's state, shared between
/// the keyed map and whichever threads are currently deciding on it.
///
/// Clones refer to the same underlying state.
#[derive(Clone)]
pub(crate) struct ThreadsafeWrapper<T>
where
    T: fmt::Debug + Clone,
{
    data: Arc<Mutex<T>>,
}

impl<T> fmt::Debug for ThreadsafeWrapper<T>
where
    T: fmt::Debug + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        self.data.lock().fmt(f)
    }
}

impl<T> ThreadsafeWrapper<T>
where
    T: fmt::Debug + Clone,
{
    pub(crate) fn new(data: T) -> Self {
        ThreadsafeWrapper {
            data: Arc::new(Mutex::new(data)),
        }
    }

    /// Retrieves the bucket's data, calls a function to make a
    /// decision and compute a new state, and then sets the state on
    /// the bucket.
    ///
    /// The lock is held for the whole read-modify-write, so no two
    /// decisions on the same bucket can observe the same old state.
    #[inline]
    pub(crate) fn measure_and_replace<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> (R, Option<T>),
    {
        let mut data = self.data.lock();
        let (decision, new_data) = f(&data);
        if let Some(new_data) = new_data {
            *data = new_data;
        }
        decision
    }

    /// Retrieves and returns a snapshot of the bucket state.
    ///
    /// # Thread safety
    /// This function operates threadsafely, but you're literally
    /// taking a copy of data that will change. Relying on the data
    /// that is returned *will* race.
    pub(crate) fn snapshot(&self) -> T {
        self.data.lock().clone()
    }
}
