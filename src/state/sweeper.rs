//! Background expiry of idle buckets.

use std::hash::Hash;
use std::io;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, trace};

use super::keyed::RateLimiter;
use crate::clock::Clock;

/// A handle on a thread that periodically calls
/// [`RateLimiter::cleanup`] on a shared rate limiter.
///
/// The thread stops when [`stop`](#method.stop) is called or the
/// handle is dropped.
#[derive(Debug)]
pub struct Sweeper {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl<K, C> RateLimiter<K, C>
where
    K: Eq + Hash + Clone + Send + 'static,
    C: Clock + Send + 'static,
{
    /// Starts a background thread that expires idle buckets every
    /// `every` (typically the refill window), bounding the memory
    /// held for an unbounded key space such as client addresses.
    ///
    /// Sweeping is housekeeping only: admission decisions are correct
    /// whether or not a sweeper runs.
    ///
    /// # Errors
    /// Returns an [`io::ErrorKind::InvalidInput`] error for a zero
    /// interval, and whatever spawning the thread fails with.
    pub fn spawn_sweeper(&self, every: Duration) -> io::Result<Sweeper> {
        if every == Duration::new(0, 0) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "sweep interval must be longer than zero",
            ));
        }
        let limiter = self.clone();
        let (stop, stopped) = mpsc::channel::<()>();
        let thread = thread::Builder::new()
            .name("bucket-sweeper".into())
            .spawn(move || loop {
                match stopped.recv_timeout(every) {
                    Err(RecvTimeoutError::Timeout) => {
                        let removed = limiter.cleanup();
                        trace!(removed = removed.len(), "sweep done");
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                        debug!("bucket sweeper stopping");
                        break;
                    }
                }
            })?;
        Ok(Sweeper {
            stop: Some(stop),
            thread: Some(thread),
        })
    }
}

impl Sweeper {
    /// Stops the sweeper thread and waits for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender wakes the thread up right away.
        self.stop.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                debug!("bucket sweeper panicked");
            }
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::clock::FakeAbsoluteClock;

    #[test]
    fn sweeps_idle_buckets_in_the_background() {
        let clock = FakeAbsoluteClock::default();
        let lim = RateLimiter::<u32>::build_with_capacity(nonzero!(1u32))
            .with_clock(clock.clone())
            .per(Duration::from_secs(1))
            .build()
            .unwrap();
        lim.admit(1);
        lim.admit(2);
        clock.advance(Duration::from_secs(5));

        let sweeper = lim.spawn_sweeper(Duration::from_millis(5)).unwrap();
        let mut waited = 0;
        while !lim.is_empty() && waited < 2000 {
            thread::sleep(Duration::from_millis(5));
            waited += 5;
        }
        sweeper.stop();
        assert!(lim.is_empty(), "{:?}", lim);
    }

    #[test]
    fn refuses_a_zero_interval() {
        let lim = RateLimiter::<u32>::new(nonzero!(1u32), Duration::from_secs(1)).unwrap();
        let err = lim.spawn_sweeper(Duration::new(0, 0)).unwrap_err();
        assert_eq!(io::ErrorKind::InvalidInput, err.kind());
        assert!(lim.spawn_sweeper(Duration::from_nanos(1)).is_ok());
    }

    #[test]
    fn dropping_the_handle_stops_the_thread() {
        let lim = RateLimiter::<u32>::new(nonzero!(1u32), Duration::from_secs(1)).unwrap();
        let sweeper = lim.spawn_sweeper(Duration::from_secs(3600)).unwrap();
        // Would hang for an hour if the drop didn't wake the thread up.
        drop(sweeper);
    }
}
