#[macro_use]
extern crate nonzero_ext;

use shortlink_gatekeeper::clock::FakeAbsoluteClock;
use shortlink_gatekeeper::test_utilities::current_moment;
use shortlink_gatekeeper::{ConfigError, RateLimitConfig, RateLimiter};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[test]
fn accepts_first_request() {
    let lim = RateLimiter::<&str>::new(nonzero!(5u32), Duration::from_secs(60)).unwrap();
    let decision = lim.admit("foo");
    assert!(decision.is_allowed());
    assert_eq!(4, decision.remaining());
    assert_eq!(5, decision.limit());
    assert_eq!(Duration::new(0, 0), decision.retry_after());
}

#[test]
fn admits_exactly_capacity_back_to_back() {
    let lim = RateLimiter::<&str>::new(nonzero!(5u32), Duration::from_secs(60)).unwrap();
    let now = current_moment();
    for i in 0..5 {
        let decision = lim.admit_at("foo", now);
        assert!(decision.is_allowed(), "request {}: {:?}", i, decision);
        assert_eq!(4 - i, decision.remaining());
    }
    let decision = lim.admit_at("foo", now);
    assert!(!decision.is_allowed(), "{:?}", lim);
    assert_eq!(0, decision.remaining());
    assert_eq!(Duration::from_secs(12), decision.retry_after());
}

#[test]
fn allowed_again_after_one_emission_interval() {
    let clock = FakeAbsoluteClock::default();
    let lim = RateLimiter::<&str>::build_with_capacity(nonzero!(5u32))
        .with_clock(clock.clone())
        .per(Duration::from_secs(60))
        .build()
        .unwrap();
    for _ in 0..5 {
        assert!(lim.admit("foo").is_allowed());
    }
    let denied = lim.admit("foo");
    assert!(!denied.is_allowed());

    clock.advance(denied.retry_after());
    let decision = lim.admit("foo");
    assert!(decision.is_allowed(), "{:?}", decision);
    assert_eq!(0, decision.remaining());

    // only one token came back:
    assert!(!lim.admit("foo").is_allowed());
}

#[test]
fn denials_do_not_consume_tokens() {
    let lim = RateLimiter::<&str>::new(nonzero!(1u32), Duration::from_secs(10)).unwrap();
    let now = current_moment();
    let s = Duration::from_secs(1);
    assert!(lim.admit_at("foo", now).is_allowed());
    for i in 1..10 {
        let decision = lim.admit_at("foo", now + s * i);
        assert!(!decision.is_allowed());
        assert_eq!(s * (10 - i), decision.retry_after());
    }
    assert!(lim.admit_at("foo", now + s * 10).is_allowed());
}

#[test]
fn never_allows_more_than_capacity() {
    let lim = RateLimiter::<&str>::new(nonzero!(3u32), Duration::from_secs(3)).unwrap();
    let now = current_moment();
    // a long idle period does not bank extra tokens:
    let later = now + Duration::from_secs(3600);
    assert!(lim.admit_at("foo", now).is_allowed());
    let mut allowed = 0;
    for _ in 0..10 {
        if lim.admit_at("foo", later).is_allowed() {
            allowed += 1;
        }
    }
    assert_eq!(3, allowed);
}

#[test]
fn different_states_per_key() {
    let lim = RateLimiter::<&str>::new(nonzero!(1u32), Duration::from_secs(1)).unwrap();
    let ms = Duration::from_millis(1);
    let now = current_moment();
    assert!(lim.admit_at("foo", now + ms).is_allowed());
    assert!(lim.admit_at("bar", now + ms).is_allowed());
    assert!(lim.admit_at("baz", now + ms).is_allowed());

    assert!(!lim.admit_at("foo", now + ms * 3).is_allowed(), "{:?}", lim);
    assert!(!lim.admit_at("bar", now + ms * 3).is_allowed(), "{:?}", lim);
    assert!(!lim.admit_at("baz", now + ms * 3).is_allowed(), "{:?}", lim);
}

#[test]
fn untouched_keys_get_no_bucket() {
    let lim = RateLimiter::<&str>::new(nonzero!(2u32), Duration::from_secs(1)).unwrap();
    lim.admit("foo");
    assert!(lim.snapshot(&"bar").is_none());
    assert_eq!(1, lim.len());
}

#[test]
fn expiration() {
    let ms = Duration::from_millis(1);
    let now = current_moment();

    let make_bucket = || {
        let lim = RateLimiter::<&str>::new(nonzero!(1u32), Duration::from_secs(1)).unwrap();
        lim.admit_at("foo", now);
        lim.admit_at("bar", now + ms * 200);
        lim.admit_at("baz", now + ms * 800);
        lim
    };

    // clean up all keys that were idle for any time at all:
    let lim = make_bucket();
    let mut removed = lim.cleanup_at(Duration::new(0, 0), now + ms * 2000);
    removed.sort();
    assert_eq!(vec!["bar", "baz", "foo"], removed);
    assert!(lim.is_empty());

    // clean up all keys that have been idle for more than 1500ms:
    let lim = make_bucket();
    let mut removed = lim.cleanup_at(ms * 1500, now + ms * 2000);
    removed.sort();
    assert_eq!(vec!["bar", "foo"], removed);
    assert_eq!(1, lim.len());

    // the default retention is two windows:
    let lim = make_bucket();
    assert!(lim.cleanup_at(None, now + ms * 2000).is_empty());
    let removed = lim.cleanup_at(None, now + ms * 2100);
    assert_eq!(vec!["foo"], removed);
}

#[test]
fn expired_keys_start_over_full() {
    let lim = RateLimiter::<&str>::new(nonzero!(2u32), Duration::from_secs(1)).unwrap();
    let now = current_moment();
    lim.admit_at("foo", now);
    lim.admit_at("foo", now);
    let later = now + Duration::from_secs(5);
    assert_eq!(vec!["foo"], lim.cleanup_at(None, later));
    assert_eq!(1, lim.admit_at("foo", later).remaining());
}

#[test]
fn actual_threadsafety() {
    const CAPACITY: u32 = 20;
    const THREADS: u32 = 64;
    let lim = RateLimiter::<&str>::new(nonzero!(20u32), Duration::from_secs(1)).unwrap();
    let now = current_moment();
    let admitted = Arc::new(AtomicU32::new(0));
    let barrier = Arc::new(Barrier::new(THREADS as usize));
    let mut children = vec![];

    for _i in 0..THREADS {
        let lim = lim.clone();
        let admitted = admitted.clone();
        let barrier = barrier.clone();
        children.push(thread::spawn(move || {
            barrier.wait();
            if lim.admit_at("foo", now).is_allowed() {
                admitted.fetch_add(1, Ordering::SeqCst);
            }
        }));
    }
    for child in children {
        child.join().unwrap();
    }
    assert_eq!(CAPACITY, admitted.load(Ordering::SeqCst));
    assert!(!lim.admit_at("foo", now).is_allowed());
    assert!(lim.admit_at("foo", now + Duration::from_millis(1000)).is_allowed());
}

#[test]
fn keys_are_independent_under_load() {
    let lim = RateLimiter::<u32>::new(nonzero!(10u32), Duration::from_secs(60)).unwrap();
    let now = current_moment();
    let mut children = vec![];

    for key in 0..8u32 {
        let lim = lim.clone();
        children.push(thread::spawn(move || {
            (0..25)
                .filter(|_| lim.admit_at(key, now).is_allowed())
                .count()
        }));
    }
    for child in children {
        assert_eq!(10, child.join().unwrap());
    }
    assert_eq!(8, lim.len());
}

#[test]
fn from_config_applies_every_field() {
    let config = RateLimitConfig {
        capacity: nonzero!(2u32),
        window: Duration::from_secs(10),
        retention: Some(Duration::from_secs(90)),
    };
    let lim = RateLimiter::<String, _>::from_config(&config, FakeAbsoluteClock::default()).unwrap();
    assert_eq!(2, lim.algorithm().capacity().get());
    assert_eq!(Duration::from_secs(5), lim.algorithm().emission_interval());
    assert_eq!(Duration::from_secs(90), lim.retention());
}

#[test]
fn rejects_zero_window() {
    let result = RateLimiter::<u32>::new(nonzero!(1u32), Duration::new(0, 0));
    assert_eq!(ConfigError::ZeroWindow, result.unwrap_err());
}

#[test]
fn accepts_the_longest_window() {
    let lim = RateLimiter::<&str>::new(nonzero!(5u32), Duration::MAX).unwrap();
    assert_eq!(Duration::MAX, lim.retention());
    let now = current_moment();
    for _ in 0..5 {
        assert!(lim.admit_at("foo", now).is_allowed());
    }
    assert!(!lim.admit_at("foo", now).is_allowed());
    assert!(lim.cleanup_at(None, now + Duration::from_secs(3600)).is_empty());

    let config = RateLimitConfig {
        window: Duration::MAX,
        ..RateLimitConfig::default()
    };
    assert!(RateLimiter::<String, _>::from_config(&config, FakeAbsoluteClock::default()).is_ok());
}
