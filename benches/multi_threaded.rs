use std::thread;
use std::time::Duration;

use criterion::{black_box, Criterion, Throughput};
use shortlink_gatekeeper::test_utilities::current_moment;
use shortlink_gatekeeper::RateLimiter;

const THREADS: u32 = 20;

pub fn bench_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("multi_threaded");
    group.throughput(Throughput::Elements(THREADS as u64));
    group.bench_function("shared_key", |b| {
        let rl = RateLimiter::<u32>::new(nonzero!(50u32), Duration::from_secs(1)).unwrap();
        let now = current_moment();
        let ms = Duration::from_millis(20);
        b.iter_custom(|iters| {
            let started = std::time::Instant::now();
            let children: Vec<_> = (0..THREADS)
                .map(|t| {
                    let rl = rl.clone();
                    thread::spawn(move || {
                        for i in 0..iters as u32 {
                            black_box(rl.admit_at(t % 4, now + (ms * i)).is_allowed());
                        }
                    })
                })
                .collect();
            for child in children {
                child.join().unwrap();
            }
            started.elapsed()
        });
    });
    group.finish();
}
