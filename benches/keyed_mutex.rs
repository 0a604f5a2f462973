//! Benchmark contended locking of a small set of keys.
//!
//! Each iteration spawns a batch of threads that lock a random key, touch a
//! per-key counter, and unlock again. This is run for 10, 50, and 100 keys, with and
//! without a lock pool.

use {
    criterion::{BenchmarkId, Criterion, criterion_group, criterion_main},
    keyed_mutex::{KeyedMutex, LockPool, Strategy},
    rand::Rng,
    std::{
        hint::black_box,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering::Relaxed},
        },
        thread,
    },
};

const WORKERS: usize = 64;
const RESOURCES: [usize; 3] = [10, 50, 100];

fn run_workers<S>(mutex: &KeyedMutex<usize, S>, resources: &[AtomicUsize])
where
    S: Strategy + Sync,
{
    thread::scope(|s| {
        for _ in 0..WORKERS {
            s.spawn(|| {
                let rid = rand::thread_rng().gen_range(0..resources.len());
                let _guard = mutex.lock(rid);
                black_box(resources[rid].fetch_add(1, Relaxed));
            });
        }
    });
}

fn counters(n: usize) -> Vec<AtomicUsize> {
    (0..n).map(|_| AtomicUsize::new(0)).collect()
}

fn bench_unpooled(c: &mut Criterion) {
    let mut group = c.benchmark_group("unpooled");
    for n in RESOURCES {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let mutex = KeyedMutex::new();
            let resources = counters(n);
            b.iter(|| run_workers(&mutex, &resources));
        });
    }
    group.finish();
}

fn bench_pooled(c: &mut Criterion) {
    let mut group = c.benchmark_group("pooled");
    for n in RESOURCES {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let pool = LockPool::new(n, n).expect("valid capacities");
            let mutex = KeyedMutex::with_pool(Arc::new(pool)).expect("pool is open");
            let resources = counters(n);
            b.iter(|| run_workers(&mutex, &resources));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_unpooled, bench_pooled);
criterion_main!(benches);
