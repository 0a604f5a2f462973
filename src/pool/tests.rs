use {
    crate::{LockObject, LockPool, PoolError},
    std::thread,
};

const INITIAL_CAPACITY: usize = 10;
const MAX_CAPACITY: usize = 20;

#[test]
fn new() {
    let pool = LockPool::new(INITIAL_CAPACITY, MAX_CAPACITY).unwrap();
    assert_eq!(pool.len(), INITIAL_CAPACITY);
    assert_eq!(pool.capacity(), MAX_CAPACITY);
    assert_eq!(pool.is_closed(), false);
}

#[test]
fn new_invalid() {
    assert_eq!(
        LockPool::new(20, 10).unwrap_err(),
        PoolError::InvalidCapacity {
            initial: 20,
            max: 10
        },
    );
    assert_eq!(
        LockPool::new(0, 0).unwrap_err(),
        PoolError::InvalidCapacity { initial: 0, max: 0 },
    );
    assert!(LockPool::new(1, 0).is_err());
}

#[test]
fn new_empty() {
    let pool = LockPool::new(0, 1).unwrap();
    assert_eq!(pool.len(), 0);
    assert_eq!(pool.is_empty(), true);
}

#[test]
fn acquire() {
    let pool = LockPool::new(INITIAL_CAPACITY, MAX_CAPACITY).unwrap();
    pool.acquire().unwrap();
    assert_eq!(pool.len(), INITIAL_CAPACITY - 1);

    thread::scope(|s| {
        for _ in 0..INITIAL_CAPACITY - 1 {
            s.spawn(|| {
                pool.acquire().unwrap();
            });
        }
    });
    assert_eq!(pool.len(), 0);

    // Shortfall creates a new object instead of failing.
    let lock = pool.acquire().unwrap();
    assert_eq!(lock.is_locked(), false);
    assert_eq!(pool.len(), 0);
}

#[test]
fn acquire_reuses_resident_objects() {
    let pool = LockPool::new(0, 1).unwrap();
    let lock = LockObject::new();
    pool.release(lock.clone());
    assert_eq!(pool.acquire().unwrap(), lock);
    assert_ne!(pool.acquire().unwrap(), lock);
}

#[test]
fn release() {
    let pool = LockPool::new(INITIAL_CAPACITY, MAX_CAPACITY).unwrap();
    let items: Vec<_> = (0..MAX_CAPACITY).map(|_| pool.acquire().unwrap()).collect();
    assert_eq!(pool.len(), 0);
    for item in items {
        pool.release(item);
    }
    assert_eq!(pool.len(), MAX_CAPACITY);

    let item = pool.acquire().unwrap();
    pool.close();
    pool.release(item);
    assert_eq!(pool.len(), 0);
}

#[test]
fn release_into_full_pool() {
    let pool = LockPool::new(MAX_CAPACITY, MAX_CAPACITY).unwrap();
    for _ in 0..5 {
        pool.release(LockObject::new());
    }
    assert_eq!(pool.len(), MAX_CAPACITY);
}

#[test]
fn len_never_exceeds_capacity() {
    let pool = LockPool::new(2, 4).unwrap();
    thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                for i in 0..100 {
                    if i % 3 == 0 {
                        pool.acquire().unwrap();
                    } else {
                        pool.release(LockObject::new());
                    }
                    assert!(pool.len() <= 4);
                }
            });
        }
    });
    assert!(pool.len() <= 4);
}

#[test]
fn close() {
    let pool = LockPool::new(INITIAL_CAPACITY, MAX_CAPACITY).unwrap();
    pool.close();
    assert_eq!(pool.is_closed(), true);
    assert_eq!(pool.len(), 0);
    assert_eq!(pool.acquire(), Err(PoolError::Closed));
    pool.release(LockObject::new());
    assert_eq!(pool.len(), 0);
    pool.close();
    assert_eq!(pool.is_closed(), true);
    assert_eq!(pool.acquire(), Err(PoolError::Closed));
}

#[test]
fn error_display() {
    assert_eq!(PoolError::Closed.to_string(), "pool is closed");
    assert_eq!(
        PoolError::InvalidCapacity { initial: 2, max: 1 }.to_string(),
        "invalid capacity settings: initial capacity 2, maximum capacity 1",
    );
}

#[test]
fn debug() {
    let pool = LockPool::new(1, 2).unwrap();
    assert_eq!(
        format!("{pool:?}"),
        "LockPool { len: 1, capacity: 2, closed: false }",
    );
}
