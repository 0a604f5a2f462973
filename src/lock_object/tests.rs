use {
    crate::LockObject,
    std::{sync::Barrier, thread},
};

fn run_in_thread<T: Send>(f: impl FnOnce() -> T + Send) -> T {
    thread::scope(|s| s.spawn(|| f()).join().unwrap())
}

#[test]
fn default() {
    let lock = LockObject::default();
    assert_eq!(lock.is_locked(), false);
}

#[test]
fn lock_unlock() {
    let lock = LockObject::new();
    lock.lock();
    assert_eq!(lock.is_locked(), true);
    run_in_thread(|| {
        assert_eq!(lock.try_lock(), false);
    });
    unsafe {
        lock.unlock();
    }
    assert_eq!(lock.is_locked(), false);
    run_in_thread(|| {
        assert_eq!(lock.try_lock(), true);
        unsafe {
            lock.unlock();
        }
    });
}

#[test]
fn unlock_fair() {
    let lock = LockObject::new();
    lock.lock();
    unsafe {
        lock.unlock_fair();
    }
    assert_eq!(lock.is_locked(), false);
}

#[test]
fn try_lock() {
    let lock = LockObject::new();
    assert_eq!(lock.try_lock(), true);
    assert_eq!(lock.try_lock(), false);
    run_in_thread(|| {
        assert_eq!(lock.try_lock(), false);
    });
    unsafe {
        lock.unlock();
    }
    assert_eq!(lock.try_lock(), true);
    unsafe {
        lock.unlock();
    }
}

#[test]
fn clones_share_the_mutex() {
    let lock1 = LockObject::new();
    let lock2 = lock1.clone();
    lock1.lock();
    assert_eq!(lock2.is_locked(), true);
    assert_eq!(lock2.try_lock(), false);
    unsafe {
        lock2.unlock();
    }
    assert_eq!(lock1.is_locked(), false);
}

#[test]
fn lock_blocks_other_threads() {
    let lock = LockObject::new();
    let barrier1 = Barrier::new(2);
    let barrier2 = Barrier::new(2);
    thread::scope(|s| {
        let handle = s.spawn(|| {
            lock.lock();
            barrier1.wait();
            barrier2.wait();
            unsafe {
                lock.unlock();
            }
        });
        barrier1.wait();
        assert_eq!(lock.is_locked(), true);
        assert_eq!(lock.try_lock(), false);
        barrier2.wait();
        handle.join().unwrap();
    });
    assert_eq!(lock.try_lock(), true);
    unsafe {
        lock.unlock();
    }
}

#[test]
fn eq() {
    let lock1 = LockObject::new();
    let lock2 = LockObject::new();
    assert_eq!(lock1, lock1);
    assert_eq!(lock1, lock1.clone());
    assert_ne!(lock1, lock2);
    assert_eq!(lock2, lock2);
}

#[test]
fn debug() {
    let lock = LockObject::new();
    let debug = format!("{lock:?}");
    assert!(debug.starts_with("LockObject { id: "));
}
