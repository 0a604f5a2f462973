use {
    crate::{LockObject, LockPool, error::PoolError},
    std::sync::Arc,
};


/// Controls where a [`KeyedMutex`](crate::KeyedMutex) gets its lock objects from and
/// what happens to them once a key is no longer in use.
///
/// Both functions are called while the administrative lock of the keyed mutex is held.
/// They must not block and must not call back into the same keyed mutex.
pub trait Strategy {
    /// Returns a lock object for a key that has just become active.
    ///
    /// The object may still be held briefly by the thread that last released it, so
    /// locking it can wait until that thread has finished unlocking.
    fn obtain(&self) -> LockObject;

    /// Disposes of the lock object of a key whose last claim has been released.
    ///
    /// The object may still be locked by the releasing thread. It is unlocked shortly
    /// after this call returns.
    fn release(&self, lock: LockObject);
}

/// A [`Strategy`] that allocates a new lock object for every active key and drops it
/// afterwards.
///
/// The number of lock objects alive at any time equals the number of active keys.
#[derive(Copy, Clone, Debug, Default)]
pub struct Unpooled;

impl Strategy for Unpooled {
    #[inline]
    fn obtain(&self) -> LockObject {
        LockObject::new()
    }

    #[inline]
    fn release(&self, _lock: LockObject) {}
}

/// A [`Strategy`] that recycles lock objects through a [`LockPool`].
///
/// A lock object is returned to the pool before its last holder unlocks it. Locking a
/// key can therefore wait briefly on a thread that is still unlocking a different key
/// whose lock object was recycled.
#[derive(Clone, Debug)]
pub struct Pooled {
    pool: Arc<LockPool>,
}

impl Pooled {
    /// Creates a strategy backed by `pool`.
    ///
    /// Returns [`PoolError::Closed`] if the pool has already been closed.
    pub fn new(pool: Arc<LockPool>) -> Result<Self, PoolError> {
        if pool.is_closed() {
            return Err(PoolError::Closed);
        }
        Ok(Self { pool })
    }

    /// Returns the pool backing this strategy.
    pub fn pool(&self) -> &Arc<LockPool> {
        &self.pool
    }
}

impl Strategy for Pooled {
    /// # Panic
    ///
    /// Panics if the pool has been closed.
    fn obtain(&self) -> LockObject {
        match self.pool.acquire() {
            Ok(lock) => lock,
            Err(e) => panic!("cannot obtain a lock object from the pool: {e}"),
        }
    }

    #[inline]
    fn release(&self, lock: LockObject) {
        self.pool.release(lock);
    }
}
