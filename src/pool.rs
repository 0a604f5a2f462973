use {
    crate::{LockObject, error::PoolError},
    crossbeam_queue::ArrayQueue,
    parking_lot::RwLock,
    static_assertions::assert_impl_all,
    std::fmt::{Debug, Formatter},
};

#[cfg(test)]
mod tests;

/// A bounded pool of reusable [`LockObject`]s.
///
/// The pool bounds the number of *resident* lock objects, that is, idle objects that
/// are waiting to be reused. It does not bound the number of objects in use:
///
/// - [`LockPool::acquire`] never blocks. If no object is resident, a fresh one is
///   created.
/// - [`LockPool::release`] never blocks. If the pool is full, the object is dropped.
///
/// After [`LockPool::close`], acquiring fails with [`PoolError::Closed`] and released
/// objects are dropped.
///
/// # Example
///
/// ```
/// use keyed_mutex::{LockPool, PoolError};
///
/// let pool = LockPool::new(2, 4)?;
/// assert_eq!(pool.len(), 2);
/// let lock = pool.acquire()?;
/// assert_eq!(pool.len(), 1);
/// pool.release(lock);
/// assert_eq!(pool.len(), 2);
/// pool.close();
/// assert_eq!(pool.acquire(), Err(PoolError::Closed));
/// # Ok::<(), PoolError>(())
/// ```
pub struct LockPool {
    // None once the pool has been closed. Acquire, release, and len hold the read side
    // for a single queue operation. Close holds the write side so that no release can
    // make an object resident after close has returned.
    items: RwLock<Option<ArrayQueue<LockObject>>>,
    max_capacity: usize,
}

assert_impl_all!(LockPool: Send, Sync);

impl LockPool {
    /// Creates a pool holding `initial_capacity` fresh lock objects and at most
    /// `max_capacity` resident objects.
    ///
    /// Returns [`PoolError::InvalidCapacity`] if `max_capacity` is 0 or
    /// `initial_capacity` is larger than `max_capacity`.
    pub fn new(initial_capacity: usize, max_capacity: usize) -> Result<Self, PoolError> {
        if max_capacity == 0 || initial_capacity > max_capacity {
            return Err(PoolError::InvalidCapacity {
                initial: initial_capacity,
                max: max_capacity,
            });
        }
        let queue = ArrayQueue::new(max_capacity);
        for _ in 0..initial_capacity {
            // Cannot fail since initial_capacity <= max_capacity.
            let pushed = queue.push(LockObject::new());
            debug_assert!(pushed.is_ok());
        }
        tracing::debug!(initial_capacity, max_capacity, "created lock pool");
        Ok(Self {
            items: RwLock::new(Some(queue)),
            max_capacity,
        })
    }

    /// Takes a lock object from the pool.
    ///
    /// If no object is resident, a new one is created. This function never blocks.
    ///
    /// A resident object may still be locked for a short time by the thread that
    /// released it, since a [`KeyedMutex`](crate::KeyedMutex) returns lock objects to
    /// the strategy before unlocking them.
    ///
    /// Returns [`PoolError::Closed`] if the pool has been closed.
    pub fn acquire(&self) -> Result<LockObject, PoolError> {
        let items = self.items.read();
        let queue = items.as_ref().ok_or(PoolError::Closed)?;
        Ok(queue.pop().unwrap_or_else(|| {
            tracing::trace!("lock pool is empty, creating a lock object");
            LockObject::new()
        }))
    }

    /// Returns a lock object to the pool.
    ///
    /// If the pool is full or closed, the object is dropped. This function never
    /// blocks.
    pub fn release(&self, item: LockObject) {
        let items = self.items.read();
        let Some(queue) = &*items else {
            return;
        };
        if queue.push(item).is_err() {
            tracing::trace!("lock pool is full, discarding a lock object");
        }
    }

    /// Closes the pool and drops all resident lock objects.
    ///
    /// Closing a closed pool has no effect.
    pub fn close(&self) {
        let queue = self.items.write().take();
        if let Some(queue) = queue {
            tracing::debug!(resident = queue.len(), "closed lock pool");
        }
    }

    /// Returns whether [`LockPool::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.items.read().is_none()
    }

    /// Returns the number of resident lock objects.
    ///
    /// Under concurrent use the value may be outdated by the time it is returned.
    pub fn len(&self) -> usize {
        self.items.read().as_ref().map_or(0, ArrayQueue::len)
    }

    /// Returns whether no lock objects are resident.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the maximum number of resident lock objects.
    pub fn capacity(&self) -> usize {
        self.max_capacity
    }
}

impl Debug for LockPool {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockPool")
            .field("len", &self.len())
            .field("capacity", &self.max_capacity)
            .field("closed", &self.is_closed())
            .finish()
    }
}
