use {
    parking_lot::{
        RawMutex,
        lock_api::{RawMutex as RawMutexTrait, RawMutexFair},
    },
    static_assertions::assert_impl_all,
    std::{
        fmt::{Debug, Formatter},
        ptr,
        sync::Arc,
    },
};

#[cfg(test)]
mod tests;

/// A raw lock that is locked and unlocked without a guard.
///
/// This is the object a [`KeyedMutex`](crate::KeyedMutex) associates with each key
/// while the key has outstanding claims. Cloning a [`LockObject`] is about as
/// expensive as cloning an [`Arc`] and the clone refers to the same underlying mutex.
///
/// The lock is not re-entrant. Locking it twice from the same thread deadlocks.
///
/// # Example
///
/// ```
/// use keyed_mutex::LockObject;
///
/// let lock = LockObject::new();
/// lock.lock();
/// assert!(lock.is_locked());
/// // SAFETY: We've just locked the lock on this thread.
/// unsafe {
///     lock.unlock();
/// }
/// assert!(!lock.is_locked());
/// ```
#[derive(Clone, Default)]
pub struct LockObject {
    shared: Arc<Shared>,
}

struct Shared {
    raw_mutex: RawMutex,
}

assert_impl_all!(LockObject: Send, Sync);

impl Default for Shared {
    fn default() -> Self {
        Self {
            raw_mutex: RawMutex::INIT,
        }
    }
}

impl LockObject {
    /// Creates a new, unlocked lock object.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires this lock, blocking the current thread until it is able to do so.
    #[inline]
    pub fn lock(&self) {
        self.shared.raw_mutex.lock();
    }

    /// Attempts to acquire this lock without blocking.
    ///
    /// Returns `true` if the lock was acquired.
    ///
    /// # Example
    ///
    /// ```
    /// use keyed_mutex::LockObject;
    ///
    /// let lock = LockObject::new();
    /// assert!(lock.try_lock());
    /// assert!(!lock.try_lock());
    /// // SAFETY: The first try_lock succeeded on this thread.
    /// unsafe {
    ///     lock.unlock();
    /// }
    /// ```
    #[inline]
    pub fn try_lock(&self) -> bool {
        self.shared.raw_mutex.try_lock()
    }

    /// Returns whether this lock is locked.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.shared.raw_mutex.is_locked()
    }

    /// Releases this lock.
    ///
    /// # Safety
    ///
    /// - The lock must be held by the current thread, i.e. this call must be paired
    ///   with a preceding successful [`LockObject::lock`] or [`LockObject::try_lock`].
    #[inline]
    pub unsafe fn unlock(&self) {
        // SAFETY: The requirement is forwarded to the caller.
        unsafe {
            self.shared.raw_mutex.unlock();
        }
    }

    /// Releases this lock using a fair unlock protocol.
    ///
    /// # Safety
    ///
    /// - The lock must be held by the current thread, i.e. this call must be paired
    ///   with a preceding successful [`LockObject::lock`] or [`LockObject::try_lock`].
    #[inline]
    pub unsafe fn unlock_fair(&self) {
        // SAFETY: The requirement is forwarded to the caller.
        unsafe {
            self.shared.raw_mutex.unlock_fair();
        }
    }

    #[inline]
    pub(crate) fn addr(&self) -> *const u8 {
        let addr: *const Shared = &*self.shared;
        addr.cast()
    }
}

impl Debug for LockObject {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockObject")
            .field("id", &self.addr())
            .finish_non_exhaustive()
    }
}

impl PartialEq for LockObject {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        ptr::eq::<Shared>(&*self.shared, &*other.shared)
    }
}

impl Eq for LockObject {}
