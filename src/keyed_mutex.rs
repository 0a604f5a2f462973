use {
    crate::{
        LockObject, LockPool,
        error::PoolError,
        strategy::{Pooled, Strategy, Unpooled},
    },
    debug_fn::debug_fn,
    opera::{PhantomNotSend, PhantomNotSync},
    parking_lot::Mutex,
    run_on_drop::on_drop,
    static_assertions::{assert_impl_all, assert_not_impl_any},
    std::{
        collections::HashMap,
        fmt::{Debug, Formatter},
        hash::Hash,
        mem::ManuallyDrop,
        ptr,
        sync::Arc,
    },
};


/// A mutex that is locked and unlocked by key.
///
/// Every key behaves like an independent mutex. At most one thread at a time can hold
/// a [`KeyGuard`] for a given key, while guards for different keys never wait for each
/// other.
///
/// Keys do not need to be registered up front. A [`LockObject`] is associated with a
/// key when the first thread tries to lock it, and disassociated once the last thread
/// that tried to lock it has unlocked it. Where lock objects come from and where they
/// go is decided by the [`Strategy`] `S`:
///
/// - [`Unpooled`] (the default) allocates a new object for every active key.
/// - [`Pooled`] recycles objects through a [`LockPool`].
///
/// Locking is not re-entrant. Locking a key that the current thread already holds
/// deadlocks.
///
/// # Example
///
/// ```
/// use keyed_mutex::KeyedMutex;
///
/// let mutex = KeyedMutex::new();
/// let guard1 = mutex.lock(1);
/// // Other keys are not affected.
/// let guard2 = mutex.lock(2);
/// assert!(mutex.try_lock(1).is_none());
/// drop(guard1);
/// assert!(mutex.try_lock(1).is_some());
/// # drop(guard2);
/// ```
pub struct KeyedMutex<K, S = Unpooled> {
    // The administrative lock. It is only held while looking up, inserting, or
    // removing entries and never while blocking on a lock object.
    entries: Mutex<HashMap<K, Entry>>,
    strategy: S,
}

struct Entry {
    lock: LockObject,
    // The number of threads that have claimed this entry and not yet released it.
    // An entry exists if and only if this is > 0.
    refcount: usize,
}

/// A held key of a [`KeyedMutex`].
///
/// This object is created by calling [`KeyedMutex::lock`] or [`KeyedMutex::try_lock`].
/// Dropping it unlocks the key.
///
/// The guard can be passed to [`mem::forget`](std::mem::forget) to keep the key
/// locked. It must then be unlocked with [`KeyedMutex::force_unlock`] or recovered with
/// [`KeyedMutex::make_guard_unchecked`].
pub struct KeyGuard<'a, K, S = Unpooled>
where
    K: Eq + Hash,
    S: Strategy,
{
    mutex: &'a KeyedMutex<K, S>,
    key: K,
    _phantom_not_send: PhantomNotSend,
    _phantom_not_sync: PhantomNotSync,
}

assert_impl_all!(KeyedMutex<i64>: Send, Sync);
assert_impl_all!(KeyedMutex<i64, Pooled>: Send, Sync);
assert_not_impl_any!(KeyGuard<'_, i64>: Send, Sync);

impl<K> KeyedMutex<K, Unpooled> {
    /// Creates a keyed mutex that allocates a new lock object for every active key.
    pub fn new() -> Self {
        Self::with_strategy(Unpooled)
    }
}

impl<K> Default for KeyedMutex<K, Unpooled> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> KeyedMutex<K, Pooled> {
    /// Creates a keyed mutex that takes its lock objects from `pool`.
    ///
    /// Returns [`PoolError::Closed`] if the pool has already been closed. If the pool
    /// is closed later, locking a key that is not currently active panics.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use keyed_mutex::{KeyedMutex, LockPool};
    ///
    /// let pool = Arc::new(LockPool::new(4, 4)?);
    /// let mutex = KeyedMutex::with_pool(pool.clone())?;
    /// let guard = mutex.lock(7);
    /// assert_eq!(pool.len(), 3);
    /// drop(guard);
    /// assert_eq!(pool.len(), 4);
    /// # Ok::<(), keyed_mutex::PoolError>(())
    /// ```
    pub fn with_pool(pool: Arc<LockPool>) -> Result<Self, PoolError> {
        Pooled::new(pool).map(Self::with_strategy)
    }
}

impl<K, S> KeyedMutex<K, S> {
    /// Creates a keyed mutex that uses `strategy` to manage its lock objects.
    pub fn with_strategy(strategy: S) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            strategy,
        }
    }

    /// Returns the strategy of this mutex.
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Returns the number of keys that are currently locked or being waited for.
    ///
    /// Under concurrent use the value may be outdated by the time it is returned.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns whether no key is currently locked or being waited for.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, S> KeyedMutex<K, S>
where
    K: Eq + Hash,
    S: Strategy,
{
    /// Registers the calling thread's interest in `key` and returns the lock object
    /// associated with it.
    fn claim(&self, key: &K) -> LockObject
    where
        K: Clone,
    {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(key) {
            entry.refcount += 1;
            return entry.lock.clone();
        }
        let lock = self.strategy.obtain();
        entries.insert(
            key.clone(),
            Entry {
                lock: lock.clone(),
                refcount: 1,
            },
        );
        tracing::trace!(active = entries.len(), "created lock entry");
        lock
    }

    /// Drops a claim on `key` and returns the lock object associated with it.
    ///
    /// If this was the last claim, the entry is removed and the lock object is handed
    /// to the strategy before this function returns.
    fn release_claim(&self, key: &K) -> LockObject {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(key) else {
            panic!("unlock of a key that is not locked");
        };
        entry.refcount -= 1;
        let lock = entry.lock.clone();
        if entry.refcount == 0 {
            entries.remove(key);
            tracing::trace!(active = entries.len(), "removed lock entry");
            self.strategy.release(lock.clone());
        }
        lock
    }

    /// Returns the lock object of `key`, which must have an outstanding claim.
    fn lock_object(&self, key: &K) -> LockObject {
        match self.entries.lock().get(key) {
            Some(entry) => entry.lock.clone(),
            None => panic!("unlock of a key that is not locked"),
        }
    }

    /// Locks `key`.
    ///
    /// If another thread holds the key, this function blocks until the key is
    /// available. The administrative lock of this mutex is not held while blocking,
    /// so other keys can be locked and unlocked in the meantime.
    ///
    /// Dropping the returned guard unlocks the key.
    ///
    /// # Panic
    ///
    /// Panics if the key is not yet active and the strategy cannot provide a lock
    /// object, e.g. because the [`LockPool`] of a [`Pooled`] strategy has been closed.
    ///
    /// # Example
    ///
    /// ```
    /// use std::thread;
    /// use keyed_mutex::KeyedMutex;
    ///
    /// let mutex = KeyedMutex::new();
    /// let guard = mutex.lock(1);
    ///
    /// thread::scope(|scope| {
    ///     let handle = scope.spawn(|| {
    ///         // Blocks until the main thread drops its guard.
    ///         let _guard = mutex.lock(1);
    ///     });
    ///     drop(guard);
    ///     handle.join().unwrap();
    /// });
    /// ```
    pub fn lock(&self, key: K) -> KeyGuard<'_, K, S>
    where
        K: Clone,
    {
        self.claim(&key).lock();
        // SAFETY: - We've just claimed the key and locked its lock object.
        //         - Ownership of the claim is transferred to the new guard.
        unsafe { self.make_guard_unchecked_(key) }
    }

    /// Attempts to lock `key` without blocking.
    ///
    /// Returns `None` if the key is held by another thread. This can also happen
    /// spuriously for a short time after a key was unlocked if its lock object was
    /// recycled for a different key.
    ///
    /// # Example
    ///
    /// ```
    /// use std::thread;
    /// use keyed_mutex::KeyedMutex;
    ///
    /// let mutex = KeyedMutex::new();
    /// let _guard = mutex.lock("a");
    ///
    /// thread::scope(|scope| {
    ///     scope.spawn(|| {
    ///         assert!(mutex.try_lock("a").is_none());
    ///         assert!(mutex.try_lock("b").is_some());
    ///     });
    /// });
    /// ```
    pub fn try_lock(&self, key: K) -> Option<KeyGuard<'_, K, S>>
    where
        K: Clone,
    {
        if self.claim(&key).try_lock() {
            // SAFETY: - We've just claimed the key and locked its lock object.
            //         - Ownership of the claim is transferred to the new guard.
            Some(unsafe { self.make_guard_unchecked_(key) })
        } else {
            self.release_claim(&key);
            None
        }
    }

    /// Returns whether `key` is currently locked.
    pub fn is_locked(&self, key: &K) -> bool {
        self.entries
            .lock()
            .get(key)
            .is_some_and(|entry| entry.lock.is_locked())
    }

    /// Forcibly unlocks `key`.
    ///
    /// This can be used to unlock a key whose [`KeyGuard`] was passed to
    /// [`mem::forget`](std::mem::forget).
    ///
    /// # Safety
    ///
    /// - The current thread must hold `key`.
    /// - The invariant that each [`KeyGuard`] holds its key must be upheld whenever a
    ///   [`KeyGuard`] is used or dropped.
    ///
    /// # Panic
    ///
    /// Panics if no thread has locked or is waiting for `key`.
    ///
    /// # Example
    ///
    /// ```
    /// use std::mem;
    /// use keyed_mutex::KeyedMutex;
    ///
    /// let mutex = KeyedMutex::new();
    /// mem::forget(mutex.lock(3));
    /// assert!(mutex.is_locked(&3));
    /// // SAFETY: This releases the key of the guard we just forgot.
    /// unsafe {
    ///     mutex.force_unlock(&3);
    /// }
    /// assert!(!mutex.is_locked(&3));
    /// ```
    #[inline]
    pub unsafe fn force_unlock(&self, key: &K) {
        // SAFETY: The requirements are forwarded to the caller.
        unsafe {
            self.force_unlock_::<false>(key);
        }
    }

    /// Forcibly unlocks `key` using a fair unlock protocol.
    ///
    /// # Safety
    ///
    /// - The current thread must hold `key`.
    /// - The invariant that each [`KeyGuard`] holds its key must be upheld whenever a
    ///   [`KeyGuard`] is used or dropped.
    ///
    /// # Panic
    ///
    /// Panics if no thread has locked or is waiting for `key`.
    #[inline]
    pub unsafe fn force_unlock_fair(&self, key: &K) {
        // SAFETY: The requirements are forwarded to the caller.
        unsafe {
            self.force_unlock_::<true>(key);
        }
    }

    /// # Safety
    ///
    /// - The current thread must hold `key`.
    #[inline]
    unsafe fn force_unlock_<const FAIR: bool>(&self, key: &K) {
        let lock = self.release_claim(key);
        // SAFETY: - By the requirements of this function, the current thread holds the
        //           key, i.e. it has locked the lock object associated with the key.
        //         - The lock object of a key is only replaced after the last claim has
        //           been released, and the current thread has only just released its
        //           claim. Therefore `lock` is the object the current thread locked.
        unsafe {
            if FAIR {
                lock.unlock_fair();
            } else {
                lock.unlock();
            }
        }
    }

    /// Creates a new [`KeyGuard`] without checking if the key is held.
    ///
    /// # Safety
    ///
    /// - The invariant that each [`KeyGuard`] holds its key must be upheld whenever a
    ///   [`KeyGuard`] is used or dropped.
    ///
    /// # Example
    ///
    /// ```
    /// use std::mem;
    /// use keyed_mutex::KeyedMutex;
    ///
    /// let mutex = KeyedMutex::new();
    /// mem::forget(mutex.lock(5));
    /// // SAFETY: This recovers the guard we just forgot.
    /// let _guard = unsafe { mutex.make_guard_unchecked(5) };
    /// ```
    #[inline]
    pub unsafe fn make_guard_unchecked(&self, key: K) -> KeyGuard<'_, K, S> {
        // SAFETY: The requirement is forwarded to the caller.
        unsafe { self.make_guard_unchecked_(key) }
    }

    /// # Safety
    ///
    /// - The invariant that each [`KeyGuard`] holds its key must be upheld whenever a
    ///   [`KeyGuard`] is used or dropped.
    #[inline]
    unsafe fn make_guard_unchecked_(&self, key: K) -> KeyGuard<'_, K, S> {
        KeyGuard {
            mutex: self,
            key,
            _phantom_not_send: Default::default(),
            _phantom_not_sync: Default::default(),
        }
    }
}

impl<K, S> Debug for KeyedMutex<K, S>
where
    S: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedMutex")
            .field(
                "active",
                &debug_fn(|fmt| match self.entries.try_lock() {
                    Some(entries) => Debug::fmt(&entries.len(), fmt),
                    None => fmt.write_str("<locked>"),
                }),
            )
            .field("strategy", &self.strategy)
            .finish()
    }
}

impl<K, S> KeyGuard<'_, K, S>
where
    K: Eq + Hash,
    S: Strategy,
{
    /// Returns the key held by this guard.
    #[inline]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Unlocks this guard using a fair unlock protocol.
    ///
    /// # Example
    ///
    /// ```
    /// use keyed_mutex::KeyedMutex;
    ///
    /// let mutex = KeyedMutex::new();
    /// let guard = mutex.lock(1);
    /// guard.unlock_fair();
    /// assert!(!mutex.is_locked(&1));
    /// ```
    #[inline]
    pub fn unlock_fair(self) {
        let slf = ManuallyDrop::new(self);
        // SAFETY: - slf is wrapped in ManuallyDrop and not used after this, so the key
        //           is moved out exactly once.
        let key = unsafe { ptr::read(&slf.key) };
        // SAFETY: - By the invariants, this guard holds the key.
        //         - Since we've wrapped self in ManuallyDrop, it won't be used after
        //           this.
        unsafe {
            slf.mutex.force_unlock_fair(&key);
        }
    }

    /// Unlocks the key, runs a function, and then locks the key again.
    ///
    /// Other threads can lock the key while the function is running. The key is
    /// locked again even if the function panics.
    ///
    /// The guard keeps its claim on the key while the function is running, so the key
    /// keeps its lock object and the strategy is not consulted when relocking.
    ///
    /// # Example
    ///
    /// ```
    /// use std::thread;
    /// use keyed_mutex::KeyedMutex;
    ///
    /// let mutex = KeyedMutex::new();
    /// let mut guard = mutex.lock(1);
    /// guard.unlocked(|| {
    ///     thread::scope(|scope| {
    ///         scope.spawn(|| assert!(mutex.try_lock(1).is_some()));
    ///     });
    /// });
    /// assert!(mutex.is_locked(&1));
    /// ```
    pub fn unlocked<T>(&mut self, f: impl FnOnce() -> T) -> T {
        let lock = self.mutex.lock_object(&self.key);
        // SAFETY: - By the invariants, this guard holds the key, i.e. the current
        //           thread has locked `lock`.
        //         - Since we have a mutable reference, the guard cannot be used or
        //           dropped until _relock below has locked `lock` again.
        unsafe {
            lock.unlock();
        }
        let _relock = on_drop(|| lock.lock());
        f()
    }
}

impl<K, S> Drop for KeyGuard<'_, K, S>
where
    K: Eq + Hash,
    S: Strategy,
{
    #[inline]
    fn drop(&mut self) {
        // SAFETY: - By the invariants, this guard holds the key.
        unsafe {
            self.mutex.force_unlock(&self.key);
        }
    }
}

impl<K, S> Debug for KeyGuard<'_, K, S>
where
    K: Eq + Hash + Debug,
    S: Strategy,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyGuard")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
