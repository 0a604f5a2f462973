//! This crate provides [`KeyedMutex`], a mutex that is locked and unlocked by key.
//!
//! # Motivation
//!
//! A common need is to serialize access to resources that are named by an identifier,
//! such as a user ID or a row ID, without serializing access to unrelated resources:
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::{Arc, Mutex};
//!
//! struct Accounts {
//!     locks: Mutex<HashMap<u64, Arc<Mutex<()>>>>,
//! }
//! ```
//!
//! Pre-allocating one mutex per identifier is impossible when the identifier space is
//! unbounded, and inserting mutexes on demand, as above, leaks memory unless something
//! removes them again once nobody uses them.
//!
//! [`KeyedMutex`] creates the lock object of a key when the first thread tries to lock
//! it and removes it once the last such thread has unlocked it. Threads only block on
//! the lock object of their key, never on the bookkeeping of other keys.
//!
//! # Example
//!
//! ```
//! use std::thread;
//! use keyed_mutex::KeyedMutex;
//!
//! let mutex = KeyedMutex::new();
//!
//! thread::scope(|scope| {
//!     for id in 0..8u64 {
//!         let mutex = &mutex;
//!         scope.spawn(move || {
//!             let _guard = mutex.lock(id % 2);
//!             // At most one thread per key is here.
//!         });
//!     }
//! });
//!
//! assert!(mutex.is_empty());
//! ```
//!
//! # Pooling
//!
//! By default a new [`LockObject`] is allocated for every key that becomes active. To
//! bound the number of idle lock objects kept around and reuse them across keys, back
//! the mutex with a [`LockPool`]:
//!
//! ```
//! use std::sync::Arc;
//! use keyed_mutex::{LockPool, PooledKeyedMutex};
//!
//! let pool = Arc::new(LockPool::new(10, 10)?);
//! let mutex: PooledKeyedMutex<u32> = PooledKeyedMutex::with_pool(pool)?;
//! let _guard = mutex.lock(1);
//! # Ok::<(), keyed_mutex::PoolError>(())
//! ```
//!
//! The pool never blocks. If it is empty, a new lock object is created. If it is full,
//! a returned lock object is dropped.
//!
//! Other policies can be implemented with the [`Strategy`] trait.

pub use {
    error::PoolError,
    keyed_mutex::{KeyGuard, KeyedMutex},
    lock_object::LockObject,
    pool::LockPool,
    strategy::{Pooled, Strategy, Unpooled},
};

mod error;
mod keyed_mutex;
mod lock_object;
mod pool;
mod strategy;

/// A [`KeyedMutex`] whose lock objects are recycled through a [`LockPool`].
pub type PooledKeyedMutex<K> = KeyedMutex<K, Pooled>;
