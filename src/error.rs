use thiserror::Error;

/// Errors returned by [`LockPool`](crate::LockPool) and the constructors built on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The capacities passed to [`LockPool::new`](crate::LockPool::new) are invalid.
    ///
    /// `max` must be positive and `initial` must not exceed `max`.
    #[error("invalid capacity settings: initial capacity {initial}, maximum capacity {max}")]
    InvalidCapacity { initial: usize, max: usize },
    /// The pool has been closed with [`LockPool::close`](crate::LockPool::close).
    #[error("pool is closed")]
    Closed,
}
