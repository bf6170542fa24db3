// MIT License
// Copyright 2023--present kimpy developers

//! Scoped release of the caller's global execution lock.
//!
//! `KIM_API_model_compute` can run for a long time. A caller that holds a
//! global lock (the Python GIL, an application-wide mutex) may ask the adapter
//! to drop that lock for the duration of the native call. [`ExecutionLock`]
//! abstracts over "how to release and reacquire":
//!
//! - [`NoExecutionLock`] for environments without such a lock.
//! - `parking_lot::MutexGuard`, released through `MutexGuard::unlocked`.
//! - The GIL, in the `python` module.
//!
//! Every implementation must reacquire the lock after the closure returns,
//! including when it unwinds.

/// A lock held by the caller that can be released around a closure.
pub trait ExecutionLock {
    /// Run `f` with the lock released, then take it back.
    fn unlocked<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send;
}

/// The calling environment has no global lock; `unlocked` just runs `f`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExecutionLock;

impl ExecutionLock for NoExecutionLock {
    fn unlocked<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        f()
    }
}

impl<T: ?Sized> ExecutionLock for parking_lot::MutexGuard<'_, T> {
    fn unlocked<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        // Relocks on unwind as well.
        parking_lot::MutexGuard::unlocked(self, f)
    }
}
