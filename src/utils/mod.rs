//! Shared utilities: population orderings and internal sync helpers

pub mod constrained;
pub mod multi_objective;

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

// Worker tasks catch panics from user code, so a poisoned lock only means a
// panic in library code; recovering the guard keeps wait()/drop usable.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn read<T>(l: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    l.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(l: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    l.write().unwrap_or_else(PoisonError::into_inner)
}

pub mod prelude {
    pub use super::constrained::*;
    pub use super::multi_objective::*;
}
