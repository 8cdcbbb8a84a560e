//! Utility functions for minicluster

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Generate a fresh store identity
pub fn generate_store_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Lock a mutex, recovering the guard if a previous holder panicked.
///
/// Every value guarded in this crate stays consistent across a panic
/// (plain maps, flags and counters), so poisoning carries no information.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
