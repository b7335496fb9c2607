//! Per-key locks - serialize read-modify-write sequences on one logical key.
//!
//! The reservation protocol holds an offering's lock from its sold-out
//! re-check through the batch commit, so two reservations against the same
//! offering cannot interleave between the guard read and the decrement.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};

use crate::error::StoreError;

struct KeyedLock {
    state: Mutex<bool>,
    wake: Condvar,
}

impl KeyedLock {
    fn new() -> Self {
        KeyedLock {
            state: Mutex::new(false),
            wake: Condvar::new(),
        }
    }

    fn lock(&self) -> Result<(), StoreError> {
        let mut locked = self
            .state
            .lock()
            .map_err(|_| StoreError::Storage("keyed lock poisoned".into()))?;
        while *locked {
            locked = self
                .wake
                .wait(locked)
                .map_err(|_| StoreError::Storage("keyed lock poisoned".into()))?;
        }
        *locked = true;
        Ok(())
    }

    fn unlock(&self) {
        if let Ok(mut locked) = self.state.lock() {
            if *locked {
                *locked = false;
                self.wake.notify_one();
            }
        }
    }
}

/// Lazily creates one lock per key; repeated lookups share the same lock.
pub struct LockManager {
    locks: Mutex<HashMap<String, Arc<KeyedLock>>>,
}

impl LockManager {
    pub fn new() -> Self {
        LockManager {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Block until the key's lock is held. Released when the guard drops.
    pub fn acquire(&self, key: &str) -> Result<LockGuard, StoreError> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .map_err(|_| StoreError::Storage("lock manager map poisoned".into()))?;
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(KeyedLock::new()))
                .clone()
        };
        lock.lock()?;
        Ok(LockGuard { lock })
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds a keyed lock; unlocks on drop.
pub struct LockGuard {
    lock: Arc<KeyedLock>,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}
