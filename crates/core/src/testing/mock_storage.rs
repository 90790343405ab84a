//! Mock key-value storage for testing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};

use crate::storage::{KeyValueStorage, MemoryStorage, StorageError};

/// Key-value storage with failure injection.
///
/// Provides controllable behavior for testing:
/// - Fail reads or writes on demand
/// - Count writes for assertions
/// - Hold writers until released, to observe in-flight operations
#[derive(Debug, Default)]
pub struct MockStorage {
    inner: MemoryStorage,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
    blocked: Mutex<bool>,
    unblocked: Condvar,
}

impl MockStorage {
    /// Create a new empty mock storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read fail with `StorageError::Unavailable`.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail with `StorageError::QuotaExceeded`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes and removals so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Hold every writer until [`release_writes`](Self::release_writes).
    pub fn block_writes(&self) {
        *self.blocked.lock().unwrap_or_else(|e| e.into_inner()) = true;
    }

    /// Let held writers continue.
    pub fn release_writes(&self) {
        *self.blocked.lock().unwrap_or_else(|e| e.into_inner()) = false;
        self.unblocked.notify_all();
    }

    fn wait_for_writes(&self) {
        let mut blocked = self.blocked.lock().unwrap_or_else(|e| e.into_inner());
        while *blocked {
            blocked = self
                .unblocked
                .wait(blocked)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    fn check_write(&self, key: &str, bytes: usize) -> Result<(), StorageError> {
        self.wait_for_writes();
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                bytes,
            });
        }
        Ok(())
    }
}

impl KeyValueStorage for MockStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("mock read failure".to_string()));
        }
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_write(key, value.len())?;
        self.inner.set_item(key, value)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.check_write(key, 0)?;
        self.inner.remove_item(key)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
