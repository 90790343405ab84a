//! Durable key-value storage.
//!
//! The watchlist is persisted through a small string-keyed contract with the
//! same shape as browser localStorage: one JSON document per key. Backends
//! are synchronous; callers never await storage.

mod memory;
mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use thiserror::Error;

/// Errors raised by storage backends.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// Backend could not be reached (locked, closed, I/O failure).
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Write would exceed the backend's capacity.
    #[error("Storage quota exceeded writing {bytes} bytes to '{key}'")]
    QuotaExceeded { key: String, bytes: usize },

    /// Value could not be encoded for storage.
    #[error("Failed to serialize value: {0}")]
    Serialization(String),
}

/// Trait for durable string key-value backends.
pub trait KeyValueStorage: Send + Sync {
    /// Read the raw value stored under `key`, if any.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Removing an absent key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}
