pub mod memory;
pub mod sqlite;

use crate::error::StorageError;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

/// Key-value string storage the store persists its state into
pub trait PersistenceBackend {
    /// Read the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}
