//! Storage abstraction for local persistence.
//!
//! The durable store is a flat key/value space of serialized element
//! sequences, keyed `whiteboard:<canvasId>`. Backends are synchronous; the
//! autosave layer above decides when writes happen.

mod autosave;
mod file;
mod memory;

pub use autosave::{AUTOSAVE_DELAY, AutosaveManager, canvas_key};
pub use file::FileStorage;
pub use memory::MemoryStorage;

use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Entry not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for durable key/value backends.
///
/// Payloads are opaque serialized text; validation and coercion happen in
/// the element decoder, not here.
pub trait Storage: Send + Sync {
    /// Write a payload under a key, replacing any previous value.
    fn save(&self, key: &str, payload: &str) -> StorageResult<()>;

    /// Read the payload for a key.
    fn load(&self, key: &str) -> StorageResult<String>;

    /// Remove a key. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> StorageResult<()>;

    /// List all stored keys.
    fn list(&self) -> StorageResult<Vec<String>>;

    /// Check whether a key exists.
    fn exists(&self, key: &str) -> StorageResult<bool>;
}
