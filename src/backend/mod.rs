//! Key-value backends that hold the stored records
//!
//! A backend is a named collection mapping string keys to JSON text. The
//! store writes through to it on every mutation and calls [`Backend::flush`]
//! as its durability barrier. Once [`Backend::close`] has run, every call
//! fails with [`Error::NotInitialized`](crate::error::Error::NotInitialized).

use std::fmt::Debug;

use crate::error::{Error, Result};

mod file;
mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

/// Storage contract consumed by [`EntityStore`](crate::store::EntityStore).
///
/// All methods take `&self`; implementations use interior mutability so one
/// handle can be shared between the store and its auto-save task.
pub trait Backend: Send + Sync + Debug {
    /// Name of the collection this handle is scoped to
    fn name(&self) -> &str;

    /// Stored text for `key`, or `None` if absent
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite one record
    fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Insert or overwrite several records in one write; later entries win
    fn put_all(&self, entries: &[(String, String)]) -> Result<()>;

    /// Remove one record; absent keys are ignored
    fn delete(&self, key: &str) -> Result<()>;

    /// Remove several records in one write; absent keys are ignored
    fn delete_all(&self, keys: &[String]) -> Result<()>;

    /// All present keys, in the backend's iteration order
    fn keys(&self) -> Result<Vec<String>>;

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Remove every record
    fn clear(&self) -> Result<()>;

    /// Number of present keys
    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Make every prior put/delete crash-safe
    fn flush(&self) -> Result<()>;

    /// Release the handle. Unflushed writes are not synced.
    fn close(&self) -> Result<()>;

    fn is_closed(&self) -> bool;
}

/// Collection names become file names, so keep them to a safe alphabet.
pub fn validate_collection_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "invalid collection name '{name}' (expected 1-64 chars of [A-Za-z0-9_-])"
        )))
    }
}
