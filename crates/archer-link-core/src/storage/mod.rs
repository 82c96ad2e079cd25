//! # Key-Value Persistence
//!
//! The cache and the session resolver never touch a concrete store; they
//! receive a `KeyValueStore` and only ever get, set or delete string values
//! by string key.
//!
//! ## Backends
//!
//! - `MemoryStore`: volatile, lives as long as the owning process. This is
//!   the stand-in for tab-scoped storage.
//! - `RedbStore`: disk-backed, survives restarts. This is the stand-in for
//!   origin-scoped durable storage.

mod redb_store;

pub use redb_store::RedbStore;

use crate::ArcherError;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Abstract string key-value persistence.
///
/// Implementations must be `Send + Sync`; concurrent writers are not
/// coordinated (last writer wins).
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, ArcherError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), ArcherError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<(), ArcherError>;
}

/// In-memory key-value store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        // A poisoned map is still structurally valid.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, ArcherError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ArcherError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), ArcherError> {
        self.lock().remove(key);
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_set_get_delete() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.set("k", "v1").expect("set");
        store.set("k", "v2").expect("overwrite");
        assert_eq!(store.get("k").expect("get").as_deref(), Some("v2"));
        assert_eq!(store.len(), 1);

        store.delete("k").expect("delete");
        assert_eq!(store.get("k").expect("get"), None);
    }

    #[test]
    fn deleting_absent_key_is_ok() {
        let store = MemoryStore::new();
        assert!(store.delete("missing").is_ok());
    }
}
