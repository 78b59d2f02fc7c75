//! InMemoryKeyValueStore - HashMap-backed storage for tests and development.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::KeyValueStore;
use crate::error::PersistenceError;

/// In-memory key-value store. Clones share the same storage via `Arc`, so a
/// test can keep a handle while the store's worker owns another.
#[derive(Clone, Default)]
pub struct InMemoryKeyValueStore {
    storage: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> Result<usize, PersistenceError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| PersistenceError::LockPoisoned("read"))?;
        Ok(storage.len())
    }

    pub fn is_empty(&self) -> Result<bool, PersistenceError> {
        Ok(self.len()? == 0)
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| PersistenceError::LockPoisoned("read"))?;
        Ok(storage.get(key).cloned())
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<(), PersistenceError> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| PersistenceError::LockPoisoned("write"))?;
        storage.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let store = InMemoryKeyValueStore::new();
        assert!(store.is_empty().unwrap());
        assert!(store.get("@lists").unwrap().is_none());
    }

    #[test]
    fn clones_share_storage() {
        let store = InMemoryKeyValueStore::new();
        let handle = store.clone();

        store.set("@lists", b"[]".to_vec()).unwrap();
        assert_eq!(handle.get("@lists").unwrap(), Some(b"[]".to_vec()));

        handle.set("@lists", b"[1]".to_vec()).unwrap();
        assert_eq!(store.get("@lists").unwrap(), Some(b"[1]".to_vec()));
        assert_eq!(store.len().unwrap(), 1);
    }
}
