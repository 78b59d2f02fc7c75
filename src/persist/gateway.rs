use super::{Codec, KeyValueStore, PersistenceGateway};
use crate::book::Collection;
use crate::config::StoreConfig;
use crate::error::PersistenceError;

/// Stores the whole collection under one key of a [`KeyValueStore`].
pub struct KeyValueGateway<S> {
    store: S,
    key: String,
    codec: Codec,
}

impl<S: KeyValueStore> KeyValueGateway<S> {
    pub fn new(store: S, key: impl Into<String>, codec: Codec) -> Self {
        KeyValueGateway {
            store,
            key: key.into(),
            codec,
        }
    }

    /// Gateway using the key and codec from `config`.
    pub fn from_config(store: S, config: &StoreConfig) -> Self {
        Self::new(store, config.storage_key.clone(), config.codec)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Access the underlying key-value store.
    pub fn inner(&self) -> &S {
        &self.store
    }
}

impl<S: KeyValueStore> PersistenceGateway for KeyValueGateway<S> {
    fn load(&self) -> Result<Option<Collection>, PersistenceError> {
        let bytes = match self.store.get(&self.key)? {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => return Ok(None),
        };

        let collection = self.codec.decode(&bytes)?;
        collection.validate()?;

        tracing::debug!(key = %self.key, books = collection.len(), "loaded collection");
        Ok(Some(collection))
    }

    fn save(&self, collection: &Collection) -> Result<(), PersistenceError> {
        let bytes = self.codec.encode(collection)?;
        let size = bytes.len();
        self.store.set(&self.key, bytes)?;

        tracing::debug!(key = %self.key, books = collection.len(), bytes = size, "saved collection");
        Ok(())
    }
}
