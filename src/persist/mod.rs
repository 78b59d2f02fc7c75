//! Persistence gateway - durable storage for the collection.
//!
//! The store only ever talks to a [`PersistenceGateway`]: load the stored
//! collection once, save a snapshot after every accepted mutation. Both calls
//! may be slow or fail; the store runs them on its own worker thread.
//!
//! The provided gateway, [`KeyValueGateway`], keeps the whole collection in
//! a single slot of a [`KeyValueStore`], encoded with a [`Codec`].
//!
//! ## Example
//!
//! ```ignore
//! use reading_list::{Codec, InMemoryKeyValueStore, KeyValueGateway, PersistenceGateway};
//!
//! let gateway = KeyValueGateway::new(InMemoryKeyValueStore::new(), "@lists", Codec::Json);
//! gateway.save(&collection)?;
//! let loaded = gateway.load()?;
//! ```

mod codec;
#[cfg(feature = "fs")]
mod file;
mod gateway;
mod in_memory;

use std::sync::Arc;

use crate::book::Collection;
use crate::error::PersistenceError;

pub use codec::Codec;
#[cfg(feature = "fs")]
pub use file::FileKeyValueStore;
pub use gateway::KeyValueGateway;
pub use in_memory::InMemoryKeyValueStore;

/// Byte-string storage addressed by key.
pub trait KeyValueStore: Send + Sync {
    /// Read the value under `key`. `None` if nothing was ever written.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError>;

    /// Replace the value under `key`.
    fn set(&self, key: &str, value: Vec<u8>) -> Result<(), PersistenceError>;
}

/// Durable home of the collection, as seen by the store.
pub trait PersistenceGateway: Send {
    /// Read the stored collection. `Ok(None)` when nothing is stored.
    fn load(&self) -> Result<Option<Collection>, PersistenceError>;

    /// Overwrite the stored collection with `collection`.
    fn save(&self, collection: &Collection) -> Result<(), PersistenceError>;
}

impl<G: PersistenceGateway + ?Sized> PersistenceGateway for Box<G> {
    fn load(&self) -> Result<Option<Collection>, PersistenceError> {
        (**self).load()
    }

    fn save(&self, collection: &Collection) -> Result<(), PersistenceError> {
        (**self).save(collection)
    }
}

impl<G: PersistenceGateway + Sync + ?Sized> PersistenceGateway for Arc<G> {
    fn load(&self) -> Result<Option<Collection>, PersistenceError> {
        (**self).load()
    }

    fn save(&self, collection: &Collection) -> Result<(), PersistenceError> {
        (**self).save(collection)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<(), PersistenceError> {
        (**self).set(key, value)
    }
}
