//! Library state store for a reading-list tracker.
//!
//! Books are filed on one of three shelves (Reading, Completed, Wishlist).
//! The [`LibraryStore`] holds the collection as an immutable snapshot, runs
//! every change through a pure [reducer](reduce), notifies subscribers, and
//! keeps a single key-value slot in sync through a [`PersistenceGateway`].

mod book;
mod config;
mod error;
mod persist;
mod reducer;
mod store;
mod view;

pub use book::{Author, Book, BookId, CatalogEntry, Collection, Status, UnknownStatus};
pub use config::{PersistConfig, StoreConfig, DEFAULT_STORAGE_KEY};
pub use error::{ConfigError, PersistenceError, ReducerError, StoreError};
#[cfg(feature = "fs")]
pub use persist::FileKeyValueStore;
pub use persist::{
    Codec, InMemoryKeyValueStore, KeyValueGateway, KeyValueStore, PersistenceGateway,
};
pub use reducer::{rebase, reduce, reduce_at, AcceptedAction, Action, Choice};
pub use store::{LibraryStore, LoadOutcome, LoadTask, PersistStats, Subscription};
pub use view::{project, ShelfCounts, Shelves};
