//! Error types for the reducer, the persistence layer, and the store.

use thiserror::Error;

use crate::book::BookId;

/// Rejection of an action by the reducer. State is never changed when one
/// of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReducerError {
    /// `Add` for a book that is already filed.
    #[error("book {book_id} is already in the collection")]
    AlreadyExists { book_id: BookId },

    /// `Reclassify` or `Remove` for a book that is not filed.
    #[error("book {book_id} is not in the collection")]
    NotFound { book_id: BookId },

    /// `ReplaceAll` with a collection that lists the same book twice.
    #[error("collection lists book {book_id} more than once")]
    DuplicateBook { book_id: BookId },
}

/// Failure at the storage layer or while encoding/decoding the stored value.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to {operation} key {key}")]
    Io {
        operation: &'static str,
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("persisted collection is malformed: {reason}")]
    MalformedPersistedData { reason: String },

    #[error("failed to encode collection as {codec}: {reason}")]
    Encode { codec: &'static str, reason: String },

    #[error("storage lock poisoned during {0}")]
    LockPoisoned(&'static str),
}

impl PersistenceError {
    pub(crate) fn malformed(reason: impl ToString) -> Self {
        PersistenceError::MalformedPersistedData {
            reason: reason.to_string(),
        }
    }

    /// Whether retrying the same operation could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PersistenceError::Io { .. } | PersistenceError::LockPoisoned(_)
        )
    }
}

impl From<ReducerError> for PersistenceError {
    fn from(err: ReducerError) -> Self {
        PersistenceError::malformed(err)
    }
}

/// Misuse of the store lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store has already been initialized")]
    AlreadyInitialized,
}

/// Invalid [`StoreConfig`](crate::StoreConfig) input.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid store configuration")]
    Parse(#[from] serde_json::Error),
}
