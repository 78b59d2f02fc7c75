use chrono::{DateTime, Utc};
use std::iter;

use super::{reduce_at, Action};
use crate::book::{Book, Collection};
use crate::error::ReducerError;

/// An action the store accepted, with the time it was applied.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedAction {
    pub action: Action,
    pub at: DateTime<Utc>,
}

impl AcceptedAction {
    pub fn new(action: Action, at: DateTime<Utc>) -> Self {
        AcceptedAction { action, at }
    }
}

/// Replay `accepted` on top of `loaded`.
///
/// Used when the initial load resolves after the user already changed the
/// collection: the loaded books are kept and the user's actions are applied
/// over them in order. Replay never fails. Adding a book that was already
/// stored moves it to the front under the new status and keeps its stored
/// `added_on`; reclassifying or removing a book that is gone is skipped.
pub fn rebase(loaded: &Collection, accepted: &[AcceptedAction]) -> Collection {
    accepted
        .iter()
        .fold(loaded.clone(), |collection, accepted| replay(&collection, accepted))
}

fn replay(collection: &Collection, accepted: &AcceptedAction) -> Collection {
    match reduce_at(collection, &accepted.action, accepted.at) {
        Ok(next) => next,
        Err(ReducerError::AlreadyExists { book_id }) => {
            let Action::Add { entry, status } = &accepted.action else {
                return collection.clone();
            };
            let added_on = collection
                .get(&book_id)
                .map(Book::added_on)
                .unwrap_or(accepted.at);
            let refiled = Book::file(entry.clone(), *status, added_on);
            iter::once(refiled)
                .chain(collection.iter().filter(|book| *book.id() != book_id).cloned())
                .collect()
        }
        Err(err) => {
            tracing::warn!(action = accepted.action.name(), %err, "skipping action while rebasing");
            collection.clone()
        }
    }
}
