use super::Action;
use crate::book::{CatalogEntry, Collection, Status};
use crate::error::ReducerError;

/// What the user picked on the status sheet: a shelf, or taking the book
/// off the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Status(Status),
    Remove,
}

impl From<Status> for Choice {
    fn from(status: Status) -> Self {
        Choice::Status(status)
    }
}

impl Action {
    /// Resolve a status-sheet choice for `entry` into exactly one action.
    ///
    /// A book that is not filed yet is added; `Remove` removes it; any other
    /// choice reclassifies it.
    pub fn for_choice(
        collection: &Collection,
        entry: &CatalogEntry,
        choice: Choice,
    ) -> Result<Action, ReducerError> {
        let filed = collection.contains(&entry.book_id);
        match choice {
            Choice::Remove if filed => Ok(Action::remove(entry.book_id.clone())),
            Choice::Remove => Err(ReducerError::NotFound {
                book_id: entry.book_id.clone(),
            }),
            Choice::Status(status) if filed => {
                Ok(Action::reclassify(entry.book_id.clone(), status))
            }
            Choice::Status(status) => Ok(Action::add(entry.clone(), status)),
        }
    }

    /// The action one tap on the details screen performs: file a new book as
    /// Reading, otherwise advance it along the status cycle, removing it
    /// after Wishlist.
    pub fn for_cycle(collection: &Collection, entry: &CatalogEntry) -> Action {
        match collection.get(&entry.book_id).map(|book| book.status().next()) {
            None => Action::add(entry.clone(), Status::Reading),
            Some(Some(next)) => Action::reclassify(entry.book_id.clone(), next),
            Some(None) => Action::remove(entry.book_id.clone()),
        }
    }
}
