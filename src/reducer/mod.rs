//! The mutation reducer: every business rule of the collection lives here.
//!
//! [`reduce`] is pure. It never performs I/O and never touches its input;
//! each accepted action yields a fresh [`Collection`], which is what lets the
//! store compute the next snapshot synchronously and swap it in atomically.

mod choice;
mod rebase;

use chrono::{DateTime, Utc};
use std::iter;

use crate::book::{Book, BookId, CatalogEntry, Collection, Status};
use crate::error::ReducerError;

pub use choice::Choice;
pub use rebase::{rebase, AcceptedAction};

/// A unit of intended mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Seed the collection, keeping the given order verbatim.
    ReplaceAll(Collection),
    /// File a book that is not in the collection yet.
    Add { entry: CatalogEntry, status: Status },
    /// Move a filed book to another shelf.
    Reclassify { book_id: BookId, status: Status },
    /// Take a filed book out of the collection.
    Remove { book_id: BookId },
}

impl Action {
    pub fn add(entry: CatalogEntry, status: Status) -> Self {
        Action::Add { entry, status }
    }

    pub fn reclassify(book_id: impl Into<BookId>, status: Status) -> Self {
        Action::Reclassify {
            book_id: book_id.into(),
            status,
        }
    }

    pub fn remove(book_id: impl Into<BookId>) -> Self {
        Action::Remove {
            book_id: book_id.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::ReplaceAll(_) => "replace_all",
            Action::Add { .. } => "add",
            Action::Reclassify { .. } => "reclassify",
            Action::Remove { .. } => "remove",
        }
    }

    /// The single book this action targets, if any.
    pub fn book_id(&self) -> Option<&BookId> {
        match self {
            Action::ReplaceAll(_) => None,
            Action::Add { entry, .. } => Some(&entry.book_id),
            Action::Reclassify { book_id, .. } | Action::Remove { book_id } => Some(book_id),
        }
    }
}

/// Apply `action` to `collection`, stamping new books with the current time.
pub fn reduce(collection: &Collection, action: &Action) -> Result<Collection, ReducerError> {
    reduce_at(collection, action, Utc::now())
}

/// Apply `action` to `collection`, stamping new books with `now`.
pub fn reduce_at(
    collection: &Collection,
    action: &Action,
    now: DateTime<Utc>,
) -> Result<Collection, ReducerError> {
    match action {
        Action::ReplaceAll(next) => {
            next.validate()?;
            Ok(next.clone())
        }
        Action::Add { entry, status } => {
            if collection.contains(&entry.book_id) {
                return Err(ReducerError::AlreadyExists {
                    book_id: entry.book_id.clone(),
                });
            }
            let added = Book::file(entry.clone(), *status, now);
            Ok(iter::once(added).chain(collection.iter().cloned()).collect())
        }
        Action::Reclassify { book_id, status } => {
            let index = find(collection, book_id)?;
            let moved = collection[index].with_status(*status);
            Ok(iter::once(moved)
                .chain(without(collection, index))
                .collect())
        }
        Action::Remove { book_id } => {
            let index = find(collection, book_id)?;
            Ok(without(collection, index).collect())
        }
    }
}

fn find(collection: &Collection, book_id: &BookId) -> Result<usize, ReducerError> {
    collection
        .position(book_id)
        .ok_or_else(|| ReducerError::NotFound {
            book_id: book_id.clone(),
        })
}

fn without(collection: &Collection, index: usize) -> impl Iterator<Item = Book> + '_ {
    collection
        .iter()
        .enumerate()
        .filter(move |(i, _)| *i != index)
        .map(|(_, book)| book.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::Author;

    fn entry(id: &str) -> CatalogEntry {
        CatalogEntry::new(id, format!("Book {}", id), Author::named("Someone"))
    }

    fn ids(collection: &Collection) -> Vec<&str> {
        collection.ids().map(BookId::as_str).collect()
    }

    fn seeded(books: &[(&str, Status)]) -> Collection {
        let mut collection = Collection::new();
        for (id, status) in books.iter().rev() {
            collection = reduce(&collection, &Action::add(entry(id), *status)).unwrap();
        }
        collection
    }

    #[test]
    fn add_prepends_and_stamps() {
        let now = Utc::now();
        let first = reduce_at(&Collection::new(), &Action::add(entry("2"), Status::Reading), now)
            .unwrap();
        let second = reduce(&first, &Action::add(entry("3"), Status::Wishlist)).unwrap();

        assert_eq!(ids(&second), ["3", "2"]);
        assert_eq!(second[1].added_on(), now);
        assert_eq!(second[0].status(), Status::Wishlist);
        assert_eq!(ids(&first), ["2"]);
    }

    #[test]
    fn add_rejects_present_book() {
        let collection = seeded(&[("1", Status::Reading)]);
        let err = reduce(&collection, &Action::add(entry("1"), Status::Wishlist)).unwrap_err();
        assert_eq!(
            err,
            ReducerError::AlreadyExists {
                book_id: BookId::from("1")
            }
        );
    }

    #[test]
    fn reclassify_moves_to_front_and_keeps_the_rest_in_order() {
        let collection = seeded(&[
            ("1", Status::Reading),
            ("2", Status::Reading),
            ("3", Status::Wishlist),
            ("4", Status::Completed),
        ]);
        let added_on = collection[2].added_on();

        let next = reduce(&collection, &Action::reclassify("3", Status::Completed)).unwrap();
        assert_eq!(ids(&next), ["3", "1", "2", "4"]);
        assert_eq!(next[0].status(), Status::Completed);
        assert_eq!(next[0].added_on(), added_on);
    }

    #[test]
    fn remove_keeps_relative_order() {
        let collection = seeded(&[("1", Status::Reading), ("2", Status::Reading), ("3", Status::Reading)]);
        let next = reduce(&collection, &Action::remove("2")).unwrap();
        assert_eq!(ids(&next), ["1", "3"]);

        let emptied = reduce(&reduce(&next, &Action::remove("1")).unwrap(), &Action::remove("3"))
            .unwrap();
        assert!(emptied.is_empty());
    }

    #[test]
    fn missing_books_are_not_found() {
        let collection = seeded(&[("1", Status::Reading)]);
        for action in [Action::remove("9"), Action::reclassify("9", Status::Completed)] {
            assert_eq!(
                reduce(&collection, &action).unwrap_err(),
                ReducerError::NotFound {
                    book_id: BookId::from("9")
                }
            );
        }
    }

    #[test]
    fn replace_all_keeps_order_and_rejects_duplicates() {
        let given = seeded(&[("5", Status::Wishlist), ("1", Status::Reading)]);
        let next = reduce(&Collection::new(), &Action::ReplaceAll(given.clone())).unwrap();
        assert!(next.ptr_eq(&given));

        let mut books = given.to_vec();
        books.push(given[0].clone());
        let err = reduce(&next, &Action::ReplaceAll(books.into())).unwrap_err();
        assert_eq!(
            err,
            ReducerError::DuplicateBook {
                book_id: BookId::from("5")
            }
        );
    }

    #[test]
    fn input_is_never_mutated() {
        let collection = seeded(&[("1", Status::Reading), ("2", Status::Completed)]);
        let before = collection.to_vec();
        let _ = reduce(&collection, &Action::reclassify("2", Status::Wishlist)).unwrap();
        let _ = reduce(&collection, &Action::remove("1")).unwrap();
        assert_eq!(collection.to_vec(), before);
    }
}
