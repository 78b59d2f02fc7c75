use std::collections::HashSet;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use super::{Book, BookId};
use crate::error::ReducerError;

/// Ordered, immutable list of filed books, most recently touched first.
///
/// Clones share the same allocation, so handing a snapshot to readers is
/// cheap and [`Collection::ptr_eq`] tells whether two snapshots are the
/// very same value. Every change produces a new `Collection`.
#[derive(Clone, Default)]
pub struct Collection {
    books: Arc<Vec<Book>>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether both handles point at the same snapshot.
    pub fn ptr_eq(&self, other: &Collection) -> bool {
        Arc::ptr_eq(&self.books, &other.books)
    }

    pub fn get(&self, id: &BookId) -> Option<&Book> {
        self.books.iter().find(|book| book.id() == id)
    }

    pub fn position(&self, id: &BookId) -> Option<usize> {
        self.books.iter().position(|book| book.id() == id)
    }

    pub fn contains(&self, id: &BookId) -> bool {
        self.position(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &BookId> + '_ {
        self.books.iter().map(Book::id)
    }

    /// Check that no book is listed twice.
    pub fn validate(&self) -> Result<(), ReducerError> {
        let mut seen = HashSet::with_capacity(self.books.len());
        for book in self.books.iter() {
            if !seen.insert(book.id()) {
                return Err(ReducerError::DuplicateBook {
                    book_id: book.id().clone(),
                });
            }
        }
        Ok(())
    }

    pub fn to_vec(&self) -> Vec<Book> {
        self.books.as_ref().clone()
    }
}

impl Deref for Collection {
    type Target = [Book];

    fn deref(&self) -> &[Book] {
        &self.books
    }
}

impl From<Vec<Book>> for Collection {
    fn from(books: Vec<Book>) -> Self {
        Collection {
            books: Arc::new(books),
        }
    }
}

impl FromIterator<Book> for Collection {
    fn from_iter<I: IntoIterator<Item = Book>>(iter: I) -> Self {
        Collection::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Book;
    type IntoIter = std::slice::Iter<'a, Book>;

    fn into_iter(self) -> Self::IntoIter {
        self.books.iter()
    }
}

impl PartialEq for Collection {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.books == other.books
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.books.iter()).finish()
    }
}
