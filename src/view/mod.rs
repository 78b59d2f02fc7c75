//! Categorized view: the collection split into its three shelves.
//!
//! A projection is derived from one snapshot and never updated in place;
//! when the store publishes a new snapshot, project it again.

use crate::book::{Book, Collection, Status};

/// The collection partitioned by status. Each shelf keeps the collection's
/// own front-to-back order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shelves {
    pub reading: Vec<Book>,
    pub completed: Vec<Book>,
    pub wishlist: Vec<Book>,
}

/// Number of books on each shelf.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShelfCounts {
    pub reading: usize,
    pub completed: usize,
    pub wishlist: usize,
}

/// Split `collection` into shelves.
pub fn project(collection: &Collection) -> Shelves {
    let mut shelves = Shelves::default();
    for book in collection {
        shelves.shelf_mut(book.status()).push(book.clone());
    }
    shelves
}

impl Shelves {
    pub fn shelf(&self, status: Status) -> &[Book] {
        match status {
            Status::Reading => &self.reading,
            Status::Completed => &self.completed,
            Status::Wishlist => &self.wishlist,
        }
    }

    fn shelf_mut(&mut self, status: Status) -> &mut Vec<Book> {
        match status {
            Status::Reading => &mut self.reading,
            Status::Completed => &mut self.completed,
            Status::Wishlist => &mut self.wishlist,
        }
    }

    /// Total number of books across all shelves.
    pub fn len(&self) -> usize {
        self.reading.len() + self.completed.len() + self.wishlist.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn counts(&self) -> ShelfCounts {
        ShelfCounts {
            reading: self.reading.len(),
            completed: self.completed.len(),
            wishlist: self.wishlist.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::{Author, BookId, CatalogEntry};
    use crate::reducer::{reduce, Action};

    fn collection(books: &[(&str, Status)]) -> Collection {
        books.iter().rev().fold(Collection::new(), |c, (id, status)| {
            let entry = CatalogEntry::new(*id, "T", Author::named("A"));
            reduce(&c, &Action::add(entry, *status)).unwrap()
        })
    }

    fn ids(books: &[Book]) -> Vec<&str> {
        books.iter().map(|b| b.id().as_str()).collect()
    }

    #[test]
    fn every_book_lands_on_exactly_one_shelf_in_order() {
        let shelves = project(&collection(&[
            ("1", Status::Reading),
            ("2", Status::Wishlist),
            ("3", Status::Reading),
            ("4", Status::Completed),
            ("5", Status::Wishlist),
        ]));

        assert_eq!(ids(&shelves.reading), ["1", "3"]);
        assert_eq!(ids(&shelves.completed), ["4"]);
        assert_eq!(ids(shelves.shelf(Status::Wishlist)), ["2", "5"]);
        assert_eq!(shelves.len(), 5);
        assert_eq!(
            shelves.counts(),
            ShelfCounts {
                reading: 2,
                completed: 1,
                wishlist: 2
            }
        );
    }

    #[test]
    fn reclassified_book_changes_shelf() {
        let before = collection(&[("1", Status::Reading)]);
        let after = reduce(&before, &Action::reclassify("1", Status::Completed)).unwrap();

        let shelves = project(&after);
        assert!(shelves.reading.is_empty());
        assert!(shelves.wishlist.is_empty());
        assert_eq!(shelves.completed.len(), 1);
        assert_eq!(shelves.completed[0].id(), &BookId::from("1"));

        assert_eq!(ids(&project(&before).reading), ["1"]);
    }

    #[test]
    fn empty_collection_projects_to_empty_shelves() {
        assert!(project(&Collection::new()).is_empty());
    }
}
