//! Persisted layout of a collection: a flat array of book records.
//!
//! The same shape is used by every codec. Records written by older builds
//! may carry the literal status `"Remove"`; those books were meant to leave
//! the collection, so they are dropped while decoding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{Author, Book, BookId, CatalogEntry, Collection, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum StoredStatus {
    Reading,
    Completed,
    Wishlist,
    Remove,
}

impl From<Status> for StoredStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::Reading => StoredStatus::Reading,
            Status::Completed => StoredStatus::Completed,
            Status::Wishlist => StoredStatus::Wishlist,
        }
    }
}

impl StoredStatus {
    fn into_status(self) -> Option<Status> {
        match self {
            StoredStatus::Reading => Some(Status::Reading),
            StoredStatus::Completed => Some(Status::Completed),
            StoredStatus::Wishlist => Some(Status::Wishlist),
            StoredStatus::Remove => None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredBookRef<'a> {
    book_id: &'a BookId,
    title: &'a str,
    author: &'a Author,
    image_url: &'a str,
    num_pages: u32,
    avg_rating: f64,
    description: &'a str,
    related_ids: &'a [BookId],
    status: StoredStatus,
    added_on: Option<&'a DateTime<Utc>>,
}

impl<'a> From<&'a Book> for StoredBookRef<'a> {
    fn from(book: &'a Book) -> Self {
        let entry = &book.entry;
        StoredBookRef {
            book_id: &entry.book_id,
            title: &entry.title,
            author: &entry.author,
            image_url: &entry.image_url,
            num_pages: entry.num_pages,
            avg_rating: entry.avg_rating,
            description: &entry.description,
            related_ids: &entry.related_ids,
            status: book.status.into(),
            added_on: Some(&book.added_on),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredBook {
    book_id: BookId,
    #[serde(alias = "bookTitleBare")]
    title: String,
    author: Author,
    #[serde(default)]
    image_url: String,
    #[serde(default)]
    num_pages: u32,
    #[serde(default)]
    avg_rating: f64,
    #[serde(default)]
    description: String,
    #[serde(default)]
    related_ids: Vec<BookId>,
    status: StoredStatus,
    #[serde(default)]
    added_on: Option<DateTime<Utc>>,
}

impl StoredBook {
    fn into_book(self) -> Option<Book> {
        let status = self.status.into_status()?;
        let entry = CatalogEntry {
            book_id: self.book_id,
            title: self.title,
            author: self.author,
            image_url: self.image_url,
            num_pages: self.num_pages,
            avg_rating: self.avg_rating,
            description: self.description,
            related_ids: self.related_ids,
        };
        // Records from builds that never stamped the filing time sort as oldest.
        Some(Book::file(entry, status, self.added_on.unwrap_or_default()))
    }
}

impl Serialize for Collection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(StoredBookRef::from))
    }
}

impl<'de> Deserialize<'de> for Collection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let records = Vec::<StoredBook>::deserialize(deserializer)?;
        let total = records.len();
        let books: Vec<Book> = records.into_iter().filter_map(StoredBook::into_book).collect();

        if books.len() < total {
            tracing::warn!(
                dropped = total - books.len(),
                "dropped records stored with the Remove status"
            );
        }

        Ok(Collection::from(books))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_layout_is_flat_camel_case() {
        let added = "2024-03-01T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let mut entry = CatalogEntry::new("11", "Emma", Author::named("Jane Austen"));
        entry.num_pages = 474;
        let collection = Collection::from(vec![Book::file(entry, Status::Reading, added)]);

        let value = serde_json::to_value(&collection).unwrap();
        assert_eq!(
            value,
            json!([{
                "bookId": "11",
                "title": "Emma",
                "author": { "name": "Jane Austen", "id": null, "about": null },
                "imageUrl": "",
                "numPages": 474,
                "avgRating": 0.0,
                "description": "",
                "relatedIds": [],
                "status": "Reading",
                "addedOn": "2024-03-01T12:00:00Z"
            }])
        );
    }

    #[test]
    fn legacy_remove_records_are_dropped() {
        let value = json!([
            { "bookId": "1", "title": "Kept", "author": { "name": "A" }, "status": "Completed" },
            { "bookId": "2", "title": "Gone", "author": { "name": "B" }, "status": "Remove" }
        ]);

        let collection: Collection = serde_json::from_value(value).unwrap();
        assert_eq!(collection.len(), 1);
        assert_eq!(collection[0].id().as_str(), "1");
        assert_eq!(collection[0].status(), Status::Completed);
        assert_eq!(collection[0].added_on(), DateTime::<Utc>::default());
    }

    #[test]
    fn unknown_status_is_an_error() {
        let value = json!([
            { "bookId": "1", "title": "T", "author": { "name": "A" }, "status": "Paused" }
        ]);
        assert!(serde_json::from_value::<Collection>(value).is_err());
    }
}
