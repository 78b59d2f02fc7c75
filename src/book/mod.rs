//! Books, their catalog metadata, and the ordered collection that holds them.
//!
//! A [`CatalogEntry`] is what the catalog service hands us: metadata only.
//! Filing an entry under a [`Status`] turns it into a [`Book`], stamped with
//! the moment it entered the collection.

mod collection;
mod status;
mod stored;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use collection::Collection;
pub use status::{Status, UnknownStatus};

/// Stable identifier of a book, the equality key for every lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    pub fn new(id: impl Into<String>) -> Self {
        BookId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BookId {
    fn from(id: &str) -> Self {
        BookId(id.to_string())
    }
}

impl From<String> for BookId {
    fn from(id: String) -> Self {
        BookId(id)
    }
}

impl From<u64> for BookId {
    fn from(id: u64) -> Self {
        BookId(id.to_string())
    }
}

impl AsRef<str> for BookId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub about: Option<String>,
}

impl Author {
    pub fn named(name: impl Into<String>) -> Self {
        Author {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Catalog metadata for a book. Opaque to the store apart from `book_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub book_id: BookId,
    #[serde(alias = "bookTitleBare")]
    pub title: String,
    pub author: Author,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub num_pages: u32,
    #[serde(default)]
    pub avg_rating: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub related_ids: Vec<BookId>,
}

impl CatalogEntry {
    /// An entry with just an id, title and author; the remaining metadata
    /// starts out empty.
    pub fn new(book_id: impl Into<BookId>, title: impl Into<String>, author: Author) -> Self {
        CatalogEntry {
            book_id: book_id.into(),
            title: title.into(),
            author,
            image_url: String::new(),
            num_pages: 0,
            avg_rating: 0.0,
            description: String::new(),
            related_ids: Vec::new(),
        }
    }
}

/// A catalog entry that has been filed into the collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    entry: CatalogEntry,
    status: Status,
    added_on: DateTime<Utc>,
}

impl Book {
    /// File `entry` under `status`, recording `added_on` as the moment it
    /// entered the collection.
    pub fn file(entry: CatalogEntry, status: Status, added_on: DateTime<Utc>) -> Self {
        Book {
            entry,
            status,
            added_on,
        }
    }

    pub fn id(&self) -> &BookId {
        &self.entry.book_id
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn added_on(&self) -> DateTime<Utc> {
        self.added_on
    }

    pub fn title(&self) -> &str {
        &self.entry.title
    }

    pub fn entry(&self) -> &CatalogEntry {
        &self.entry
    }

    pub fn into_entry(self) -> CatalogEntry {
        self.entry
    }

    /// A copy of this book under a different status. `added_on` is kept.
    pub fn with_status(&self, status: Status) -> Book {
        Book {
            entry: self.entry.clone(),
            status,
            added_on: self.added_on,
        }
    }
}
