use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Shelf a filed book lives on. Removal is an action, never a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Reading,
    Completed,
    Wishlist,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Reading, Status::Completed, Status::Wishlist];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Reading => "Reading",
            Status::Completed => "Completed",
            Status::Wishlist => "Wishlist",
        }
    }

    /// The status one tap further along the cycle
    /// Reading -> Completed -> Wishlist. `None` after Wishlist means the
    /// book leaves the collection.
    pub fn next(self) -> Option<Status> {
        match self {
            Status::Reading => Some(Status::Completed),
            Status::Completed => Some(Status::Wishlist),
            Status::Wishlist => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status name that is not one of the three shelves.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown status {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}
