use serde::{Deserialize, Serialize};

use crate::book::Collection;
use crate::error::PersistenceError;

/// Encoding of the stored collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// JSON array of camelCase book records.
    #[default]
    Json,
    /// Compact binary via `bitcode`.
    Bitcode,
}

impl Codec {
    pub fn name(self) -> &'static str {
        match self {
            Codec::Json => "json",
            Codec::Bitcode => "bitcode",
        }
    }

    pub fn encode(self, collection: &Collection) -> Result<Vec<u8>, PersistenceError> {
        let encoded = match self {
            Codec::Json => serde_json::to_vec(collection).map_err(|e| e.to_string()),
            Codec::Bitcode => bitcode::serialize(collection).map_err(|e| e.to_string()),
        };
        encoded.map_err(|reason| PersistenceError::Encode {
            codec: self.name(),
            reason,
        })
    }

    /// Decode a stored value. Uniqueness is not checked here.
    pub fn decode(self, bytes: &[u8]) -> Result<Collection, PersistenceError> {
        match self {
            Codec::Json => serde_json::from_slice(bytes).map_err(PersistenceError::malformed),
            Codec::Bitcode => bitcode::deserialize(bytes).map_err(PersistenceError::malformed),
        }
    }
}
