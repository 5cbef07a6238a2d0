use thiserror::Error;

use crate::record::CheckInId;

#[derive(Debug, Error)]
pub enum GlowError {
    #[error("check-in `{id}` has an unparseable date `{value}`")]
    MalformedTimestamp {
        id: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("check-in `{id}` has neither a front nor a legacy image")]
    MissingImage { id: String },

    #[error("check-in `{0}` already exists")]
    DuplicateId(CheckInId),

    #[error("invalid calendar month {year}-{month:02}")]
    InvalidMonth { year: i32, month: u32 },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failures of the external record blob store. None of these are fatal to a
/// session: the in-memory collection stays authoritative.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage quota exceeded ({needed} bytes needed, limit is {limit})")]
    Full { needed: usize, limit: usize },

    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored check-ins could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}
