use crate::types::Timestamp;

/// Malformed persisted history. A repository refuses to load when it sees one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("history is not a JSON array")]
    NotAList,
    #[error("entry {index} is not a [timestamp, changes, deletions] triple")]
    BadShape { index: usize },
    #[error("entry {index}: timestamp is not an integer")]
    BadTimestamp { index: usize },
    #[error("entry {index}: changes are not a JSON object")]
    BadChanges { index: usize },
    #[error("entry {index}: deletions are not an array of keys")]
    BadDeletions { index: usize },
    #[error("entry {index} at {timestamp} precedes the entry before it at {previous}")]
    OutOfOrder {
        index: usize,
        previous: Timestamp,
        timestamp: Timestamp,
    },
}

/// Errors from reading or writing a backing store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read file as text; was a compressed file read without decompression?")]
    NotText,
    #[error("not a valid jsonvc history: {0}")]
    Invalid(#[from] ValidationError),
}
