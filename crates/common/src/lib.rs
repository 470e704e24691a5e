//! Shared types for jsonvc: documents, persisted entry triples, error kinds.
//!
//! # Invariants
//! - A persisted history is a JSON array of `[timestamp, changes, deletions]`
//!   triples, oldest first.
//! - Timestamps in a valid history never decrease.

pub mod error;
pub mod types;

pub use error::{StorageError, ValidationError};
pub use types::{check_order, Document, Key, RawEntry, Timestamp, Value};
