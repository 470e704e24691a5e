//! Versioned document kernel: change-sets, timestamped entries, history replay.
//!
//! # Invariants
//! - A key is never both changed and deleted within one `Diff`.
//! - Entries are append-only and ordered by timestamp.
//! - The materialized document equals the fold of the entries up to the
//!   built position, starting from an empty document.

pub mod diff;
pub mod entry;
pub mod error;
pub mod repo;
pub mod store;
pub mod target;

pub use diff::{compute_diff, Diff};
pub use entry::Entry;
pub use error::RepoError;
pub use repo::{verify, HistoryEntry, RepoConfig, RepoSummary, Repository};
pub use store::{EntryStore, MemoryStore};
pub use target::{index_from_timestamp, Target};
