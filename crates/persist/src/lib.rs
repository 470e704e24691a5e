//! Persistence: the on-disk form of a jsonvc history.
//!
//! # Invariants
//! - A history file holds the whole entry list and is replaced as a unit.
//! - Loading detects whether the file is zstd-compressed or plain JSON.

pub mod codec;
pub mod file;

pub use codec::{decode, detect_encoding, encode, Encoding};
pub use file::FileStore;
