use jsonvc_common::{RawEntry, StorageError};

/// Backing store for a repository's history.
///
/// `save` replaces the whole history; there is no append path.
pub trait EntryStore {
    /// Read the persisted history, oldest first.
    fn load(&self) -> Result<Vec<RawEntry>, StorageError>;

    /// Overwrite the persisted history.
    fn save(&mut self, entries: &[RawEntry]) -> Result<(), StorageError>;
}

/// In-memory store, for tests and for documents that never touch disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Vec<RawEntry>,
    saves: usize,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with a history.
    pub fn with_entries(entries: Vec<RawEntry>) -> Self {
        Self { entries, saves: 0 }
    }

    pub fn entries(&self) -> &[RawEntry] {
        &self.entries
    }

    /// How many times the history has been written.
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl EntryStore for MemoryStore {
    fn load(&self) -> Result<Vec<RawEntry>, StorageError> {
        Ok(self.entries.clone())
    }

    fn save(&mut self, entries: &[RawEntry]) -> Result<(), StorageError> {
        self.entries = entries.to_vec();
        self.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonvc_common::Document;

    #[test]
    fn memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        assert!(store.load().unwrap().is_empty());

        let history = vec![RawEntry(10, Document::new(), vec!["a".into()])];
        store.save(&history).unwrap();
        assert_eq!(store.load().unwrap(), history);
        assert_eq!(store.save_count(), 1);
    }
}
