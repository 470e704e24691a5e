//! File-backed history store.
//!
//! A repository is one file holding the JSON array
//! `[[timestamp, {changes}, [deletions]], ...]`, oldest first, either as plain
//! text or zstd-compressed. Every save rewrites the file through a sibling
//! `.tmp` file and a rename.

use crate::codec::{decode, detect_encoding, encode, Encoding};
use jsonvc_common::{RawEntry, StorageError};
use jsonvc_kernel::EntryStore;
use std::path::{Path, PathBuf};

/// A history stored in a single file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    encoding: Encoding,
}

impl FileStore {
    /// Open the history at `path`, creating an empty one if missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::open_with(path, Encoding::default())
    }

    /// Like [`FileStore::open`], writing with `encoding` from now on.
    pub fn open_with(path: impl AsRef<Path>, encoding: Encoding) -> Result<Self, StorageError> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            encoding,
        };
        store.init()?;
        Ok(store)
    }

    /// Write an empty history if the file does not exist yet. Returns whether
    /// a file was created.
    pub fn init(&self) -> Result<bool, StorageError> {
        if self.path.exists() {
            return Ok(false);
        }
        self.write(&[])?;
        tracing::info!(path = %self.path.display(), "initialized empty repository");
        Ok(true)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encoding used for saves.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Encoding of the file as it is on disk now.
    pub fn detect(&self) -> Result<Encoding, StorageError> {
        Ok(detect_encoding(&std::fs::read(&self.path)?))
    }

    /// Load assuming `encoding` instead of detecting it.
    pub fn load_as(&self, encoding: Encoding) -> Result<Vec<RawEntry>, StorageError> {
        decode(&std::fs::read(&self.path)?, encoding)
    }

    fn write(&self, entries: &[RawEntry]) -> Result<(), StorageError> {
        let bytes = encode(entries, self.encoding)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl EntryStore for FileStore {
    fn load(&self) -> Result<Vec<RawEntry>, StorageError> {
        let bytes = std::fs::read(&self.path)?;
        let encoding = detect_encoding(&bytes);
        tracing::debug!(path = %self.path.display(), ?encoding, "loading history");
        decode(&bytes, encoding)
    }

    fn save(&mut self, entries: &[RawEntry]) -> Result<(), StorageError> {
        self.write(entries)?;
        tracing::debug!(
            path = %self.path.display(),
            entries = entries.len(),
            encoding = ?self.encoding,
            "history written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonvc_common::{Document, ValidationError};
    use jsonvc_kernel::{RepoError, Repository, Target};
    use serde_json::json;

    #[test]
    fn open_creates_empty_history() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("test.jsonvc");
        assert!(!path.exists());

        let store = FileStore::open(&path).unwrap();
        assert!(path.exists());
        assert!(store.load().unwrap().is_empty());
        assert_eq!(store.detect().unwrap(), Encoding::default());
    }

    #[test]
    fn open_existing_does_not_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("repo.jsonvc");
        let mut store = FileStore::open(&path).unwrap();
        store
            .save(&[RawEntry(10, Document::new(), vec!["a".into()])])
            .unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert!(!reopened.init().unwrap());
        assert_eq!(reopened.load().unwrap().len(), 1);
    }

    #[test]
    fn plain_store_is_readable_text() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("plain.jsonvc");
        let mut store = FileStore::open_with(&path, Encoding::Plain).unwrap();
        store
            .save(&[RawEntry(1_598_787_392, Document::new(), vec![])])
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!([[1_598_787_392, {}, []]]));
        assert!(!tmp.path().join("plain.jsonvc.tmp").exists());
    }

    #[test]
    fn load_detects_either_encoding() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("mixed.jsonvc");
        let history = vec![RawEntry(5, Document::new(), vec![])];

        let mut zstd = FileStore::open(&path).unwrap();
        zstd.save(&history).unwrap();
        let mut plain = FileStore::open_with(&path, Encoding::Plain).unwrap();
        assert_eq!(plain.load().unwrap(), history);

        plain.save(&history).unwrap();
        assert_eq!(zstd.detect().unwrap(), Encoding::Plain);
        assert_eq!(zstd.load().unwrap(), history);
    }

    #[test]
    fn forced_plain_read_of_compressed_file_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path().join("c.jsonvc")).unwrap();
        assert!(matches!(
            store.load_as(Encoding::Plain),
            Err(StorageError::NotText)
        ));
    }

    #[test]
    fn invalid_file_refuses_to_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.jsonvc");
        std::fs::write(&path, br#"[[10, {}]]"#).unwrap();
        let store = FileStore::open(&path).unwrap();
        assert!(matches!(
            Repository::open(store),
            Err(RepoError::Validation(ValidationError::BadShape { index: 0 }))
        ));
    }

    #[test]
    fn repository_commit_cycle_on_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("doc.jsonvc");

        {
            let mut repo = Repository::open(FileStore::open(&path).unwrap()).unwrap();
            repo.set("hello", json!("world")).unwrap();
            assert_eq!(repo.entries().len(), 1);
        }

        let repo = Repository::open(FileStore::open(&path).unwrap()).unwrap();
        assert_eq!(repo.get("hello"), Some(&json!("world")));
        assert_eq!(repo.entries().len(), 1);
    }

    #[test]
    fn reset_persists_truncated_history() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("reset.jsonvc");
        let mut store = FileStore::open_with(&path, Encoding::Plain).unwrap();
        store
            .save(&[
                RawEntry(10, Document::from([("a".into(), json!(1))]), vec![]),
                RawEntry(20, Document::from([("b".into(), json!(2))]), vec![]),
                RawEntry(30, Document::from([("a".into(), json!(3))]), vec![]),
            ])
            .unwrap();

        let mut repo = Repository::open(store).unwrap();
        repo.reset(Target::Timestamp(20)).unwrap();

        let reopened = Repository::open(FileStore::open(&path).unwrap()).unwrap();
        assert_eq!(reopened.entries().len(), 1);
        assert_eq!(reopened.get("a"), Some(&json!(1)));
        assert!(!reopened.contains_key("b"));
    }
}
