use crate::diff::{compute_diff, Diff};
use crate::entry::Entry;
use crate::error::RepoError;
use crate::store::EntryStore;
use crate::target::Target;
use jsonvc_common::{check_order, Document, Key, RawEntry, Timestamp, ValidationError, Value};

/// Per-repository settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepoConfig {
    /// Stage, commit, persist and rebuild after every mutation.
    pub auto_commit: bool,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self { auto_commit: true }
    }
}

/// A versioned JSON document backed by an [`EntryStore`].
///
/// Reads go to the materialized document. Mutations update the document
/// immediately and record the same effect in a staged [`Diff`]; `add` turns
/// the staged diff into an [`Entry`] and `commit` writes the history out.
/// With auto-commit on, every mutation does both.
pub struct Repository<S> {
    store: S,
    config: RepoConfig,
    entries: Vec<Entry>,
    staged: Diff,
    document: Document,
    /// Entries known to be in the store.
    persisted_count: usize,
    /// History was cut by reset/strip since the last save.
    truncated: bool,
}

/// Pre-mutation state, restored when an operation fails partway.
struct Checkpoint {
    entries: Vec<Entry>,
    staged: Diff,
    document: Document,
    persisted_count: usize,
    truncated: bool,
}

impl<S: EntryStore> Repository<S> {
    /// Load a repository from `store` with auto-commit enabled.
    pub fn open(store: S) -> Result<Self, RepoError> {
        Self::with_config(store, RepoConfig::default())
    }

    /// Load a repository from `store`.
    pub fn with_config(store: S, config: RepoConfig) -> Result<Self, RepoError> {
        let entries = load_entries(&store)?;
        let persisted_count = entries.len();
        let mut repo = Self {
            store,
            config,
            entries,
            staged: Diff::new(),
            document: Document::new(),
            persisted_count,
            truncated: false,
        };
        repo.build(None)?;
        tracing::debug!(entries = persisted_count, "repository loaded");
        Ok(repo)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn config(&self) -> RepoConfig {
        self.config
    }

    pub fn set_auto_commit(&mut self, enabled: bool) {
        self.config.auto_commit = enabled;
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// The uncommitted change-set.
    pub fn staged(&self) -> &Diff {
        &self.staged
    }

    /// The materialized document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn persisted_count(&self) -> usize {
        self.persisted_count
    }

    // Mapping reads

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.document.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.document.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.document.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.document.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.document.keys()
    }

    // Replay

    /// Rebuild the document from history up to `target`, or from the whole
    /// history when `target` is `None`.
    ///
    /// A target before the first entry leaves the document unchanged. An
    /// index equal to the entry count folds the whole history.
    pub fn build(&mut self, target: Option<Target>) -> Result<(), RepoError> {
        let len = self.entries.len();
        let state = match target {
            Some(target) => target.resolve(&self.entries),
            None => len as i64 - 1,
        };

        if state < 0 {
            if target.is_none() {
                self.document.clear();
            } else {
                tracing::debug!(state, "build target precedes history; keeping document");
            }
            return Ok(());
        }
        if state as usize > len {
            return Err(RepoError::OutOfRange { index: state, len });
        }

        let end = (state as usize + 1).min(len);
        let mut data = Document::new();
        for entry in &self.entries[..end] {
            entry.apply_in_place(&mut data);
        }
        self.document = data;
        tracing::debug!(entries = end, keys = self.document.len(), "document rebuilt");
        Ok(())
    }

    // Version control verbs

    /// Turn the staged diff into a new entry. Returns false when nothing was
    /// staged.
    pub fn add(&mut self) -> bool {
        if self.staged.is_empty() {
            return false;
        }
        let mut entry = Entry::from_diff(std::mem::take(&mut self.staged));
        if let Some(last) = self.entries.last() {
            entry = entry.not_before(last);
        }
        tracing::info!(timestamp = entry.timestamp(), diff = %entry.diff(), "entry added");
        self.entries.push(entry);
        true
    }

    /// Persist the history if it changed since the last save, then rebuild
    /// the document. Returns whether anything was written.
    ///
    /// The rebuild replays entries only. With auto-commit off, keys staged
    /// but not yet [`add`](Self::add)ed drop out of the document while they
    /// stay in the staged diff, so call `add` first.
    pub fn commit(&mut self) -> Result<bool, RepoError> {
        if self.entries.len() == self.persisted_count && !self.truncated {
            return Ok(false);
        }
        let raw: Vec<RawEntry> = self.entries.iter().map(Entry::to_raw).collect();
        self.store.save(&raw)?;
        self.persisted_count = self.entries.len();
        self.truncated = false;
        tracing::info!(entries = self.persisted_count, "history persisted");
        self.build(None)?;
        Ok(true)
    }

    /// Drop the staged diff and any unsaved history, then rebuild from the
    /// store.
    pub fn revert(&mut self) -> Result<(), RepoError> {
        let entries = load_entries(&self.store)?;
        self.staged.reset();
        self.persisted_count = entries.len();
        self.entries = entries;
        self.truncated = false;
        tracing::info!(entries = self.persisted_count, "reverted to persisted history");
        self.build(None)
    }

    /// Keep only the entries before `target`, undoing later commits.
    pub fn reset(&mut self, target: Target) -> Result<(), RepoError> {
        self.transact(|repo| {
            let boundary = repo.boundary(target)?;
            repo.entries.truncate(boundary);
            repo.truncated = true;
            tracing::info!(boundary, "history reset");
            Ok(())
        })
    }

    /// Forget the entries before `target`.
    ///
    /// Surviving entries are replayed from an empty document, so state built
    /// by the dropped entries disappears unless a surviving entry sets it.
    pub fn strip(&mut self, target: Target) -> Result<(), RepoError> {
        self.transact(|repo| {
            let boundary = repo.boundary(target)?;
            if boundary > 0 {
                repo.entries.drain(..boundary);
                repo.truncated = true;
            }
            tracing::info!(boundary, "history stripped");
            Ok(())
        })
    }

    /// Resolve a truncation boundary, which must address an existing entry.
    fn boundary(&self, target: Target) -> Result<usize, RepoError> {
        let len = self.entries.len();
        let index = target.resolve(&self.entries);
        if index < 0 || index as usize >= len {
            return Err(RepoError::OutOfRange { index, len });
        }
        Ok(index as usize)
    }

    // Mutations

    /// Set `key` to `value`.
    pub fn set(&mut self, key: impl Into<Key>, value: Value) -> Result<(), RepoError> {
        let key = key.into();
        self.transact(|repo| {
            tracing::debug!(%key, "staged set");
            repo.staged.set(key.clone(), value.clone());
            repo.document.insert(key, value);
            Ok(())
        })
    }

    /// Delete `key`.
    pub fn remove(&mut self, key: &str) -> Result<(), RepoError> {
        self.pop(key).map(|_| ())
    }

    /// Delete `key` and return its value.
    pub fn pop(&mut self, key: &str) -> Result<Value, RepoError> {
        self.transact(|repo| {
            let value = repo
                .document
                .remove(key)
                .ok_or_else(|| RepoError::KeyNotFound(key.to_string()))?;
            tracing::debug!(key, "staged deletion");
            repo.staged.pop(key);
            Ok(value)
        })
    }

    /// Remove and return the last key in document order.
    pub fn pop_item(&mut self) -> Result<(Key, Value), RepoError> {
        self.transact(|repo| {
            let (key, value) = repo.document.pop_last().ok_or(RepoError::EmptyDocument)?;
            tracing::debug!(%key, "staged deletion");
            repo.staged.pop(key.clone());
            Ok((key, value))
        })
    }

    /// Return the value of `key`, inserting `default` first if it is absent.
    ///
    /// An existing key stages nothing.
    pub fn set_default(&mut self, key: impl Into<Key>, default: Value) -> Result<Value, RepoError> {
        let key = key.into();
        if let Some(value) = self.document.get(&key) {
            return Ok(value.clone());
        }
        self.transact(|repo| {
            tracing::debug!(%key, "staged default");
            repo.staged.set_default(key.clone(), default.clone());
            repo.document.insert(key, default.clone());
            Ok(default)
        })
    }

    /// Replace the whole document with `new`, staging only what differs.
    /// Returns false when `new` equals the current document.
    pub fn update(&mut self, new: Document) -> Result<bool, RepoError> {
        self.transact(|repo| {
            let Some(delta) = compute_diff(&repo.document, &new) else {
                tracing::debug!("update made no difference");
                return Ok(false);
            };
            tracing::debug!(%delta, "staged update");
            repo.staged.merge(&delta);
            repo.document = new;
            Ok(true)
        })
    }

    /// Upsert every pair, leaving other keys alone.
    pub fn extend(
        &mut self,
        items: impl IntoIterator<Item = (Key, Value)>,
    ) -> Result<(), RepoError> {
        self.transact(|repo| {
            for (key, value) in items {
                repo.staged.set(key.clone(), value.clone());
                repo.document.insert(key, value);
            }
            Ok(())
        })
    }

    /// Delete every key.
    pub fn clear(&mut self) -> Result<(), RepoError> {
        self.transact(|repo| {
            tracing::debug!(keys = repo.document.len(), "staged clear");
            repo.staged.clear(repo.document.keys().cloned());
            repo.document.clear();
            Ok(())
        })
    }

    // Inspection

    /// Timestamp and change counts for every entry, oldest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| HistoryEntry {
                index,
                timestamp: entry.timestamp(),
                timestr: entry.timestr(),
                changes: entry.changes().len(),
                deletions: entry.deletions().len(),
                digest: entry.digest(),
            })
            .collect()
    }

    pub fn summary(&self) -> RepoSummary {
        RepoSummary {
            entries: self.entries.len(),
            staged: self.staged.len(),
        }
    }

    /// Run a mutation, then the auto-commit pipeline. On any error the
    /// repository is restored to its state before the call.
    fn transact<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, RepoError>,
    ) -> Result<T, RepoError> {
        let checkpoint = self.checkpoint();
        let result = op(&mut *self).and_then(|value| {
            if self.config.auto_commit {
                self.add();
                self.commit()?;
            }
            Ok(value)
        });
        if result.is_err() {
            self.restore(checkpoint);
        }
        result
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            entries: self.entries.clone(),
            staged: self.staged.clone(),
            document: self.document.clone(),
            persisted_count: self.persisted_count,
            truncated: self.truncated,
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.entries = checkpoint.entries;
        self.staged = checkpoint.staged;
        self.document = checkpoint.document;
        self.persisted_count = checkpoint.persisted_count;
        self.truncated = checkpoint.truncated;
    }
}

/// Check that a decoded JSON value is a valid history.
pub fn verify(value: &Value) -> Result<(), ValidationError> {
    RawEntry::parse_list(value).map(|_| ())
}

fn load_entries<S: EntryStore>(store: &S) -> Result<Vec<Entry>, RepoError> {
    let raw = store.load()?;
    check_order(&raw)?;
    Ok(raw.into_iter().map(Entry::from_raw).collect())
}

/// One line of [`Repository::history`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub index: usize,
    pub timestamp: Timestamp,
    pub timestr: String,
    pub changes: usize,
    pub deletions: usize,
    pub digest: String,
}

impl std::fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} [{}; {} changes, {} deletions]",
            self.index, self.digest, self.timestr, self.changes, self.deletions
        )
    }
}

/// Size of a repository's history and staged diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepoSummary {
    pub entries: usize,
    pub staged: usize,
}

impl std::fmt::Display for RepoSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "jsonvc-repo[{} entries, currently {} changes]",
            self.entries, self.staged
        )
    }
}
