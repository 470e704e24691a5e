use jsonvc_common::{Document, Key, Value};
use std::collections::BTreeSet;

/// A change-set for a document: keys set to new values plus keys removed.
///
/// Every mutator keeps `changes` and `deletions` disjoint, so a key is either
/// set or deleted, never both. Applying `a` then `b` is the same as applying
/// `a.merge(b)` once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diff {
    changes: Document,
    deletions: BTreeSet<Key>,
}

impl Diff {
    /// Create an empty diff.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a diff from explicit sets. A key present in both is kept as a
    /// deletion, the same precedence `Entry::apply` uses.
    pub fn from_parts(changes: Document, deletions: impl IntoIterator<Item = Key>) -> Self {
        let deletions: BTreeSet<Key> = deletions.into_iter().collect();
        let mut changes = changes;
        changes.retain(|key, _| !deletions.contains(key));
        Self { changes, deletions }
    }

    pub fn changes(&self) -> &Document {
        &self.changes
    }

    pub fn deletions(&self) -> &BTreeSet<Key> {
        &self.deletions
    }

    /// Stage `key = value`, un-deleting the key if needed.
    pub fn set(&mut self, key: impl Into<Key>, value: Value) {
        let key = key.into();
        self.deletions.remove(&key);
        self.changes.insert(key, value);
    }

    /// Stage a deletion of `key`, dropping any staged change for it.
    ///
    /// A key that only ever existed as a staged change still gets recorded as
    /// deleted.
    pub fn delete(&mut self, key: impl Into<Key>) {
        let key = key.into();
        self.changes.remove(&key);
        self.deletions.insert(key);
    }

    /// Same effect as [`Diff::delete`].
    pub fn pop(&mut self, key: impl Into<Key>) {
        self.delete(key);
    }

    /// Stage `key = default` unless a change for `key` is already staged.
    pub fn set_default(&mut self, key: impl Into<Key>, default: Value) {
        let key = key.into();
        if !self.changes.contains_key(&key) {
            self.set(key, default);
        }
    }

    /// Drop all staged changes and mark every key in `keys` deleted.
    pub fn clear(&mut self, keys: impl IntoIterator<Item = Key>) {
        self.changes.clear();
        self.deletions.extend(keys);
    }

    /// Fold `other` into `self` as if `other` were applied after `self`.
    ///
    /// The step order matters: a later change un-deletes, then a later
    /// deletion removes an earlier change.
    pub fn merge(&mut self, other: &Diff) {
        for key in other.changes.keys() {
            self.deletions.remove(key);
        }
        self.deletions.extend(other.deletions.iter().cloned());
        self.changes
            .extend(other.changes.iter().map(|(k, v)| (k.clone(), v.clone())));
        let deletions = &self.deletions;
        self.changes.retain(|key, _| !deletions.contains(key));
    }

    /// Whether nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.deletions.is_empty()
    }

    /// Number of staged changes plus deletions.
    pub fn len(&self) -> usize {
        self.changes.len() + self.deletions.len()
    }

    /// Clear both collections in place.
    pub fn reset(&mut self) {
        self.changes.clear();
        self.deletions.clear();
    }
}

impl std::fmt::Display for Diff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Diff[{} changes, {} deletions]",
            self.changes.len(),
            self.deletions.len()
        )
    }
}

/// Compute the change-set that turns `old` into `new`.
///
/// Returns `None` when the documents are equal. Values compare structurally.
pub fn compute_diff(old: &Document, new: &Document) -> Option<Diff> {
    let changes: Document = new
        .iter()
        .filter(|(key, value)| old.get(*key) != Some(*value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    let deletions: BTreeSet<Key> = old
        .keys()
        .filter(|key| !new.contains_key(*key))
        .cloned()
        .collect();

    if changes.is_empty() && deletions.is_empty() {
        None
    } else {
        Some(Diff { changes, deletions })
    }
}
