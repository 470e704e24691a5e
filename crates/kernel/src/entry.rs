use crate::diff::Diff;
use chrono::{DateTime, Utc};
use jsonvc_common::{Document, Key, RawEntry, Timestamp, Value};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// An immutable, timestamped commit of one [`Diff`].
///
/// Entries compare by timestamp alone: two entries stamped in the same second
/// are equal whatever they change.
#[derive(Debug, Clone)]
pub struct Entry {
    timestamp: Timestamp,
    diff: Diff,
}

impl Entry {
    pub fn new(timestamp: Timestamp, diff: Diff) -> Self {
        Self { timestamp, diff }
    }

    /// Stamp `diff` with a precise time, truncated to whole seconds.
    pub fn at(time: DateTime<Utc>, diff: Diff) -> Self {
        Self::new(time.timestamp(), diff)
    }

    /// Commit `diff` at the current wall-clock second.
    ///
    /// The stamp is not clamped against any history; pair it with
    /// [`Entry::not_before`] when appending.
    pub fn from_diff(diff: Diff) -> Self {
        Self::at(Utc::now(), diff)
    }

    pub fn from_raw(raw: RawEntry) -> Self {
        let RawEntry(timestamp, changes, deletions) = raw;
        Self::new(timestamp, Diff::from_parts(changes, deletions))
    }

    /// The persisted `[timestamp, changes, deletions]` form.
    pub fn to_raw(&self) -> RawEntry {
        RawEntry(
            self.timestamp,
            self.diff.changes().clone(),
            self.diff.deletions().iter().cloned().collect(),
        )
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn diff(&self) -> &Diff {
        &self.diff
    }

    pub fn changes(&self) -> &Document {
        self.diff.changes()
    }

    pub fn deletions(&self) -> &BTreeSet<Key> {
        self.diff.deletions()
    }

    /// Return `base` with this entry's changes upserted, then its deletions
    /// removed. Deleting an absent key is a no-op.
    pub fn apply(&self, base: &Document) -> Document {
        let mut data = base.clone();
        self.apply_in_place(&mut data);
        data
    }

    /// [`Entry::apply`] on an accumulator, used by replay.
    pub fn apply_in_place(&self, data: &mut Document) {
        data.extend(
            self.changes()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        for key in self.deletions() {
            data.remove(key);
        }
    }

    /// The later of two entries; `self` on a tie.
    pub fn latest<'a>(&'a self, other: &'a Entry) -> &'a Entry {
        if other > self { other } else { self }
    }

    /// Restamp to `previous`'s time if this entry would sort before it.
    pub fn not_before(mut self, previous: &Entry) -> Self {
        self.timestamp = self.latest(previous).timestamp();
        self
    }

    /// Human-readable UTC time, e.g. `2020-08-30--11:36:32`.
    pub fn timestr(&self) -> String {
        match DateTime::<Utc>::from_timestamp(self.timestamp, 0) {
            Some(time) => time.format("%Y-%m-%d--%H:%M:%S").to_string(),
            None => self.timestamp.to_string(),
        }
    }

    /// Short content digest: sha256 over the canonical JSON triple.
    pub fn digest(&self) -> String {
        let triple = Value::Array(vec![
            Value::from(self.timestamp),
            Value::Object(
                self.changes()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
            self.deletions().iter().cloned().collect(),
        ]);
        let mut hasher = Sha256::new();
        hasher.update(triple.to_string().as_bytes());
        let hex = format!("{:x}", hasher.finalize());
        hex[..12].to_string()
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp.cmp(&other.timestamp)
    }
}

impl std::fmt::Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}; {} changes, {} deletions]",
            self.timestr(),
            self.changes().len(),
            self.deletions().len()
        )
    }
}
