use crate::entry::Entry;
use crate::error::RepoError;
use jsonvc_common::Timestamp;

/// A position in history: an entry index or a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Index(i64),
    Timestamp(Timestamp),
}

impl Target {
    /// Build a target from optional parts. Exactly one must be given.
    pub fn from_parts(
        index: Option<i64>,
        timestamp: Option<Timestamp>,
    ) -> Result<Self, RepoError> {
        match (index, timestamp) {
            (Some(index), None) => Ok(Self::Index(index)),
            (None, Some(timestamp)) => Ok(Self::Timestamp(timestamp)),
            _ => Err(RepoError::AmbiguousTarget),
        }
    }

    /// Resolve to an entry index. May be negative or past the end; callers
    /// range-check for their own purpose.
    pub fn resolve(self, entries: &[Entry]) -> i64 {
        match self {
            Self::Index(index) => index,
            Self::Timestamp(timestamp) => index_from_timestamp(entries, timestamp),
        }
    }
}

/// Index of the last entry stamped at or before `timestamp`, or -1 if none.
///
/// Entries are sorted by timestamp, so a partition point gives the same answer
/// as scanning until the first later entry.
pub fn index_from_timestamp(entries: &[Entry], timestamp: Timestamp) -> i64 {
    entries.partition_point(|entry| entry.timestamp() <= timestamp) as i64 - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::Diff;

    fn stamped(timestamps: &[Timestamp]) -> Vec<Entry> {
        timestamps
            .iter()
            .map(|&ts| Entry::new(ts, Diff::new()))
            .collect()
    }

    #[test]
    fn resolves_last_entry_not_after_target() {
        let entries = stamped(&[10, 20, 30]);
        assert_eq!(index_from_timestamp(&entries, 25), 1);
        assert_eq!(index_from_timestamp(&entries, 5), -1);
        assert_eq!(index_from_timestamp(&entries, 30), 2);
        assert_eq!(index_from_timestamp(&entries, 10), 0);
        assert_eq!(index_from_timestamp(&entries, 99), 2);
    }

    #[test]
    fn empty_history_resolves_negative() {
        assert_eq!(index_from_timestamp(&[], 100), -1);
    }

    #[test]
    fn equal_timestamps_are_included() {
        let entries = stamped(&[10, 20, 20, 30]);
        assert_eq!(index_from_timestamp(&entries, 20), 2);
    }

    #[test]
    fn from_parts_requires_exactly_one() {
        assert_eq!(Target::from_parts(Some(1), None).unwrap(), Target::Index(1));
        assert_eq!(
            Target::from_parts(None, Some(20)).unwrap(),
            Target::Timestamp(20)
        );
        assert!(matches!(
            Target::from_parts(None, None),
            Err(RepoError::AmbiguousTarget)
        ));
        assert!(matches!(
            Target::from_parts(Some(1), Some(20)),
            Err(RepoError::AmbiguousTarget)
        ));
    }

    #[test]
    fn resolve_passes_index_through() {
        let entries = stamped(&[10, 20]);
        assert_eq!(Target::Index(-3).resolve(&entries), -3);
        assert_eq!(Target::Timestamp(15).resolve(&entries), 0);
    }
}
