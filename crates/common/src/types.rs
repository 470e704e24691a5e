use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Document keys. JSON object keys are always strings.
pub type Key = String;

/// Any JSON-serializable scalar or container.
pub type Value = serde_json::Value;

/// A materialized document.
///
/// BTreeMap so iteration, display and serialization are deterministic.
pub type Document = BTreeMap<Key, Value>;

/// Whole seconds since the Unix epoch.
pub type Timestamp = i64;

/// One persisted entry: `[timestamp, changes, deletions]`.
///
/// Serializes as a 3-element JSON array, the on-disk layout of a history.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawEntry(pub Timestamp, pub Document, pub Vec<Key>);

impl RawEntry {
    pub fn timestamp(&self) -> Timestamp {
        self.0
    }

    /// Check a decoded JSON value and convert it into raw entries.
    ///
    /// Rejects anything that is not an array of `[integer, object, [string...]]`
    /// triples, and histories whose timestamps decrease.
    pub fn parse_list(value: &Value) -> Result<Vec<RawEntry>, ValidationError> {
        let items = value.as_array().ok_or(ValidationError::NotAList)?;
        let mut entries = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let triple = match item.as_array() {
                Some(triple) if triple.len() == 3 => triple,
                _ => return Err(ValidationError::BadShape { index }),
            };
            let timestamp = triple[0]
                .as_i64()
                .ok_or(ValidationError::BadTimestamp { index })?;
            let changes = triple[1]
                .as_object()
                .ok_or(ValidationError::BadChanges { index })?
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            let deletions = triple[2]
                .as_array()
                .ok_or(ValidationError::BadDeletions { index })?
                .iter()
                .map(|key| key.as_str().map(str::to_owned))
                .collect::<Option<Vec<_>>>()
                .ok_or(ValidationError::BadDeletions { index })?;
            entries.push(RawEntry(timestamp, changes, deletions));
        }
        check_order(&entries)?;
        Ok(entries)
    }
}

/// Fail if any entry is older than the one stored before it.
pub fn check_order(entries: &[RawEntry]) -> Result<(), ValidationError> {
    for (index, pair) in entries.windows(2).enumerate() {
        if pair[1].0 < pair[0].0 {
            return Err(ValidationError::OutOfOrder {
                index: index + 1,
                previous: pair[0].0,
                timestamp: pair[1].0,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_valid_history() {
        let value = json!([[10, {"a": 1}, []], [20, {}, ["a"]]]);
        let entries = RawEntry::parse_list(&value).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].timestamp(), 10);
        assert_eq!(entries[0].1.get("a"), Some(&json!(1)));
        assert_eq!(entries[1].2, vec!["a".to_string()]);
    }

    #[test]
    fn parse_empty_history() {
        assert!(RawEntry::parse_list(&json!([])).unwrap().is_empty());
    }

    #[test]
    fn parse_rejects_non_list() {
        assert_eq!(
            RawEntry::parse_list(&json!({"a": 1})),
            Err(ValidationError::NotAList)
        );
    }

    #[test]
    fn parse_rejects_bad_shapes_and_types() {
        assert_eq!(
            RawEntry::parse_list(&json!([[10, {}]])),
            Err(ValidationError::BadShape { index: 0 })
        );
        assert_eq!(
            RawEntry::parse_list(&json!([[10, {}, []], "x"])),
            Err(ValidationError::BadShape { index: 1 })
        );
        assert_eq!(
            RawEntry::parse_list(&json!([[1.5, {}, []]])),
            Err(ValidationError::BadTimestamp { index: 0 })
        );
        assert_eq!(
            RawEntry::parse_list(&json!([[10, [], []]])),
            Err(ValidationError::BadChanges { index: 0 })
        );
        assert_eq!(
            RawEntry::parse_list(&json!([[10, {}, [1]]])),
            Err(ValidationError::BadDeletions { index: 0 })
        );
    }

    #[test]
    fn parse_rejects_decreasing_timestamps() {
        let value = json!([[20, {}, []], [10, {}, []]]);
        assert_eq!(
            RawEntry::parse_list(&value),
            Err(ValidationError::OutOfOrder {
                index: 1,
                previous: 20,
                timestamp: 10
            })
        );
    }

    #[test]
    fn equal_timestamps_are_ordered() {
        let value = json!([[10, {}, []], [10, {"a": 1}, []]]);
        assert_eq!(RawEntry::parse_list(&value).unwrap().len(), 2);
    }

    #[test]
    fn raw_entry_serializes_as_triple() {
        let entry = RawEntry(5, Document::from([("k".into(), json!("v"))]), vec!["d".into()]);
        assert_eq!(serde_json::to_value(&entry).unwrap(), json!([5, {"k": "v"}, ["d"]]));
        let back: RawEntry = serde_json::from_value(json!([5, {"k": "v"}, ["d"]])).unwrap();
        assert_eq!(back, entry);
    }
}
