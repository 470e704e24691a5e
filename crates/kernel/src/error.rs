use jsonvc_common::{Key, StorageError, ValidationError};

/// Errors from repository operations.
///
/// A failing mutation leaves entries, staged diff and document as they were
/// before the call.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("not a valid jsonvc history: {0}")]
    Validation(#[from] ValidationError),
    #[error("state {index} was out of range [0, {len}]")]
    OutOfRange { index: i64, len: usize },
    #[error("provide exactly one of index or timestamp")]
    AmbiguousTarget,
    #[error("key {0:?} not found")]
    KeyNotFound(Key),
    #[error("document is empty")]
    EmptyDocument,
    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for RepoError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Invalid(invalid) => Self::Validation(invalid),
            other => Self::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_storage_maps_to_validation() {
        let err: RepoError = StorageError::Invalid(ValidationError::NotAList).into();
        assert!(matches!(err, RepoError::Validation(ValidationError::NotAList)));

        let err: RepoError = StorageError::NotText.into();
        assert!(matches!(err, RepoError::Storage(StorageError::NotText)));
    }

    #[test]
    fn out_of_range_message() {
        let err = RepoError::OutOfRange { index: 5, len: 3 };
        assert_eq!(err.to_string(), "state 5 was out of range [0, 3]");
    }
}
