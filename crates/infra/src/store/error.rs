use thiserror::Error;

use larder_core::DomainError;

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage-layer failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The named resource does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A uniqueness rule rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The write referenced something invalid (unknown tag id, ...).
    #[error(transparent)]
    Domain(DomainError),

    /// Connection, query or lock failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Domain conflicts and missing records keep their storage meaning; every
/// other domain error is carried as-is.
impl From<DomainError> for StoreError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Conflict(msg) => Self::Conflict(msg),
            DomainError::NotFound(what) => Self::NotFound(what),
            other => Self::Domain(other),
        }
    }
}

impl StoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_conflict_and_not_found_become_store_variants() {
        assert_eq!(
            StoreError::from(DomainError::conflict("recipe is already in favorites")),
            StoreError::conflict("recipe is already in favorites")
        );
        assert_eq!(
            StoreError::from(DomainError::not_found("recipe in shopping cart")),
            StoreError::not_found("recipe in shopping cart")
        );
        assert!(matches!(
            StoreError::from(DomainError::invalid_field("tags", "unknown tag id 3")),
            StoreError::Domain(_)
        ));
    }
}
