use thiserror::Error;

use autoshop_core::{DomainError, ErrorKind};

use crate::store::StoreError;

pub type EngineResult<T> = Result<T, EngineError>;

/// Error surfaced by every `StockEngine` operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Deterministic business failure; retrying the same request fails again.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Persistence failure, including an optimistic conflict that outlived
    /// the retry budget.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Domain(e) | EngineError::Store(StoreError::Rejected(e)) => e.kind(),
            EngineError::Store(StoreError::Conflict(_)) => ErrorKind::Conflict,
            EngineError::Store(_) => ErrorKind::Internal,
        }
    }

    /// The caller should try the same request again later.
    pub fn retry_later(&self) -> bool {
        self.kind() == ErrorKind::Internal && matches!(self, EngineError::Store(_))
    }

    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            EngineError::Domain(e) | EngineError::Store(StoreError::Rejected(e)) => Some(e),
            EngineError::Store(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_unavailability_asks_for_retry() {
        let err = EngineError::from(StoreError::Unavailable("lock poisoned".into()));
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.retry_later());
    }

    #[test]
    fn exhausted_conflicts_are_conflicts() {
        let err = EngineError::from(StoreError::Conflict("item changed".into()));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(!err.retry_later());
    }

    #[test]
    fn domain_errors_keep_their_kind() {
        let err = EngineError::from(DomainError::duplicate_code("GRN-000001"));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(!err.retry_later());
        assert!(err.as_domain().is_some());
    }

    #[test]
    fn rejected_commits_surface_the_domain_error() {
        let err = EngineError::from(StoreError::Rejected(DomainError::invalid_quantity(
            "Cash balance overflows",
        )));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!err.retry_later());
        assert!(matches!(err.as_domain(), Some(DomainError::InvalidQuantity(_))));
    }
}
