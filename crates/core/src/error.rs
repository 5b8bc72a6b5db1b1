//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Coarse error classification surfaced to callers.
///
/// Callers decide retry behaviour from the kind alone: validation and
/// not-found failures are final, conflicts may succeed after a fresh read,
/// internal failures should be retried later.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Internal,
}

/// Record kinds that can be missing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
    Item,
    Supplier,
    Grn,
    Return,
    Movement,
}

impl core::fmt::Display for Resource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Resource::Item => "item",
            Resource::Supplier => "supplier",
            Resource::Grn => "grn",
            Resource::Return => "return",
            Resource::Movement => "stock movement",
        };
        f.write_str(name)
    }
}

/// Domain-level error.
///
/// Deterministic business failures only. Persistence failures are modelled
/// by the infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A quantity was zero, negative, or larger than the referenced amount.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    /// The requested movement type is not allowed for this operation.
    #[error("invalid movement type: {0}")]
    InvalidMovementType(String),

    #[error("{resource} not found: {id}")]
    NotFound { resource: Resource, id: String },

    /// A unique code or name is already taken.
    #[error("duplicate code: {0}")]
    DuplicateCode(String),

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    /// A live return already exists for the stock movement.
    #[error("duplicate return for movement {0}")]
    DuplicateReturn(String),

    /// The record has left the state in which the action is allowed.
    #[error("already processed: {0}")]
    AlreadyProcessed(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Stale read / lost optimistic race.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_quantity(msg: impl Into<String>) -> Self {
        Self::InvalidQuantity(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(resource: Resource, id: impl core::fmt::Display) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn duplicate_code(code: impl Into<String>) -> Self {
        Self::DuplicateCode(code.into())
    }

    pub fn already_processed(msg: impl Into<String>) -> Self {
        Self::AlreadyProcessed(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Validation(_)
            | DomainError::InvalidQuantity(_)
            | DomainError::InvalidMovementType(_) => ErrorKind::Validation,
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::DuplicateCode(_)
            | DomainError::InsufficientStock { .. }
            | DomainError::DuplicateReturn(_)
            | DomainError::AlreadyProcessed(_)
            | DomainError::Conflict(_) => ErrorKind::Conflict,
            DomainError::InvariantViolation(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_error_families() {
        assert_eq!(
            DomainError::invalid_quantity("zero").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            DomainError::not_found(Resource::Supplier, "s-1").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            DomainError::InsufficientStock {
                requested: 3,
                available: 1
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(DomainError::invariant("x").kind(), ErrorKind::Internal);
    }

    #[test]
    fn not_found_message_names_the_resource() {
        let err = DomainError::not_found(Resource::Movement, "m-9");
        assert_eq!(err.to_string(), "stock movement not found: m-9");
    }
}
