//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures. Storage and
/// transport failures, optimistic concurrency included, belong to the
/// infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A command violated an aggregate invariant (or was malformed) before any
    /// event was created. Never persisted.
    #[error("validation failed: {0}")]
    Validation(String),

    /// History could not be replayed: unknown event kind, undecodable payload,
    /// or an event that contradicts the aggregate lifecycle.
    #[error("corrupted history: {0}")]
    Corruption(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn corruption(msg: impl Into<String>) -> Self {
        Self::Corruption(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::Corruption(_))
    }
}
