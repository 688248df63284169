//! Error types for pelago
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

/// Opaque payload for failures raised by user-supplied plug-ins.
///
/// The core never inspects these beyond displaying them.
pub type UserError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for archipelago, island and population operations
#[derive(Debug, Error)]
pub enum PelagoError {
    /// A vector length disagrees with the problem dimensions
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The requested operation is not defined for the current state
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// An index is past the end of a container
    #[error("index {index} out of range for size {size}")]
    OutOfRange { index: usize, size: usize },

    /// An island is not a member of the queried archipelago
    #[error("not found: {0}")]
    NotFound(String),

    /// A container would grow past an implementation-defined maximum
    #[error("size would exceed the maximum of {max}")]
    Overflow { max: usize },

    /// An argument violates an API contract (sizes, weights, bounds)
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// A failure surfaced from user-supplied problem/algorithm/island code
    #[error("user code failure: {0}")]
    User(#[source] UserError),
}

impl PelagoError {
    /// Wrap an opaque failure coming from user-supplied code
    pub fn user(err: impl Into<UserError>) -> Self {
        Self::User(err.into())
    }

    /// Shorthand for an [`PelagoError::InvalidOperation`]
    pub fn invalid_op(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    /// Shorthand for a [`PelagoError::ContractViolation`]
    pub fn contract(msg: impl Into<String>) -> Self {
        Self::ContractViolation(msg.into())
    }

    /// Returns true if this error originated in user-supplied code
    pub fn is_user(&self) -> bool {
        matches!(self, Self::User(_))
    }
}

/// Error type for state persistence
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// IO error while reading or writing a state file
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// State file version is newer than this library understands
    #[error("version mismatch: expected at most {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    /// State file is structurally damaged
    #[error("corrupted state file: {0}")]
    Corrupted(String),
}

/// Result type alias for archipelago operations
pub type PelagoResult<T> = Result<T, PelagoError>;
