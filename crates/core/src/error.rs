//! Mill-wide domain failures shared by every aggregate.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Deterministic rejection raised by domain code.
///
/// Stock-specific failures (insufficient stock, bad sack sizes) live in the stock
/// crate and wrap this type; storage and transport failures never appear here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed command input, e.g. a `RecordMovements` with no movements.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A command addressed the wrong mill or ledger.
    #[error("invariant broken: {0}")]
    InvariantViolation(String),

    #[error("malformed id: {0}")]
    InvalidId(String),

    /// The aggregate has no history yet (e.g. a ledger that was never opened).
    #[error("not found")]
    NotFound,

    /// State already exists or a version check failed.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
