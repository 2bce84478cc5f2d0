//! Shared error model.

use thiserror::Error;

/// Result type for validation-level failures.
pub type DomainResult<T> = Result<T, DomainError>;

/// Validation and invariant failures raised before any store is touched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}

/// Failure of a durable store (directory, lockout records, audit log).
///
/// A store error is fatal to the operation that hit it and is always
/// surfaced to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// An in-process store's lock was poisoned by a panicking writer.
    #[error("{0} store lock poisoned")]
    Poisoned(&'static str),

    /// The backing store could not complete the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}
