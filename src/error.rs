//! Error taxonomy shared by every operation in the crate.
//!
//! The first three variants are the client-visible kinds: callers map
//! `Validation` to a bad-request response, `Conflict` to a conflict
//! response, and `NotFound` to a missing-resource response. The remaining
//! variants are internal failures. Nothing in here is retried; retries, if
//! any, belong to the caller.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input, a cross-owner label reference, or a disallowed
    /// field mutation.
    #[error("{0}")]
    Validation(String),

    /// The operation clashes with current state: ending an already-ended
    /// session, or a duplicate (name, owner) label.
    #[error("{0}")]
    Conflict(String),

    /// The record does not exist, or exists but is not visible to the
    /// acting user, which must look identical from the outside.
    #[error("{0}")]
    NotFound(String),

    /// Underlying SQLite failure.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A persisted value could not be decoded back into its model type.
    #[error("corrupt {field}: {message}")]
    Corrupt {
        field: &'static str,
        message: String,
    },

    /// The database worker thread is gone or unreachable.
    #[error("database unavailable: {0}")]
    Unavailable(String),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}
