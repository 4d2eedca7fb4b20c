//! Error types for state persistence.

use std::io;
use thiserror::Error;

/// Errors raised by a [`StateStore`](super::StateStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Key contains characters the backend cannot store.
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    /// Failed to create the storage directory.
    #[error("Failed to create storage directory: {0}")]
    DirectoryCreation(#[source] io::Error),

    /// Failed to read a stored record.
    #[error("Failed to read stored record: {0}")]
    Read(#[source] io::Error),

    /// Failed to write a record.
    #[error("Failed to write record: {0}")]
    Write(#[source] io::Error),

    /// Failed to remove a record.
    #[error("Failed to remove record: {0}")]
    Remove(#[source] io::Error),

    /// The in-memory backend's lock was poisoned.
    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Reasons a persisted engine record cannot be used.
///
/// Every variant is recovered by discarding the record and starting from
/// the default state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    /// The record is not valid JSON or has the wrong shape.
    #[error("Failed to parse state record: {0}")]
    Parse(String),

    /// A required field is absent.
    #[error("State record is missing field `{0}`")]
    MissingField(&'static str),

    /// A field holds a value outside its valid range.
    #[error("State field `{field}` is out of range: {reason}")]
    OutOfRange {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// The record was written by an incompatible format version.
    #[error("Unsupported state record version {0}")]
    UnsupportedVersion(u32),

    /// Failed to serialize the state.
    #[error("Failed to serialize state: {0}")]
    Serialize(String),
}

impl StateError {
    /// Builds an [`StateError::OutOfRange`].
    pub(crate) fn out_of_range(field: &'static str, reason: impl Into<String>) -> Self {
        Self::OutOfRange {
            field,
            reason: reason.into(),
        }
    }
}
