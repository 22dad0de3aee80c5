//! Error types for lakeio
//!
//! This module defines the common error type used throughout the tablet
//! metadata layer. The error is `Clone` so a failed cache load can be handed
//! to every caller that waited on it.

use crate::types::SchemaId;
use thiserror::Error;

/// Common result type for lakeio operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for lakeio
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    // Lookup errors
    #[error("not found: {0}")]
    NotFound(String),

    // Request validation errors
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // Schema errors
    #[error("schema {schema_id} cannot be resolved: {context}")]
    SchemaResolution { schema_id: SchemaId, context: String },

    // Store errors, passed through from the metadata store client
    #[error("store I/O error: {0}")]
    StoreIo(String),

    // Codec errors
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    // Internal errors
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a not found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a schema resolution error
    pub fn schema_resolution(schema_id: SchemaId, context: impl Into<String>) -> Self {
        Self::SchemaResolution {
            schema_id,
            context: context.into(),
        }
    }

    /// Create a store I/O error
    pub fn store_io(msg: impl Into<String>) -> Self {
        Self::StoreIo(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this is a not found error
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is an invalid argument error
    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// Check if this error may succeed on a later attempt.
    ///
    /// Only store errors qualify. The tablet layer itself never retries;
    /// this is advisory for callers that own a retry policy.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreIo(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(e.to_string())
        } else {
            Self::StoreIo(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_not_found() {
        assert!(Error::not_found("tablet 1").is_not_found());
        assert!(!Error::invalid_argument("x").is_not_found());
    }

    #[test]
    fn test_error_retryable() {
        assert!(Error::store_io("connection reset").is_retryable());
        assert!(!Error::not_found("x").is_retryable());
        assert!(!Error::schema_resolution(10, "missing").is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = Error::invalid_argument("Duplicate column id 0");
        assert_eq!(err.to_string(), "invalid argument: Duplicate column id 0");

        let err = Error::schema_resolution(12, "not found in bundle metadata");
        assert_eq!(
            err.to_string(),
            "schema 12 cannot be resolved: not found in bundle metadata"
        );
    }

    #[test]
    fn test_io_error_mapping() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.is_not_found());

        let err: Error = std::io::Error::other("disk on fire").into();
        assert!(matches!(err, Error::StoreIo(_)));
    }
}
