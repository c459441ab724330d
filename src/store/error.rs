//! Document store error types
//!
//! Defines all errors that can occur in the store layer.

use thiserror::Error;

/// Errors that can occur in the document store
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Data corruption detected (checksum mismatch, oversized entry)
    #[error("Corrupt data: {0}")]
    Corruption(String),

    /// Update targeted a document that does not exist
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Collection name or document id is malformed
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Write payload cannot be stored as given
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Journal format or recovery error
    #[error("Journal error: {0}")]
    Journal(String),
}

impl From<bincode::Error> for StoreError {
    fn from(err: bincode::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::NotFound("chats/abc".to_string());
        assert_eq!(err.to_string(), "Document not found: chats/abc");

        let err = StoreError::InvalidPath("a/b".to_string());
        assert_eq!(err.to_string(), "Invalid path: a/b");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let store_err: StoreError = io_err.into();
        assert!(matches!(store_err, StoreError::Io(_)));
    }
}
