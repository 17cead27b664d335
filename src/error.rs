use thiserror::Error;

use crate::types::DocId;

/// Main error type for cuttle operations
#[derive(Error, Debug)]
pub enum CuttleError {
    #[error("Document not found: {0}")]
    DocNotFound(DocId),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Operation not supported by this collection: {0}")]
    Unsupported(&'static str),

    #[error("Collection corrupt: {0}")]
    Corrupt(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type alias for cuttle operations
pub type Result<T> = std::result::Result<T, CuttleError>;

impl CuttleError {
    /// Routine absence: the caller may treat the candidate as "no match".
    pub fn is_not_found(&self) -> bool {
        matches!(self, CuttleError::DocNotFound(_))
    }

    /// Whether this error signals a caller-side contract violation rather
    /// than a query-time condition
    pub fn is_program_error(&self) -> bool {
        matches!(
            self,
            CuttleError::InvalidOperation(_) | CuttleError::Unsupported(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CuttleError::DocNotFound(42);
        assert_eq!(err.to_string(), "Document not found: 42");

        let err = CuttleError::Unsupported("add_document");
        assert_eq!(
            err.to_string(),
            "Operation not supported by this collection: add_document"
        );
    }

    #[test]
    fn test_error_classes() {
        assert!(CuttleError::DocNotFound(1).is_not_found());
        assert!(!CuttleError::DocNotFound(1).is_program_error());

        assert!(CuttleError::InvalidOperation("nested".to_string()).is_program_error());
        assert!(CuttleError::Unsupported("flush").is_program_error());

        assert!(!CuttleError::InvalidArgument("term".to_string()).is_program_error());
        assert!(!CuttleError::Backend("timeout".to_string()).is_not_found());
    }
}
