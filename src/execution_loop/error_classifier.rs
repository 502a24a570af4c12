//! Error Classifier
//!
//! Classifies database errors into a taxonomy for recovery.

use crate::execution::ExecutionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Database error classification taxonomy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlErrorClass {
    ConnectionFailure,
    PermissionDenied,
    UndefinedTable,
    UndefinedColumn,
    SyntaxError,
    ConstraintViolation,
    Other(String),
}

impl SqlErrorClass {
    /// Whether rewriting the statement could plausibly fix the failure
    pub fn is_repairable(&self) -> bool {
        !matches!(
            self,
            SqlErrorClass::ConnectionFailure | SqlErrorClass::PermissionDenied
        )
    }
}

impl fmt::Display for SqlErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlErrorClass::ConnectionFailure => write!(f, "ConnectionFailure"),
            SqlErrorClass::PermissionDenied => write!(f, "PermissionDenied"),
            SqlErrorClass::UndefinedTable => write!(f, "UndefinedTable"),
            SqlErrorClass::UndefinedColumn => write!(f, "UndefinedColumn"),
            SqlErrorClass::SyntaxError => write!(f, "SyntaxError"),
            SqlErrorClass::ConstraintViolation => write!(f, "ConstraintViolation"),
            SqlErrorClass::Other(msg) => write!(f, "Other({})", msg),
        }
    }
}

/// Error classifier
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify an error into the taxonomy
    pub fn classify(&self, error: &ExecutionError) -> SqlErrorClass {
        let error_msg = error.error.to_lowercase();
        let error_type = error.error_type.as_deref().unwrap_or_default();

        if error_type == "OperationalError"
            || error_msg.contains("connection refused")
            || error_msg.contains("could not connect")
            || error_msg.contains("timed out")
        {
            return SqlErrorClass::ConnectionFailure;
        }

        if error_msg.contains("permission denied") || error_msg.contains("must be owner") {
            return SqlErrorClass::PermissionDenied;
        }

        if error_msg.contains("relation") && error_msg.contains("does not exist") {
            return SqlErrorClass::UndefinedTable;
        }

        if error_msg.contains("column") && error_msg.contains("does not exist") {
            return SqlErrorClass::UndefinedColumn;
        }

        if error_msg.contains("syntax error") {
            return SqlErrorClass::SyntaxError;
        }

        if error_type == "IntegrityError" || error_msg.contains("violates") {
            return SqlErrorClass::ConstraintViolation;
        }

        SqlErrorClass::Other(error.error.clone())
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_undefined_table() {
        let classifier = ErrorClassifier::new();
        let error = ExecutionError::new("relation \"custmers\" does not exist", "ProgrammingError");
        assert_eq!(classifier.classify(&error), SqlErrorClass::UndefinedTable);
    }

    #[test]
    fn test_classify_undefined_column() {
        let classifier = ErrorClassifier::new();
        let error = ExecutionError::new("column \"nme\" does not exist", "ProgrammingError");
        assert_eq!(classifier.classify(&error), SqlErrorClass::UndefinedColumn);
    }

    #[test]
    fn test_connection_failures_are_not_repairable() {
        let classifier = ErrorClassifier::new();
        let error = ExecutionError::new("pool timed out while waiting for an open connection", "OperationalError");
        let class = classifier.classify(&error);
        assert_eq!(class, SqlErrorClass::ConnectionFailure);
        assert!(!class.is_repairable());

        let error = ExecutionError::new("permission denied for table payment", "ProgrammingError");
        assert!(!classifier.classify(&error).is_repairable());
    }

    #[test]
    fn test_classify_constraint_violation() {
        let classifier = ErrorClassifier::new();
        let error = ExecutionError::new(
            "duplicate key value violates unique constraint \"actor_pkey\"",
            "IntegrityError",
        );
        assert_eq!(classifier.classify(&error), SqlErrorClass::ConstraintViolation);
    }
}
