//! Custom error types for the emissions preprocessor.
//!
//! This module provides the error hierarchy using `thiserror` for the
//! schema resolution, value parsing, and CSV I/O performed by the crate.
//!
//! Errors are serializable so a host application can forward them to a
//! frontend as `{ code, message }` pairs.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

use crate::config::ConfigValidationError;

/// The main error type for the preprocessor.
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// A required logical column could not be resolved in the dataset header.
    #[error("Required {field} column '{column}' not found in dataset")]
    ColumnNotFound { field: String, column: String },

    /// A cell held a value that cannot be used (not numeric, negative, non-finite).
    ///
    /// `row` is the 1-based data row, not counting the header.
    #[error("Malformed value '{value}' in column '{column}' at row {row}: {reason}")]
    MalformedValue {
        column: String,
        row: usize,
        value: String,
        reason: String,
    },

    /// A column has a data type the requested conversion does not support.
    #[error("Column '{column}' has unsupported type {dtype}")]
    UnsupportedColumnType { column: String, dtype: String },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ProcessingError>,
    },
}

impl ProcessingError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ProcessingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get a stable error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound { .. } => "COLUMN_NOT_FOUND",
            Self::MalformedValue { .. } => "MALFORMED_VALUE",
            Self::UnsupportedColumnType { .. } => "UNSUPPORTED_COLUMN_TYPE",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error is a schema problem (the input lacks a column it needs).
    pub fn is_schema_error(&self) -> bool {
        match self {
            Self::ColumnNotFound { .. } => true,
            Self::WithContext { source, .. } => source.is_schema_error(),
            _ => false,
        }
    }
}

impl From<ConfigValidationError> for ProcessingError {
    fn from(err: ConfigValidationError) -> Self {
        ProcessingError::InvalidConfig(err.to_string())
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for ProcessingError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ProcessingError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for preprocessing operations.
pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ProcessingError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ProcessingError::Io(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_methane() -> ProcessingError {
        ProcessingError::ColumnNotFound {
            field: "methane".to_string(),
            column: "Methane.emissions".to_string(),
        }
    }

    #[test]
    fn test_error_code() {
        assert_eq!(missing_methane().error_code(), "COLUMN_NOT_FOUND");
        assert_eq!(
            ProcessingError::InvalidConfig("x".to_string()).error_code(),
            "INVALID_CONFIG"
        );
    }

    #[test]
    fn test_malformed_value_message() {
        let error = ProcessingError::MalformedValue {
            column: "Max.Heat".to_string(),
            row: 3,
            value: "abc".to_string(),
            reason: "not a number".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("Max.Heat"));
        assert!(message.contains("row 3"));
        assert!(message.contains("abc"));
    }

    #[test]
    fn test_is_schema_error_through_context() {
        let error = missing_methane().with_context("While preprocessing Unit.csv");
        assert!(error.is_schema_error());
        assert_eq!(error.error_code(), "COLUMN_NOT_FOUND");
        assert!(!ProcessingError::InvalidConfig("x".into()).is_schema_error());
    }

    #[test]
    fn test_error_serialization() {
        let json = serde_json::to_string(&missing_methane()).unwrap();
        assert!(json.contains("COLUMN_NOT_FOUND"));
        assert!(json.contains("Methane.emissions"));
    }

    #[test]
    fn test_io_context() {
        let io: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "gone",
        ));
        let error = io.context("Opening Unit.csv").unwrap_err();
        assert_eq!(error.error_code(), "IO_ERROR");
        assert!(error.to_string().starts_with("Opening Unit.csv"));
    }
}
