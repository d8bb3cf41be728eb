//! Error types for the eco-analytics crate.
//!
//! Two variants are not failures in the usual sense: [`AnalyticsError::NoMatchingFacility`]
//! and [`AnalyticsError::NoData`] describe a query whose filters select
//! nothing. A presentation layer renders a placeholder for them instead of an
//! error page; [`AnalyticsError::is_empty_result`] tells the two kinds apart.

use eco_processing::ProcessingError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for analytics queries.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// No facility name contains the requested substring within the filters.
    #[error("No facility matching '{0}'")]
    NoMatchingFacility(String),

    /// The filters leave nothing to aggregate.
    #[error("No data for current filters: {0}")]
    NoData(String),

    /// A filter value is unusable (e.g. an inverted year range).
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// An optional column the query depends on is absent from the dataset.
    #[error("Column for {0} not present in dataset")]
    ColumnNotFound(String),

    /// Loading or parsing the processed dataset failed, including file I/O
    /// and the JSON column mapping.
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<AnalyticsError>,
    },
}

impl AnalyticsError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        AnalyticsError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoMatchingFacility(_) => "NO_MATCHING_FACILITY",
            Self::NoData(_) => "NO_DATA",
            Self::InvalidFilter(_) => "INVALID_FILTER",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::Processing(source) => source.error_code(),
            Self::Polars(_) => "POLARS_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error means "the filters selected nothing".
    pub fn is_empty_result(&self) -> bool {
        match self {
            Self::NoMatchingFacility(_) | Self::NoData(_) => true,
            Self::WithContext { source, .. } => source.is_empty_result(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for AnalyticsError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AnalyticsError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;

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

impl<T> ResultExt<T> for std::result::Result<T, ProcessingError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| AnalyticsError::Processing(e).with_context(context))
    }
}
