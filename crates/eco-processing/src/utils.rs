//! Shared utilities for reading typed values out of DataFrames and for CSV I/O.
//!
//! These helpers are used by both the preprocessor and the analytics crate,
//! so a dataset is parsed with the same rules at every stage.

use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ProcessingError, Result, ResultExt};

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Tokens read as a missing value when they appear in a text column.
pub const NULL_MARKERS: [&str; 7] = ["", "na", "n/a", "nan", "null", "none", "#n/a"];

/// Check if a raw cell denotes a missing value.
pub fn is_null_marker(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    NULL_MARKERS.iter().any(|&marker| lower == marker)
}

// =============================================================================
// Column Extraction
// =============================================================================

/// Read a column as optional `f64` values.
///
/// Numeric columns are cast; text columns are parsed cell by cell, with
/// [`NULL_MARKERS`] read as missing. Any other text fails the whole call.
pub fn float_values(df: &DataFrame, column: &str) -> Result<Vec<Option<f64>>> {
    let series = df.column(column)?.as_materialized_series();

    match series.dtype() {
        DataType::Null => Ok(vec![None; series.len()]),
        dtype if is_numeric_dtype(dtype) => {
            let cast = series.cast(&DataType::Float64)?;
            // A NaN cell is a missing value, same as the "nan" text marker.
            Ok(cast
                .f64()?
                .into_iter()
                .map(|v| v.filter(|x| !x.is_nan()))
                .collect())
        }
        DataType::String => {
            let values = series.str()?;
            let mut result = Vec::with_capacity(values.len());
            for (idx, cell) in values.into_iter().enumerate() {
                match cell {
                    None => result.push(None),
                    Some(raw) if is_null_marker(raw) => result.push(None),
                    Some(raw) => {
                        let parsed = raw.trim().parse::<f64>().map_err(|_| {
                            ProcessingError::MalformedValue {
                                column: column.to_string(),
                                row: idx + 1,
                                value: raw.to_string(),
                                reason: "not a number".to_string(),
                            }
                        })?;
                        result.push(Some(parsed));
                    }
                }
            }
            Ok(result)
        }
        other => Err(ProcessingError::UnsupportedColumnType {
            column: column.to_string(),
            dtype: other.to_string(),
        }),
    }
}

/// Read a column as optional whole numbers (e.g. a reporting year).
pub fn integer_values(df: &DataFrame, column: &str) -> Result<Vec<Option<i64>>> {
    float_values(df, column)?
        .into_iter()
        .enumerate()
        .map(|(idx, value)| match value {
            Some(v) if v.fract() != 0.0 || !v.is_finite() => {
                Err(ProcessingError::MalformedValue {
                    column: column.to_string(),
                    row: idx + 1,
                    value: v.to_string(),
                    reason: "not a whole number".to_string(),
                })
            }
            Some(v) => Ok(Some(v as i64)),
            None => Ok(None),
        })
        .collect()
}

/// Read a column as optional strings, casting non-text columns.
pub fn string_values(df: &DataFrame, column: &str) -> Result<Vec<Option<String>>> {
    let series = df.column(column)?.as_materialized_series();
    let series = if series.dtype() == &DataType::String {
        series.clone()
    } else {
        series.cast(&DataType::String)?
    };

    Ok(series
        .str()?
        .into_iter()
        .map(|cell| cell.map(|s| s.trim().to_string()))
        .collect())
}

/// Require every value of a column to be a finite, non-negative number or missing.
pub fn ensure_non_negative(column: &str, values: &[Option<f64>]) -> Result<()> {
    for (idx, value) in values.iter().enumerate() {
        if let Some(v) = value
            && (!v.is_finite() || *v < 0.0)
        {
            return Err(ProcessingError::MalformedValue {
                column: column.to_string(),
                row: idx + 1,
                value: v.to_string(),
                reason: "expected a finite, non-negative quantity".to_string(),
            });
        }
    }
    Ok(())
}

// =============================================================================
// CSV I/O
// =============================================================================

/// Load a CSV file with a header row.
///
/// Column types are inferred from the first `infer_schema_length` rows, or
/// from the whole file when it is `None`.
pub fn load_csv(path: impl AsRef<Path>, infer_schema_length: Option<usize>) -> Result<DataFrame> {
    let path = path.as_ref();
    info!("Loading dataset from: {}", path.display());

    let df = CsvReadOptions::default()
        .with_infer_schema_length(infer_schema_length)
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))
        .context(format!("Opening {}", path.display()))?
        .finish()
        .context(format!("Parsing {}", path.display()))?;

    debug!("Dataset loaded: {:?}", df.shape());
    Ok(df)
}

/// Write a DataFrame as CSV with a header row, creating parent directories.
pub fn write_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path).context(format!("Creating {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(df)?;

    info!("Dataset saved: {}", path.display());
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
