//! Column resolution against a loaded dataset.
//!
//! Logical fields from [`SchemaConfig`] are matched to the DataFrame header
//! once, at load time. A configured name matches a header exactly, or after
//! normalization (lowercased, every non-alphanumeric character dropped), so
//! `methane_emissions` still resolves `Methane.emissions`.

use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

use crate::config::{SchemaConfig, SchemaField};
use crate::error::{ProcessingError, Result};

/// Zero-filled copy of the non-biogenic CO2 quantity.
pub const CO2_EMISSIONS: &str = "CO2_emissions";
/// Zero-filled copy of the methane quantity.
pub const CH4_EMISSIONS: &str = "CH4_emissions";
/// Zero-filled copy of the nitrous oxide quantity.
pub const N2O_EMISSIONS: &str = "N2O_emissions";
/// GWP-weighted sum of the three gases.
pub const CO2_EQ_EMISSIONS: &str = "CO2_eq_emissions";
/// CO2-equivalent emissions per unit of heat output.
pub const ECO_SCORE: &str = "Eco_Score";

/// Derived columns appended by the preprocessor, in output order.
pub const DERIVED_COLUMNS: [&str; 5] = [
    CO2_EQ_EMISSIONS,
    CO2_EMISSIONS,
    CH4_EMISSIONS,
    N2O_EMISSIONS,
    ECO_SCORE,
];

static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("Invalid regex: non-alphanumeric"));

/// Normalize a column name for tolerant matching.
pub fn normalize_column_name(name: &str) -> String {
    NON_ALPHANUMERIC
        .replace_all(&name.trim().to_lowercase(), "")
        .into_owned()
}

/// Find the header in `df` that a configured column name refers to.
///
/// Exact matches win over normalized ones.
pub fn find_column(df: &DataFrame, wanted: &str) -> Option<String> {
    let names = df.get_column_names();
    if names.iter().any(|name| name.as_str() == wanted) {
        return Some(wanted.to_string());
    }

    let target = normalize_column_name(wanted);
    if target.is_empty() {
        return None;
    }
    names
        .iter()
        .find(|name| normalize_column_name(name.as_str()) == target)
        .map(|name| name.to_string())
}

/// Physical column names resolved for one DataFrame.
#[derive(Debug, Clone, Default)]
pub struct ResolvedColumns {
    columns: HashMap<SchemaField, String>,
}

impl ResolvedColumns {
    /// Resolve `required` and `optional` fields against the header of `df`.
    ///
    /// Fails with [`ProcessingError::ColumnNotFound`] on the first required
    /// field that cannot be found; optional fields are simply left out.
    pub fn resolve(
        df: &DataFrame,
        schema: &SchemaConfig,
        required: &[SchemaField],
        optional: &[SchemaField],
    ) -> Result<Self> {
        let mut columns = HashMap::new();

        for &field in required {
            let configured = schema.column(field);
            let physical =
                find_column(df, configured).ok_or_else(|| ProcessingError::ColumnNotFound {
                    field: field.label().to_string(),
                    column: configured.to_string(),
                })?;
            if physical != configured {
                debug!(
                    "Resolved {} column '{}' as '{}'",
                    field.label(),
                    configured,
                    physical
                );
            }
            columns.insert(field, physical);
        }

        for &field in optional {
            if let Some(physical) = find_column(df, schema.column(field)) {
                columns.insert(field, physical);
            } else {
                debug!("Optional {} column not present", field.label());
            }
        }

        Ok(Self { columns })
    }

    /// Physical name of a field, if it was resolved.
    pub fn get(&self, field: SchemaField) -> Option<&str> {
        self.columns.get(&field).map(String::as_str)
    }

    /// Physical name of a field that must have been resolved.
    pub fn require(&self, field: SchemaField) -> Result<&str> {
        self.get(field).ok_or_else(|| ProcessingError::ColumnNotFound {
            field: field.label().to_string(),
            column: format!("<{}>", field.label()),
        })
    }

    pub fn contains(&self, field: SchemaField) -> bool {
        self.columns.contains_key(&field)
    }
}

/// Resolve a fixed (non-configurable) column such as a derived column.
pub fn require_column(df: &DataFrame, name: &str) -> Result<String> {
    find_column(df, name).ok_or_else(|| ProcessingError::ColumnNotFound {
        field: name.to_string(),
        column: name.to_string(),
    })
}
