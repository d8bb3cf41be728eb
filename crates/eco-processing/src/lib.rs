//! Facility Emissions Preprocessing Library
//!
//! Reads a raw facility-level emissions dataset and derives the columns the
//! analytics stage works from.
//!
//! # Overview
//!
//! For every record the preprocessor computes:
//!
//! - **`CO2_emissions`, `CH4_emissions`, `N2O_emissions`**: the raw gas
//!   quantities with missing values replaced by zero
//! - **`CO2_eq_emissions`**: `CO2 + 25*CH4 + 298*N2O` (fixed GWP coefficients)
//! - **`Eco_Score`**: CO2-equivalent emissions divided by the heat-output proxy,
//!   with a zero heat output replaced by `1e-10` and any non-finite result
//!   replaced by `1e10`
//!
//! The run is fail-fast: a missing gas or heat column, or a malformed value in
//! one of them, aborts before anything is written.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use eco_processing::{PreprocessConfig, Preprocessor, SchemaConfig};
//!
//! let config = PreprocessConfig::builder()
//!     .schema(SchemaConfig::builder().heat_output("Max.Heat").build()?)
//!     .build()?;
//!
//! let summary = Preprocessor::new(config).run("Unit.csv", "Processed_Unit.csv")?;
//! println!("{} rows, {} with zero heat output", summary.rows, summary.zero_heat_rows);
//! ```
//!
//! # Schema
//!
//! Column names are configured through [`SchemaConfig`] and resolved once per
//! dataset by [`schema::ResolvedColumns`]; see the [`schema`] module for the
//! matching rules.

pub mod config;
pub mod error;
pub mod preprocess;
pub mod schema;
pub mod utils;

// Re-exports for convenient access
pub use config::{
    ConfigValidationError, PreprocessConfig, PreprocessConfigBuilder, SchemaConfig,
    SchemaConfigBuilder, SchemaField,
};
pub use error::{ProcessingError, Result as ProcessingResult, ResultExt};
pub use preprocess::{
    ECO_SCORE_SENTINEL, GWP_CH4, GWP_CO2, GWP_N2O, PreprocessOutput, PreprocessSummary,
    Preprocessor, ZERO_HEAT_REPLACEMENT, co2_equivalent, eco_score,
};
pub use schema::{
    CH4_EMISSIONS, CO2_EMISSIONS, CO2_EQ_EMISSIONS, DERIVED_COLUMNS, ECO_SCORE, N2O_EMISSIONS,
    ResolvedColumns,
};
pub use utils::{float_values, integer_values, load_csv, string_values, write_csv};
