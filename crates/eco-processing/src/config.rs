//! Configuration types for the emissions preprocessor.
//!
//! The physical column names of the input dataset are not hardcoded: a
//! [`SchemaConfig`] maps every logical field to the header it is read from.
//! Both configuration types use the builder pattern and are validated on build.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{ProcessingError, Result, ResultExt};

/// Logical fields of a facility emissions record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaField {
    FacilityName,
    Sector,
    Year,
    State,
    City,
    Methane,
    NitrousOxide,
    Co2NonBiogenic,
    HeatOutput,
}

impl SchemaField {
    /// All logical fields, in header order of the reference dataset.
    pub const ALL: [SchemaField; 9] = [
        SchemaField::FacilityName,
        SchemaField::Sector,
        SchemaField::Year,
        SchemaField::State,
        SchemaField::City,
        SchemaField::Methane,
        SchemaField::NitrousOxide,
        SchemaField::Co2NonBiogenic,
        SchemaField::HeatOutput,
    ];

    /// Fields the preprocessor cannot run without.
    pub const GAS_AND_HEAT: [SchemaField; 4] = [
        SchemaField::Methane,
        SchemaField::NitrousOxide,
        SchemaField::Co2NonBiogenic,
        SchemaField::HeatOutput,
    ];

    /// Human-readable name used in error messages and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::FacilityName => "facility name",
            Self::Sector => "sector",
            Self::Year => "year",
            Self::State => "state",
            Self::City => "city",
            Self::Methane => "methane",
            Self::NitrousOxide => "nitrous oxide",
            Self::Co2NonBiogenic => "non-biogenic CO2",
            Self::HeatOutput => "heat output",
        }
    }
}

/// Mapping from logical field to physical column name.
///
/// # Example
///
/// ```rust,ignore
/// use eco_processing::config::SchemaConfig;
///
/// let schema = SchemaConfig::builder()
///     .heat_output("Max.Heat.Input")
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub facility_name: String,
    pub sector: String,
    pub year: String,
    pub state: String,
    pub city: String,
    pub methane: String,
    pub nitrous_oxide: String,
    pub co2_non_biogenic: String,
    pub heat_output: String,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            facility_name: "Facility.Name".to_string(),
            sector: "Sector".to_string(),
            year: "Year".to_string(),
            state: "State".to_string(),
            city: "City".to_string(),
            methane: "Methane.emissions".to_string(),
            nitrous_oxide: "Nitrous.Oxide.emissions".to_string(),
            co2_non_biogenic: "CO2.emissions.non.biogenic.".to_string(),
            heat_output: "Max.Heat".to_string(),
        }
    }
}

impl SchemaConfig {
    /// Create a new schema builder seeded with the default column names.
    pub fn builder() -> SchemaConfigBuilder {
        SchemaConfigBuilder::default()
    }

    /// Physical column name configured for a logical field.
    pub fn column(&self, field: SchemaField) -> &str {
        match field {
            SchemaField::FacilityName => &self.facility_name,
            SchemaField::Sector => &self.sector,
            SchemaField::Year => &self.year,
            SchemaField::State => &self.state,
            SchemaField::City => &self.city,
            SchemaField::Methane => &self.methane,
            SchemaField::NitrousOxide => &self.nitrous_oxide,
            SchemaField::Co2NonBiogenic => &self.co2_non_biogenic,
            SchemaField::HeatOutput => &self.heat_output,
        }
    }

    /// Load a schema from a JSON file. Missing keys keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .context(format!("Reading schema file {}", path.display()))?;
        let schema: SchemaConfig = serde_json::from_str(&content)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Validate the mapping: no blank names and no physical column shared by two fields.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        let mut seen: HashMap<&str, SchemaField> = HashMap::new();
        for field in SchemaField::ALL {
            let column = self.column(field).trim();
            if column.is_empty() {
                return Err(ConfigValidationError::EmptyColumnName(field.label()));
            }
            if let Some(previous) = seen.insert(column, field) {
                return Err(ConfigValidationError::DuplicateColumn {
                    column: column.to_string(),
                    first: previous.label(),
                    second: field.label(),
                });
            }
        }
        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Column name for '{0}' must not be empty")]
    EmptyColumnName(&'static str),

    #[error("Column '{column}' is mapped to both '{first}' and '{second}'")]
    DuplicateColumn {
        column: String,
        first: &'static str,
        second: &'static str,
    },

    #[error("Invalid CSV schema inference length: {0} (must be at least 1)")]
    InvalidInferLength(usize),
}

/// Builder for [`SchemaConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct SchemaConfigBuilder {
    overrides: HashMap<SchemaField, String>,
}

impl SchemaConfigBuilder {
    /// Override the physical column for any logical field.
    pub fn column(mut self, field: SchemaField, name: impl Into<String>) -> Self {
        self.overrides.insert(field, name.into());
        self
    }

    pub fn facility_name(self, name: impl Into<String>) -> Self {
        self.column(SchemaField::FacilityName, name)
    }

    pub fn sector(self, name: impl Into<String>) -> Self {
        self.column(SchemaField::Sector, name)
    }

    pub fn year(self, name: impl Into<String>) -> Self {
        self.column(SchemaField::Year, name)
    }

    pub fn state(self, name: impl Into<String>) -> Self {
        self.column(SchemaField::State, name)
    }

    pub fn city(self, name: impl Into<String>) -> Self {
        self.column(SchemaField::City, name)
    }

    pub fn methane(self, name: impl Into<String>) -> Self {
        self.column(SchemaField::Methane, name)
    }

    pub fn nitrous_oxide(self, name: impl Into<String>) -> Self {
        self.column(SchemaField::NitrousOxide, name)
    }

    pub fn co2_non_biogenic(self, name: impl Into<String>) -> Self {
        self.column(SchemaField::Co2NonBiogenic, name)
    }

    pub fn heat_output(self, name: impl Into<String>) -> Self {
        self.column(SchemaField::HeatOutput, name)
    }

    /// Build the schema.
    ///
    /// Returns a validated `SchemaConfig` or an error if validation fails.
    pub fn build(self) -> std::result::Result<SchemaConfig, ConfigValidationError> {
        let mut schema = SchemaConfig::default();
        for (field, name) in self.overrides {
            let slot = match field {
                SchemaField::FacilityName => &mut schema.facility_name,
                SchemaField::Sector => &mut schema.sector,
                SchemaField::Year => &mut schema.year,
                SchemaField::State => &mut schema.state,
                SchemaField::City => &mut schema.city,
                SchemaField::Methane => &mut schema.methane,
                SchemaField::NitrousOxide => &mut schema.nitrous_oxide,
                SchemaField::Co2NonBiogenic => &mut schema.co2_non_biogenic,
                SchemaField::HeatOutput => &mut schema.heat_output,
            };
            *slot = name;
        }

        schema.validate()?;
        Ok(schema)
    }
}

/// Configuration for a preprocessing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Column mapping for the raw dataset.
    pub schema: SchemaConfig,

    /// Whether the raw gas columns are rewritten with their zero-filled values.
    /// Default: true
    pub fill_gas_columns_in_place: bool,

    /// Number of rows polars scans to infer column types when reading CSV.
    /// Default: None (the whole file)
    pub infer_schema_length: Option<usize>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            schema: SchemaConfig::default(),
            fill_gas_columns_in_place: true,
            infer_schema_length: None,
        }
    }
}

impl PreprocessConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PreprocessConfigBuilder {
        PreprocessConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        self.schema.validate()?;
        if self.infer_schema_length == Some(0) {
            return Err(ConfigValidationError::InvalidInferLength(0));
        }
        Ok(())
    }
}

/// Builder for [`PreprocessConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PreprocessConfigBuilder {
    schema: Option<SchemaConfig>,
    fill_gas_columns_in_place: Option<bool>,
    infer_schema_length: Option<usize>,
}

impl PreprocessConfigBuilder {
    /// Set the column mapping for the raw dataset.
    pub fn schema(mut self, schema: SchemaConfig) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Keep or rewrite the raw gas columns after null filling.
    pub fn fill_gas_columns_in_place(mut self, fill: bool) -> Self {
        self.fill_gas_columns_in_place = Some(fill);
        self
    }

    /// Limit CSV type inference to the first `rows` rows instead of the whole file.
    pub fn infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = Some(rows);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> std::result::Result<PreprocessConfig, ConfigValidationError> {
        let config = PreprocessConfig {
            schema: self.schema.unwrap_or_default(),
            fill_gas_columns_in_place: self.fill_gas_columns_in_place.unwrap_or(true),
            infer_schema_length: self.infer_schema_length,
        };

        config.validate()?;
        Ok(config)
    }
}

impl TryFrom<PreprocessConfigBuilder> for PreprocessConfig {
    type Error = ProcessingError;

    fn try_from(builder: PreprocessConfigBuilder) -> Result<Self> {
        Ok(builder.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema() {
        let schema = SchemaConfig::default();
        assert_eq!(schema.column(SchemaField::FacilityName), "Facility.Name");
        assert_eq!(schema.column(SchemaField::Methane), "Methane.emissions");
        assert_eq!(
            schema.column(SchemaField::Co2NonBiogenic),
            "CO2.emissions.non.biogenic."
        );
        assert_eq!(schema.column(SchemaField::HeatOutput), "Max.Heat");
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_builder_overrides() {
        let schema = SchemaConfig::builder()
            .heat_output("Heat")
            .facility_name("Name")
            .build()
            .unwrap();
        assert_eq!(schema.heat_output, "Heat");
        assert_eq!(schema.facility_name, "Name");
        assert_eq!(schema.sector, "Sector");
    }

    #[test]
    fn test_validation_empty_column() {
        let result = SchemaConfig::builder().year("  ").build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::EmptyColumnName("year")
        ));
    }

    #[test]
    fn test_validation_duplicate_column() {
        let result = SchemaConfig::builder().city("State").build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::DuplicateColumn { .. }
        ));
    }

    #[test]
    fn test_schema_from_partial_json() {
        let json = r#"{ "heat_output": "Max.Heat.Input", "state": "ST" }"#;
        let schema: SchemaConfig = serde_json::from_str(json).unwrap();
        assert_eq!(schema.heat_output, "Max.Heat.Input");
        assert_eq!(schema.state, "ST");
        assert_eq!(schema.methane, "Methane.emissions");
    }

    #[test]
    fn test_preprocess_config_defaults() {
        let config = PreprocessConfig::builder().build().unwrap();
        assert!(config.fill_gas_columns_in_place);
        assert_eq!(config.infer_schema_length, None);
        assert_eq!(config.schema, SchemaConfig::default());
    }

    #[test]
    fn test_preprocess_config_invalid_infer_length() {
        let result = PreprocessConfig::builder().infer_schema_length(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidInferLength(0)
        ));
    }

    #[test]
    fn test_try_from_builder_maps_error() {
        let result = PreprocessConfig::try_from(PreprocessConfig::builder().infer_schema_length(0));
        assert_eq!(result.unwrap_err().error_code(), "INVALID_CONFIG");
    }
}
