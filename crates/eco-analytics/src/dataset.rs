//! Loading the processed dataset into typed records.
//!
//! The processed CSV is read once and validated into [`EmissionRecord`]s; all
//! queries afterwards run over this immutable, in-memory set.

use eco_processing::schema::require_column;
use eco_processing::{
    CH4_EMISSIONS, CO2_EMISSIONS, CO2_EQ_EMISSIONS, ECO_SCORE, N2O_EMISSIONS, ProcessingError,
    ResolvedColumns, SchemaConfig, SchemaField, float_values, integer_values, load_csv,
    string_values,
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Result, ResultExt};

/// One processed facility emissions record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionRecord {
    pub facility_name: String,
    pub sector: String,
    pub year: i32,
    pub state: Option<String>,
    pub city: Option<String>,
    /// Non-biogenic CO2, zero when unreported.
    pub co2: f64,
    /// Methane, zero when unreported.
    pub ch4: f64,
    /// Nitrous oxide, zero when unreported.
    pub n2o: f64,
    pub co2_eq: f64,
    pub eco_score: f64,
    pub heat_output: Option<f64>,
}

/// The processed dataset, read-only for its whole lifetime.
#[derive(Debug, Clone, Default)]
pub struct EmissionsDataset {
    records: Vec<EmissionRecord>,
    has_state: bool,
    has_city: bool,
    has_heat_output: bool,
}

static_assertions::assert_impl_all!(EmissionsDataset: Send, Sync);

impl EmissionsDataset {
    /// Build a dataset from already validated records.
    ///
    /// Location and heat columns count as present when any record carries them.
    pub fn from_records(records: Vec<EmissionRecord>) -> Self {
        let has_state = records.iter().any(|r| r.state.is_some());
        let has_city = records.iter().any(|r| r.city.is_some());
        let has_heat_output = records.iter().any(|r| r.heat_output.is_some());
        Self {
            records,
            has_state,
            has_city,
            has_heat_output,
        }
    }

    /// Read a processed CSV file.
    pub fn load(path: impl AsRef<Path>, schema: &SchemaConfig) -> Result<Self> {
        let path = path.as_ref();
        let df = load_csv(path, None)?;
        Self::from_dataframe(&df, schema)
            .context(format!("Loading processed dataset {}", path.display()))
    }

    /// Validate a processed DataFrame into records.
    ///
    /// Facility, sector, year and the derived emission columns are required;
    /// state, city and heat output are optional. A missing year or derived
    /// value is a malformed row and fails the load.
    pub fn from_dataframe(
        df: &DataFrame,
        schema: &SchemaConfig,
    ) -> std::result::Result<Self, ProcessingError> {
        let columns = ResolvedColumns::resolve(
            df,
            schema,
            &[SchemaField::FacilityName, SchemaField::Sector, SchemaField::Year],
            &[SchemaField::State, SchemaField::City, SchemaField::HeatOutput],
        )?;

        let names = string_values(df, columns.require(SchemaField::FacilityName)?)?;
        let sectors = string_values(df, columns.require(SchemaField::Sector)?)?;
        let year_col = columns.require(SchemaField::Year)?;
        let years = integer_values(df, year_col)?;

        let states = optional_strings(df, columns.get(SchemaField::State))?;
        let cities = optional_strings(df, columns.get(SchemaField::City))?;
        let heat = match columns.get(SchemaField::HeatOutput) {
            Some(column) => float_values(df, column)?,
            None => vec![None; df.height()],
        };

        let co2 = derived_values(df, CO2_EMISSIONS)?;
        let ch4 = derived_values(df, CH4_EMISSIONS)?;
        let n2o = derived_values(df, N2O_EMISSIONS)?;
        let co2_eq = derived_values(df, CO2_EQ_EMISSIONS)?;
        let eco_score = derived_values(df, ECO_SCORE)?;

        let mut records = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let year = years[i]
                .and_then(|y| i32::try_from(y).ok())
                .ok_or_else(|| ProcessingError::MalformedValue {
                    column: year_col.to_string(),
                    row: i + 1,
                    value: format!("{:?}", years[i]),
                    reason: "missing or out-of-range year".to_string(),
                })?;

            records.push(EmissionRecord {
                facility_name: names[i].clone().unwrap_or_default(),
                sector: sectors[i].clone().unwrap_or_default(),
                year,
                state: states[i].clone(),
                city: cities[i].clone(),
                co2: co2[i],
                ch4: ch4[i],
                n2o: n2o[i],
                co2_eq: co2_eq[i],
                eco_score: eco_score[i],
                heat_output: heat[i],
            });
        }

        let dataset = Self {
            records,
            has_state: columns.contains(SchemaField::State),
            has_city: columns.contains(SchemaField::City),
            has_heat_output: columns.contains(SchemaField::HeatOutput),
        };
        info!("Loaded {} processed emission records", dataset.len());
        Ok(dataset)
    }

    pub fn records(&self) -> &[EmissionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_state(&self) -> bool {
        self.has_state
    }

    pub fn has_city(&self) -> bool {
        self.has_city
    }

    pub fn has_heat_output(&self) -> bool {
        self.has_heat_output
    }

    /// Inclusive span of years covered, if any records exist.
    pub fn year_span(&self) -> Option<(i32, i32)> {
        let min = self.records.iter().map(|r| r.year).min()?;
        let max = self.records.iter().map(|r| r.year).max()?;
        Some((min, max))
    }
}

fn optional_strings(
    df: &DataFrame,
    column: Option<&str>,
) -> std::result::Result<Vec<Option<String>>, ProcessingError> {
    match column {
        Some(column) => string_values(df, column),
        None => Ok(vec![None; df.height()]),
    }
}

/// Read a derived column; every value must be present and finite.
fn derived_values(df: &DataFrame, name: &str) -> std::result::Result<Vec<f64>, ProcessingError> {
    let column = require_column(df, name)?;
    debug!("Reading derived column '{}'", column);

    float_values(df, &column)?
        .into_iter()
        .enumerate()
        .map(|(idx, value)| match value {
            Some(v) if v.is_finite() => Ok(v),
            other => Err(ProcessingError::MalformedValue {
                column: column.clone(),
                row: idx + 1,
                value: format!("{:?}", other),
                reason: "derived value must be present and finite".to_string(),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processed_frame() -> DataFrame {
        df![
            "Facility.Name" => [Some("ACME CO."), None],
            "Sector" => ["Energy", "Energy"],
            "Year" => [2015i64, 2016],
            "CO2_emissions" => [10.0, 0.0],
            "CH4_emissions" => [2.0, 0.0],
            "N2O_emissions" => [1.0, 1.0],
            "CO2_eq_emissions" => [358.0, 298.0],
            "Eco_Score" => [71.6, 1e10],
        ]
        .unwrap()
    }

    #[test]
    fn test_from_dataframe_without_optional_columns() {
        let dataset =
            EmissionsDataset::from_dataframe(&processed_frame(), &SchemaConfig::default()).unwrap();

        assert_eq!(dataset.len(), 2);
        assert!(!dataset.has_state());
        assert!(!dataset.has_heat_output());

        let first = &dataset.records()[0];
        assert_eq!(first.facility_name, "ACME CO.");
        assert_eq!(first.year, 2015);
        assert_eq!(first.co2_eq, 358.0);
        assert_eq!(first.heat_output, None);

        // Null facility names load as empty strings.
        assert_eq!(dataset.records()[1].facility_name, "");
        assert_eq!(dataset.year_span(), Some((2015, 2016)));
    }

    #[test]
    fn test_missing_derived_column_is_error() {
        let df = processed_frame().drop("Eco_Score").unwrap();
        let err = EmissionsDataset::from_dataframe(&df, &SchemaConfig::default()).unwrap_err();
        assert!(err.is_schema_error());
    }

    #[test]
    fn test_null_derived_value_is_malformed() {
        let mut df = processed_frame();
        df.replace(
            "CO2_eq_emissions",
            Series::new("CO2_eq_emissions".into(), [Some(358.0), None]),
        )
        .unwrap();
        let err = EmissionsDataset::from_dataframe(&df, &SchemaConfig::default()).unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_VALUE");
    }

    #[test]
    fn test_from_records_detects_optional_fields() {
        let dataset = EmissionsDataset::from_records(vec![EmissionRecord {
            facility_name: "ACME CO.".into(),
            sector: "Energy".into(),
            year: 2015,
            state: Some("TX".into()),
            city: None,
            co2: 10.0,
            ch4: 2.0,
            n2o: 1.0,
            co2_eq: 358.0,
            eco_score: 71.6,
            heat_output: Some(5.0),
        }]);
        assert!(dataset.has_state());
        assert!(!dataset.has_city());
        assert!(dataset.has_heat_output());
    }
}
