//! The emissions preprocessor.
//!
//! Turns a raw facility emissions dataset into a processed one by appending
//! the zero-filled gas columns, the CO2-equivalent total, and the Eco Score.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{PreprocessConfig, SchemaField};
use crate::error::{ProcessingError, Result, ResultExt};
use crate::schema::{
    CH4_EMISSIONS, CO2_EMISSIONS, CO2_EQ_EMISSIONS, ECO_SCORE, N2O_EMISSIONS, ResolvedColumns,
};
use crate::utils::{ensure_non_negative, float_values, load_csv, write_csv};

/// Global warming potential of CO2.
pub const GWP_CO2: f64 = 1.0;
/// Global warming potential of methane.
pub const GWP_CH4: f64 = 25.0;
/// Global warming potential of nitrous oxide.
pub const GWP_N2O: f64 = 298.0;

/// Divisor used in place of a heat output of exactly zero.
pub const ZERO_HEAT_REPLACEMENT: f64 = 1e-10;
/// Eco Score assigned when the ratio is undefined or infinite.
pub const ECO_SCORE_SENTINEL: f64 = 1e10;

/// CO2-equivalent emissions: `CO2 + 25*CH4 + 298*N2O`.
#[inline]
pub fn co2_equivalent(co2: f64, ch4: f64, n2o: f64) -> f64 {
    co2 * GWP_CO2 + ch4 * GWP_CH4 + n2o * GWP_N2O
}

/// Eco Score for one record.
///
/// A zero heat output is replaced by [`ZERO_HEAT_REPLACEMENT`]; a missing
/// heat output or a non-finite quotient yields [`ECO_SCORE_SENTINEL`].
pub fn eco_score(co2_eq: f64, heat_output: Option<f64>) -> f64 {
    let Some(heat) = heat_output else {
        return ECO_SCORE_SENTINEL;
    };
    let divisor = if heat == 0.0 {
        ZERO_HEAT_REPLACEMENT
    } else {
        heat
    };
    let score = co2_eq / divisor;
    if score.is_finite() {
        score
    } else {
        ECO_SCORE_SENTINEL
    }
}

/// What a preprocessing run did.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreprocessSummary {
    /// Number of records processed.
    pub rows: usize,
    /// Missing values replaced by zero, keyed by physical gas column.
    pub filled_nulls: BTreeMap<String, usize>,
    /// Records whose heat output was exactly zero.
    pub zero_heat_rows: usize,
    /// Records whose Eco Score fell back to the sentinel.
    pub sentinel_rows: usize,
    /// Where the processed dataset was written, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    /// Wall-clock duration of the run in milliseconds.
    pub duration_ms: u64,
}

/// A processed dataset together with its run summary.
#[derive(Debug, Clone)]
pub struct PreprocessOutput {
    pub data: DataFrame,
    pub summary: PreprocessSummary,
}

/// Derived values for every row, computed before any column is touched.
struct DerivedColumns {
    co2: Vec<f64>,
    ch4: Vec<f64>,
    n2o: Vec<f64>,
    co2_eq: Vec<f64>,
    eco_score: Vec<f64>,
}

/// Computes the processed dataset from a raw one.
///
/// # Example
///
/// ```rust,ignore
/// use eco_processing::{PreprocessConfig, Preprocessor};
///
/// let summary = Preprocessor::new(PreprocessConfig::default())
///     .run("Unit.csv", "Processed_Unit.csv")?;
/// println!("{} rows processed", summary.rows);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    config: PreprocessConfig,
}

static_assertions::assert_impl_all!(Preprocessor: Send, Sync);

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Load `input`, process it, and write the result to `output`.
    ///
    /// Nothing is written unless every row processed successfully.
    pub fn run(&self, input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<PreprocessSummary> {
        let input = input.as_ref();
        let output = output.as_ref();
        let start = Instant::now();

        let df = load_csv(input, self.config.infer_schema_length)?;
        let PreprocessOutput { mut data, mut summary } = self
            .process(df)
            .context(format!("Preprocessing {}", input.display()))?;
        verify_derived_columns(&data)?;

        write_csv(&mut data, output)?;

        summary.output_path = Some(output.display().to_string());
        summary.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Unit data has been processed and saved to {} ({} rows, {}ms)",
            output.display(),
            summary.rows,
            summary.duration_ms
        );
        Ok(summary)
    }

    /// Process a raw DataFrame in memory.
    ///
    /// Fails before modifying anything if a gas or heat column is missing or
    /// holds a malformed value.
    pub fn process(&self, mut df: DataFrame) -> Result<PreprocessOutput> {
        let start = Instant::now();
        let columns =
            ResolvedColumns::resolve(&df, &self.config.schema, &SchemaField::GAS_AND_HEAT, &[])?;
        debug!("Unit columns: {:?}", df.get_column_names());

        let mut summary = PreprocessSummary {
            rows: df.height(),
            ..Default::default()
        };

        let methane_col = columns.require(SchemaField::Methane)?.to_string();
        let nitrous_col = columns.require(SchemaField::NitrousOxide)?.to_string();
        let co2_col = columns.require(SchemaField::Co2NonBiogenic)?.to_string();
        let heat_col = columns.require(SchemaField::HeatOutput)?.to_string();

        let ch4 = self.gas_quantities(&df, &methane_col, &mut summary)?;
        let n2o = self.gas_quantities(&df, &nitrous_col, &mut summary)?;
        let co2 = self.gas_quantities(&df, &co2_col, &mut summary)?;

        let heat = float_values(&df, &heat_col)?;
        ensure_non_negative(&heat_col, &heat)?;

        let derived = Self::derive(co2, ch4, n2o, &heat, &mut summary);

        if summary.sentinel_rows > 0 {
            warn!(
                "{} rows have an undefined Eco Score and were set to {:e}",
                summary.sentinel_rows, ECO_SCORE_SENTINEL
            );
        }

        if self.config.fill_gas_columns_in_place {
            df.replace(&methane_col, Series::new(methane_col.as_str().into(), derived.ch4.clone()))?;
            df.replace(&nitrous_col, Series::new(nitrous_col.as_str().into(), derived.n2o.clone()))?;
            df.replace(&co2_col, Series::new(co2_col.as_str().into(), derived.co2.clone()))?;
        }

        df.with_column(Series::new(CO2_EQ_EMISSIONS.into(), derived.co2_eq))?;
        df.with_column(Series::new(CO2_EMISSIONS.into(), derived.co2))?;
        df.with_column(Series::new(CH4_EMISSIONS.into(), derived.ch4))?;
        df.with_column(Series::new(N2O_EMISSIONS.into(), derived.n2o))?;
        df.with_column(Series::new(ECO_SCORE.into(), derived.eco_score))?;

        summary.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Computed derived emissions for {} rows ({} with zero heat output)",
            summary.rows, summary.zero_heat_rows
        );

        Ok(PreprocessOutput { data: df, summary })
    }

    /// Read a gas column, validate it, and replace missing values with zero.
    fn gas_quantities(
        &self,
        df: &DataFrame,
        column: &str,
        summary: &mut PreprocessSummary,
    ) -> Result<Vec<f64>> {
        let values = float_values(df, column)?;
        ensure_non_negative(column, &values)?;

        let missing = values.iter().filter(|v| v.is_none()).count();
        if missing > 0 {
            debug!("Filling {} missing values in '{}' with 0", missing, column);
        }
        summary.filled_nulls.insert(column.to_string(), missing);

        Ok(values.into_iter().map(|v| v.unwrap_or(0.0)).collect())
    }

    fn derive(
        co2: Vec<f64>,
        ch4: Vec<f64>,
        n2o: Vec<f64>,
        heat: &[Option<f64>],
        summary: &mut PreprocessSummary,
    ) -> DerivedColumns {
        let len = co2.len();
        let mut co2_eq = Vec::with_capacity(len);
        let mut scores = Vec::with_capacity(len);

        for i in 0..len {
            let total = co2_equivalent(co2[i], ch4[i], n2o[i]);
            if heat[i] == Some(0.0) {
                summary.zero_heat_rows += 1;
            }
            let score = eco_score(total, heat[i]);
            if score == ECO_SCORE_SENTINEL {
                summary.sentinel_rows += 1;
            }
            co2_eq.push(total);
            scores.push(score);
        }

        DerivedColumns {
            co2,
            ch4,
            n2o,
            co2_eq,
            eco_score: scores,
        }
    }
}

impl From<PreprocessConfig> for Preprocessor {
    fn from(config: PreprocessConfig) -> Self {
        Self::new(config)
    }
}

/// Check a processed DataFrame for the invariant that every derived value is finite.
pub fn verify_derived_columns(df: &DataFrame) -> Result<()> {
    for column in crate::schema::DERIVED_COLUMNS {
        let values = float_values(df, column)?;
        if let Some((idx, value)) = values
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_some_and(f64::is_finite))
        {
            return Err(ProcessingError::MalformedValue {
                column: column.to_string(),
                row: idx + 1,
                value: format!("{:?}", value),
                reason: "derived value is not finite".to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchemaConfig;

    fn raw_frame() -> DataFrame {
        df![
            "Facility.Name" => ["ACME CO.", "ACME CO.", "BETA LLC"],
            "Sector" => ["Energy", "Energy", "Chemicals"],
            "Year" => [2015i64, 2016, 2015],
            "Methane.emissions" => [Some(2.0), Some(2.0), None],
            "Nitrous.Oxide.emissions" => [Some(1.0), Some(1.0), Some(0.5)],
            "CO2.emissions.non.biogenic." => [Some(10.0), Some(10.0), None],
            "Max.Heat" => [Some(5.0), Some(0.0), None],
        ]
        .unwrap()
    }

    fn column(df: &DataFrame, name: &str) -> Vec<f64> {
        float_values(df, name)
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap())
            .collect()
    }

    #[test]
    fn test_co2_equivalent_scenario() {
        assert_eq!(co2_equivalent(10.0, 2.0, 1.0), 358.0);
        assert_eq!(co2_equivalent(0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_eco_score_regular_heat() {
        assert!((eco_score(358.0, Some(5.0)) - 71.6).abs() < 1e-9);
    }

    #[test]
    fn test_eco_score_zero_heat_is_finite() {
        let score = eco_score(358.0, Some(0.0));
        assert!((score - 3.58e12).abs() < 1.0);
        assert_ne!(score, ECO_SCORE_SENTINEL);
    }

    #[test]
    fn test_eco_score_sentinels() {
        assert_eq!(eco_score(358.0, None), ECO_SCORE_SENTINEL);
        assert_eq!(eco_score(f64::MAX, Some(1e-300)), ECO_SCORE_SENTINEL);
        assert_eq!(eco_score(0.0, Some(0.0)), 0.0);
    }

    #[test]
    fn test_process_appends_derived_columns() {
        let output = Preprocessor::default().process(raw_frame()).unwrap();
        let df = &output.data;

        for name in crate::schema::DERIVED_COLUMNS {
            assert!(df.column(name).is_ok(), "missing {name}");
        }
        assert_eq!(column(df, CO2_EQ_EMISSIONS), vec![358.0, 358.0, 149.0]);
        assert_eq!(column(df, CH4_EMISSIONS), vec![2.0, 2.0, 0.0]);
        assert_eq!(column(df, CO2_EMISSIONS), vec![10.0, 10.0, 0.0]);

        let scores = column(df, ECO_SCORE);
        assert!((scores[0] - 71.6).abs() < 1e-9);
        assert!((scores[1] - 3.58e12).abs() < 1.0);
        assert_eq!(scores[2], ECO_SCORE_SENTINEL);
        verify_derived_columns(df).unwrap();
    }

    #[test]
    fn test_process_summary_counts() {
        let summary = Preprocessor::default().process(raw_frame()).unwrap().summary;
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.zero_heat_rows, 1);
        assert_eq!(summary.sentinel_rows, 1);
        assert_eq!(summary.filled_nulls["Methane.emissions"], 1);
        assert_eq!(summary.filled_nulls["Nitrous.Oxide.emissions"], 0);
    }

    #[test]
    fn test_process_fills_raw_gas_columns() {
        let df = Preprocessor::default().process(raw_frame()).unwrap().data;
        assert_eq!(column(&df, "Methane.emissions"), vec![2.0, 2.0, 0.0]);

        let keep_raw = PreprocessConfig::builder()
            .fill_gas_columns_in_place(false)
            .build()
            .unwrap();
        let df = Preprocessor::new(keep_raw).process(raw_frame()).unwrap().data;
        assert_eq!(df.column("Methane.emissions").unwrap().null_count(), 1);
    }

    #[test]
    fn test_process_missing_column_is_fatal() {
        let df = raw_frame().drop("Nitrous.Oxide.emissions").unwrap();
        let err = Preprocessor::default().process(df).unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    }

    #[test]
    fn test_process_negative_quantity_is_fatal() {
        let mut df = raw_frame();
        df.replace("Max.Heat", Series::new("Max.Heat".into(), [5.0, -1.0, 2.0]))
            .unwrap();
        let err = Preprocessor::default().process(df).unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_VALUE");
    }

    #[test]
    fn test_process_with_custom_schema() {
        let df = raw_frame()
            .rename("Max.Heat", "Heat".into())
            .unwrap()
            .clone();
        let config = PreprocessConfig::builder()
            .schema(SchemaConfig::builder().heat_output("Heat").build().unwrap())
            .build()
            .unwrap();
        let output = Preprocessor::new(config).process(df).unwrap();
        assert_eq!(output.data.height(), 3);
    }
}
