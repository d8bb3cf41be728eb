//! Pivoting observations into a facility × year table.

use polars::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{AnalyticsError, Result};
use crate::filters::Observation;

/// One (facility, sector) row of a pivot table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRow {
    pub facility_name: String,
    pub sector: String,
    /// One value per entry of [`PivotTable::years`]; zero where nothing was reported.
    pub values: Vec<f64>,
}

impl PivotRow {
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }
}

/// Observations reshaped to one row per (facility, sector) and one column per year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable {
    pub years: Vec<i32>,
    pub rows: Vec<PivotRow>,
}

impl PivotTable {
    /// Reshape observations. Rows and year columns are sorted ascending;
    /// several observations for the same cell are summed.
    pub fn from_observations(observations: &[Observation<'_>]) -> Result<Self> {
        if observations.is_empty() {
            return Err(AnalyticsError::NoData("nothing to pivot".to_string()));
        }

        let years: BTreeSet<i32> = observations.iter().map(|o| o.year).collect();
        let years: Vec<i32> = years.into_iter().collect();

        let mut cells: BTreeMap<(&str, &str), BTreeMap<i32, f64>> = BTreeMap::new();
        for obs in observations {
            *cells
                .entry((obs.facility_name, obs.sector))
                .or_default()
                .entry(obs.year)
                .or_insert(0.0) += obs.value;
        }

        let rows = cells
            .into_iter()
            .map(|((facility, sector), by_year)| PivotRow {
                facility_name: facility.to_string(),
                sector: sector.to_string(),
                values: years
                    .iter()
                    .map(|year| by_year.get(year).copied().unwrap_or(0.0))
                    .collect(),
            })
            .collect();

        Ok(Self { years, rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell value for a facility/sector/year, if the row and column exist.
    pub fn value(&self, facility_name: &str, sector: &str, year: i32) -> Option<f64> {
        let col = self.years.iter().position(|&y| y == year)?;
        self.rows
            .iter()
            .find(|r| r.facility_name == facility_name && r.sector == sector)
            .map(|r| r.values[col])
    }

    /// Convert to a DataFrame with `Facility`, `Sector`, then one column per year.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(self.years.len() + 2);
        columns.push(Column::from(Series::new(
            "Facility".into(),
            self.rows
                .iter()
                .map(|r| r.facility_name.as_str())
                .collect::<Vec<_>>(),
        )));
        columns.push(Column::from(Series::new(
            "Sector".into(),
            self.rows.iter().map(|r| r.sector.as_str()).collect::<Vec<_>>(),
        )));

        for (idx, year) in self.years.iter().enumerate() {
            let values: Vec<f64> = self.rows.iter().map(|r| r.values[idx]).collect();
            columns.push(Column::from(Series::new(year.to_string().into(), values)));
        }

        Ok(DataFrame::new(columns)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(facility: &'static str, year: i32, value: f64) -> Observation<'static> {
        Observation {
            facility_name: facility,
            sector: "Energy",
            year,
            value,
        }
    }

    #[test]
    fn test_pivot_fills_missing_with_zero() {
        let table = PivotTable::from_observations(&[
            obs("B PLANT", 2016, 3.0),
            obs("A PLANT", 2015, 1.0),
            obs("A PLANT", 2016, 2.0),
        ])
        .unwrap();

        assert_eq!(table.years, vec![2015, 2016]);
        assert_eq!(table.rows[0].facility_name, "A PLANT");
        assert_eq!(table.rows[0].values, vec![1.0, 2.0]);
        assert_eq!(table.rows[1].values, vec![0.0, 3.0]);
        assert_eq!(table.value("B PLANT", "Energy", 2015), Some(0.0));
        assert_eq!(table.value("B PLANT", "Energy", 2030), None);
    }

    #[test]
    fn test_pivot_row_total_matches_observation_sum() {
        let observations = vec![
            obs("A PLANT", 2015, 1.5),
            obs("A PLANT", 2015, 2.5),
            obs("A PLANT", 2017, 4.0),
            obs("B PLANT", 2016, 9.0),
        ];
        let table = PivotTable::from_observations(&observations).unwrap();

        for row in &table.rows {
            let expected: f64 = observations
                .iter()
                .filter(|o| o.facility_name == row.facility_name)
                .map(|o| o.value)
                .sum();
            assert_eq!(row.total(), expected);
        }
    }

    #[test]
    fn test_pivot_empty_is_no_data() {
        let err = PivotTable::from_observations(&[]).unwrap_err();
        assert!(err.is_empty_result());
    }

    #[test]
    fn test_pivot_to_dataframe() {
        let table =
            PivotTable::from_observations(&[obs("A PLANT", 2015, 1.0), obs("B PLANT", 2016, 2.0)])
                .unwrap();
        let df = table.to_dataframe().unwrap();
        assert_eq!(df.shape(), (2, 4));
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, vec!["Facility", "Sector", "2015", "2016"]);
    }
}
