//! The location variant of the dashboard.
//!
//! Records are narrowed by state and city substrings and then summarized into
//! a per-year CO2 series, a CO2e histogram, a per-sector breakdown and a
//! scatter view over two chosen axes. There is no peer ranking here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::dataset::{EmissionRecord, EmissionsDataset};
use crate::error::{AnalyticsError, Result};
use crate::filters::name_matches;
use crate::summary::TimeSeries;

/// Default number of histogram bins.
pub const DEFAULT_HISTOGRAM_BINS: usize = 20;

/// A numeric field that can be put on a scatter axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScatterAxis {
    Year,
    Co2,
    Ch4,
    N2o,
    Co2Eq,
    EcoScore,
    HeatOutput,
}

impl ScatterAxis {
    /// The axis value for a record, `None` when the record does not carry it.
    pub fn value(&self, record: &EmissionRecord) -> Option<f64> {
        match self {
            Self::Year => Some(f64::from(record.year)),
            Self::Co2 => Some(record.co2),
            Self::Ch4 => Some(record.ch4),
            Self::N2o => Some(record.n2o),
            Self::Co2Eq => Some(record.co2_eq),
            Self::EcoScore => Some(record.eco_score),
            Self::HeatOutput => record.heat_output,
        }
    }
}

impl fmt::Display for ScatterAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Year => "Year",
            Self::Co2 => "CO2 emissions",
            Self::Ch4 => "CH4 emissions",
            Self::N2o => "N2O emissions",
            Self::Co2Eq => "CO2e emissions",
            Self::EcoScore => "Eco Score",
            Self::HeatOutput => "Heat output",
        };
        f.write_str(label)
    }
}

/// Criteria for the location dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationQuery {
    /// State substring; empty means no state filter.
    pub state: String,
    /// City substring; empty means no city filter.
    pub city: String,
    pub histogram_bins: usize,
    pub scatter_x: ScatterAxis,
    pub scatter_y: ScatterAxis,
}

impl Default for LocationQuery {
    fn default() -> Self {
        Self {
            state: String::new(),
            city: String::new(),
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            scatter_x: ScatterAxis::HeatOutput,
            scatter_y: ScatterAxis::Co2Eq,
        }
    }
}

impl LocationQuery {
    pub fn builder() -> LocationQueryBuilder {
        LocationQueryBuilder::default()
    }
}

/// Builder for [`LocationQuery`].
#[derive(Debug, Default)]
pub struct LocationQueryBuilder {
    state: Option<String>,
    city: Option<String>,
    histogram_bins: Option<usize>,
    scatter_x: Option<ScatterAxis>,
    scatter_y: Option<ScatterAxis>,
}

impl LocationQueryBuilder {
    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn histogram_bins(mut self, bins: usize) -> Self {
        self.histogram_bins = Some(bins);
        self
    }

    pub fn scatter_axes(mut self, x: ScatterAxis, y: ScatterAxis) -> Self {
        self.scatter_x = Some(x);
        self.scatter_y = Some(y);
        self
    }

    pub fn build(self) -> Result<LocationQuery> {
        let defaults = LocationQuery::default();
        let histogram_bins = self.histogram_bins.unwrap_or(defaults.histogram_bins);
        if histogram_bins == 0 {
            return Err(AnalyticsError::InvalidFilter(
                "histogram needs at least one bin".to_string(),
            ));
        }

        Ok(LocationQuery {
            state: self.state.unwrap_or_default(),
            city: self.city.unwrap_or_default(),
            histogram_bins,
            scatter_x: self.scatter_x.unwrap_or(defaults.scatter_x),
            scatter_y: self.scatter_y.unwrap_or(defaults.scatter_y),
        })
    }
}

/// Keep records whose state and city contain the query substrings.
///
/// A non-empty filter on a column the dataset does not have is an error
/// rather than a silent "match nothing".
pub fn filter_by_location<'a>(
    dataset: &'a EmissionsDataset,
    state: &str,
    city: &str,
) -> Result<Vec<&'a EmissionRecord>> {
    if !state.is_empty() && !dataset.has_state() {
        return Err(AnalyticsError::ColumnNotFound("state".to_string()));
    }
    if !city.is_empty() && !dataset.has_city() {
        return Err(AnalyticsError::ColumnNotFound("city".to_string()));
    }

    let field_matches = |value: &Option<String>, needle: &str| {
        needle.is_empty() || value.as_deref().is_some_and(|v| name_matches(v, needle))
    };

    Ok(dataset
        .records()
        .iter()
        .filter(|r| field_matches(&r.state, state) && field_matches(&r.city, city))
        .collect())
}

/// Histogram bin over `[start, end)`; the last bin also holds `end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Fixed-width distribution of a set of values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub bins: Vec<HistogramBin>,
}

impl Histogram {
    /// Split `[min, max]` of `values` into `bins` equal-width bins.
    ///
    /// When every value is equal there is a single bin holding all of them.
    pub fn build(values: &[f64], bins: usize) -> Result<Self> {
        if bins == 0 {
            return Err(AnalyticsError::InvalidFilter(
                "histogram needs at least one bin".to_string(),
            ));
        }
        let Some(&first) = values.first() else {
            return Err(AnalyticsError::NoData("no values to bin".to_string()));
        };

        let (min, max) = values
            .iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if (max - min).abs() < f64::EPSILON {
            return Ok(Self {
                bins: vec![HistogramBin {
                    start: min,
                    end: max,
                    count: values.len(),
                }],
            });
        }

        let width = (max - min) / bins as f64;
        let mut counts = vec![0usize; bins];
        for value in values {
            let index = (((value - min) / width) as usize).min(bins - 1);
            counts[index] += 1;
        }

        Ok(Self {
            bins: counts
                .into_iter()
                .enumerate()
                .map(|(idx, count)| HistogramBin {
                    start: min + idx as f64 * width,
                    end: min + (idx as f64 + 1.0) * width,
                    count,
                })
                .collect(),
        })
    }

    pub fn total_count(&self) -> usize {
        self.bins.iter().map(|b| b.count).sum()
    }
}

/// CO2e summed over one sector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorTotal {
    pub sector: String,
    pub co2_eq_total: f64,
    /// Distinct facilities contributing to the total.
    pub facilities: usize,
}

/// Sum CO2e per sector, largest first; equal totals are ordered by sector name.
pub fn sector_breakdown<'a>(
    records: impl IntoIterator<Item = &'a EmissionRecord>,
) -> Vec<SectorTotal> {
    let mut by_sector: HashMap<&str, (f64, Vec<&str>)> = HashMap::new();
    for record in records {
        let entry = by_sector.entry(record.sector.as_str()).or_default();
        entry.0 += record.co2_eq;
        if !entry.1.contains(&record.facility_name.as_str()) {
            entry.1.push(record.facility_name.as_str());
        }
    }

    let mut totals: Vec<SectorTotal> = by_sector
        .into_iter()
        .map(|(sector, (total, facilities))| SectorTotal {
            sector: sector.to_string(),
            co2_eq_total: total,
            facilities: facilities.len(),
        })
        .collect();
    totals.sort_by(|a, b| {
        b.co2_eq_total
            .total_cmp(&a.co2_eq_total)
            .then_with(|| a.sector.cmp(&b.sector))
    });
    totals
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub facility_name: String,
    /// Used by the renderer to color points.
    pub sector: String,
    pub x: f64,
    pub y: f64,
}

/// Points for two chosen axes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterView {
    pub x_axis: ScatterAxis,
    pub y_axis: ScatterAxis,
    pub points: Vec<ScatterPoint>,
    /// Records left out because they lack a value on either axis.
    pub skipped: usize,
}

impl ScatterView {
    pub fn build<'a>(
        records: impl IntoIterator<Item = &'a EmissionRecord>,
        x_axis: ScatterAxis,
        y_axis: ScatterAxis,
    ) -> Self {
        let mut points = Vec::new();
        let mut skipped = 0;
        for record in records {
            match (x_axis.value(record), y_axis.value(record)) {
                (Some(x), Some(y)) => points.push(ScatterPoint {
                    facility_name: record.facility_name.clone(),
                    sector: record.sector.clone(),
                    x,
                    y,
                }),
                _ => skipped += 1,
            }
        }
        Self {
            x_axis,
            y_axis,
            points,
            skipped,
        }
    }
}

/// Every view of the location dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationDashboard {
    pub query: LocationQuery,
    pub records: usize,
    pub co2_series: TimeSeries,
    pub distribution: Histogram,
    pub sectors: Vec<SectorTotal>,
    pub scatter: ScatterView,
}

impl LocationDashboard {
    /// Filter `dataset` by location and build all views.
    pub fn build(dataset: &EmissionsDataset, query: &LocationQuery) -> Result<Self> {
        let records = filter_by_location(dataset, &query.state, &query.city)?;
        if records.is_empty() {
            return Err(AnalyticsError::NoData(format!(
                "no records for state '{}' and city '{}'",
                query.state, query.city
            )));
        }
        debug!(
            "Location filter kept {} of {} records",
            records.len(),
            dataset.len()
        );

        let co2_series = TimeSeries::from_pairs(records.iter().map(|r| (r.year, r.co2)))?;
        let co2_eq: Vec<f64> = records.iter().map(|r| r.co2_eq).collect();
        let distribution = Histogram::build(&co2_eq, query.histogram_bins)?;
        let sectors = sector_breakdown(records.iter().copied());
        let scatter = ScatterView::build(records.iter().copied(), query.scatter_x, query.scatter_y);

        Ok(Self {
            query: query.clone(),
            records: records.len(),
            co2_series,
            distribution,
            sectors,
            scatter,
        })
    }
}
