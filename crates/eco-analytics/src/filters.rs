//! Query criteria and the filter steps of the company pipeline.
//!
//! Filters are pure functions over borrowed records: they never copy the
//! dataset, and the same inputs always produce the same output order.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::dataset::EmissionRecord;
use crate::error::{AnalyticsError, Result};

/// Which gas a query looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EmissionType {
    #[default]
    #[serde(rename = "CO2")]
    Co2,
    #[serde(rename = "CH4")]
    Ch4,
    #[serde(rename = "N2O")]
    N2o,
}

impl EmissionType {
    pub const ALL: [EmissionType; 3] = [EmissionType::Co2, EmissionType::Ch4, EmissionType::N2o];

    /// Name of the processed column holding this gas.
    pub fn column_name(&self) -> &'static str {
        match self {
            Self::Co2 => eco_processing::CO2_EMISSIONS,
            Self::Ch4 => eco_processing::CH4_EMISSIONS,
            Self::N2o => eco_processing::N2O_EMISSIONS,
        }
    }

    /// The value of this gas in a record.
    #[inline]
    pub fn value(&self, record: &EmissionRecord) -> f64 {
        match self {
            Self::Co2 => record.co2,
            Self::Ch4 => record.ch4,
            Self::N2o => record.n2o,
        }
    }
}

impl fmt::Display for EmissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Co2 => "CO2",
            Self::Ch4 => "CH4",
            Self::N2o => "N2O",
        };
        f.write_str(label)
    }
}

/// Inclusive range of reporting years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawYearRange")]
pub struct YearRange {
    lo: i32,
    hi: i32,
}

/// Unchecked wire form of [`YearRange`].
#[derive(Deserialize)]
struct RawYearRange {
    lo: i32,
    hi: i32,
}

impl TryFrom<RawYearRange> for YearRange {
    type Error = AnalyticsError;

    fn try_from(raw: RawYearRange) -> Result<Self> {
        Self::new(raw.lo, raw.hi)
    }
}

impl YearRange {
    /// Create a range; `lo` must not exceed `hi`.
    pub fn new(lo: i32, hi: i32) -> Result<Self> {
        if lo > hi {
            return Err(AnalyticsError::InvalidFilter(format!(
                "year range start {} is after end {}",
                lo, hi
            )));
        }
        Ok(Self { lo, hi })
    }

    pub fn lo(&self) -> i32 {
        self.lo
    }

    pub fn hi(&self) -> i32 {
        self.hi
    }

    #[inline]
    pub fn contains(&self, year: i32) -> bool {
        (self.lo..=self.hi).contains(&year)
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self { lo: 2010, hi: 2022 }
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.lo, self.hi)
    }
}

/// Case-insensitive substring match; an empty needle matches everything.
pub fn name_matches(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Keep records whose facility name contains `needle`, ignoring case.
pub fn filter_by_name<'a>(
    records: impl IntoIterator<Item = &'a EmissionRecord>,
    needle: &str,
) -> Vec<&'a EmissionRecord> {
    let needle = needle.to_lowercase();
    records
        .into_iter()
        .filter(|r| needle.is_empty() || r.facility_name.to_lowercase().contains(&needle))
        .collect()
}

/// Keep records whose year lies in `years`, bounds included.
pub fn filter_by_years<'a>(
    records: impl IntoIterator<Item = &'a EmissionRecord>,
    years: YearRange,
) -> Vec<&'a EmissionRecord> {
    records
        .into_iter()
        .filter(|r| years.contains(r.year))
        .collect()
}

/// A record projected to the one emission column a query selected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation<'a> {
    pub facility_name: &'a str,
    pub sector: &'a str,
    pub year: i32,
    pub value: f64,
}

/// Project records to facility, sector, year and the selected emission value.
pub fn select_emission<'a>(
    records: &[&'a EmissionRecord],
    emission: EmissionType,
) -> Vec<Observation<'a>> {
    records
        .iter()
        .map(|r| Observation {
            facility_name: &r.facility_name,
            sector: &r.sector,
            year: r.year,
            value: emission.value(r),
        })
        .collect()
}

/// Criteria for the company dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyQuery {
    /// Facility name substring; empty selects every facility.
    pub name: String,
    pub years: YearRange,
    pub emission: EmissionType,
    /// How many facilities the peer ranking shows before the selected one is appended.
    pub peer_limit: usize,
}

impl Default for CompanyQuery {
    fn default() -> Self {
        Self {
            name: "ABBVIE LTD.".to_string(),
            years: YearRange::default(),
            emission: EmissionType::default(),
            peer_limit: 10,
        }
    }
}

impl CompanyQuery {
    pub fn builder() -> CompanyQueryBuilder {
        CompanyQueryBuilder::default()
    }

    /// Records matching the name and year filters, in dataset order.
    pub fn apply<'a>(&self, records: &'a [EmissionRecord]) -> Vec<&'a EmissionRecord> {
        filter_by_years(filter_by_name(records, &self.name), self.years)
    }
}

/// Builder for [`CompanyQuery`] with fluent API.
#[derive(Debug, Default)]
pub struct CompanyQueryBuilder {
    name: Option<String>,
    years: Option<(i32, i32)>,
    emission: Option<EmissionType>,
    peer_limit: Option<usize>,
}

impl CompanyQueryBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the inclusive year range.
    pub fn years(mut self, lo: i32, hi: i32) -> Self {
        self.years = Some((lo, hi));
        self
    }

    pub fn emission(mut self, emission: EmissionType) -> Self {
        self.emission = Some(emission);
        self
    }

    pub fn peer_limit(mut self, limit: usize) -> Self {
        self.peer_limit = Some(limit);
        self
    }

    /// Build the query, validating the year range and peer limit.
    pub fn build(self) -> Result<CompanyQuery> {
        let defaults = CompanyQuery::default();
        let years = match self.years {
            Some((lo, hi)) => YearRange::new(lo, hi)?,
            None => defaults.years,
        };
        let peer_limit = self.peer_limit.unwrap_or(defaults.peer_limit);
        if peer_limit == 0 {
            return Err(AnalyticsError::InvalidFilter(
                "peer limit must be at least 1".to_string(),
            ));
        }

        Ok(CompanyQuery {
            name: self.name.unwrap_or(defaults.name),
            years,
            emission: self.emission.unwrap_or_default(),
            peer_limit,
        })
    }
}
