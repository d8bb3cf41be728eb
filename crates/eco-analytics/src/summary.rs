//! Scalar summaries and per-year series over filtered observations.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{AnalyticsError, Result};
use crate::filters::Observation;

/// The year with the highest single observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeakYear {
    pub year: i32,
    pub value: f64,
}

/// Headline figures for the filtered set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmissionSummary {
    pub total: f64,
    pub peak: PeakYear,
    /// Mean first difference of the year-ordered observations; `None` with fewer than two.
    pub average_annual_change: Option<f64>,
    pub observations: usize,
}

impl EmissionSummary {
    /// Compute total, peak, and average annual change.
    ///
    /// Observations are stably sorted by year first, so the result does not
    /// depend on the order the filters produced. Among equal maxima the
    /// earliest year wins.
    pub fn from_observations(observations: &[Observation<'_>]) -> Result<Self> {
        let mut ordered: Vec<&Observation<'_>> = observations.iter().collect();
        ordered.sort_by_key(|o| o.year);

        let Some(first) = ordered.first() else {
            return Err(AnalyticsError::NoData(
                "no observations to summarize".to_string(),
            ));
        };

        let total = ordered.iter().map(|o| o.value).sum();

        let mut peak = PeakYear {
            year: first.year,
            value: first.value,
        };
        for obs in &ordered[1..] {
            if obs.value > peak.value {
                peak = PeakYear {
                    year: obs.year,
                    value: obs.value,
                };
            }
        }

        let diffs: Vec<f64> = ordered
            .windows(2)
            .map(|pair| pair[1].value - pair[0].value)
            .collect();
        let average_annual_change = if diffs.is_empty() {
            None
        } else {
            Some(diffs.iter().sum::<f64>() / diffs.len() as f64)
        };

        Ok(Self {
            total,
            peak,
            average_annual_change,
            observations: ordered.len(),
        })
    }
}

/// A summed value for one year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearTotal {
    pub year: i32,
    pub total: f64,
}

/// Per-year totals in ascending year order, ready for a line chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    pub points: Vec<YearTotal>,
}

impl TimeSeries {
    /// Sum observation values per year.
    pub fn from_observations(observations: &[Observation<'_>]) -> Result<Self> {
        Self::from_pairs(observations.iter().map(|o| (o.year, o.value)))
    }

    /// Sum `(year, value)` pairs per year.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (i32, f64)>) -> Result<Self> {
        let mut by_year: BTreeMap<i32, f64> = BTreeMap::new();
        for (year, value) in pairs {
            *by_year.entry(year).or_insert(0.0) += value;
        }
        if by_year.is_empty() {
            return Err(AnalyticsError::NoData(
                "no observations for a time series".to_string(),
            ));
        }

        Ok(Self {
            points: by_year
                .into_iter()
                .map(|(year, total)| YearTotal { year, total })
                .collect(),
        })
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.points.iter().map(|p| p.year)
    }

    pub fn total(&self) -> f64 {
        self.points.iter().map(|p| p.total).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(year: i32, value: f64) -> Observation<'static> {
        Observation {
            facility_name: "ABBVIE LTD.",
            sector: "Pharmaceuticals",
            year,
            value,
        }
    }

    #[test]
    fn test_summary_total_and_peak() {
        let summary = EmissionSummary::from_observations(&[
            obs(2016, 30.0),
            obs(2015, 10.0),
            obs(2017, 20.0),
        ])
        .unwrap();

        assert_eq!(summary.total, 60.0);
        assert_eq!(summary.peak, PeakYear { year: 2016, value: 30.0 });
        assert_eq!(summary.observations, 3);
    }

    #[test]
    fn test_average_change_is_order_independent() {
        let shuffled = [obs(2017, 40.0), obs(2015, 10.0), obs(2016, 20.0)];
        let sorted = [obs(2015, 10.0), obs(2016, 20.0), obs(2017, 40.0)];

        let a = EmissionSummary::from_observations(&shuffled).unwrap();
        let b = EmissionSummary::from_observations(&sorted).unwrap();

        // (20 - 10 + 40 - 20) / 2
        assert_eq!(a.average_annual_change, Some(15.0));
        assert_eq!(a, b);
    }

    #[test]
    fn test_single_observation_has_no_change() {
        let summary = EmissionSummary::from_observations(&[obs(2015, 7.0)]).unwrap();
        assert_eq!(summary.average_annual_change, None);
        assert_eq!(summary.peak.year, 2015);
    }

    #[test]
    fn test_peak_ties_take_earliest_year() {
        let summary =
            EmissionSummary::from_observations(&[obs(2018, 5.0), obs(2016, 5.0)]).unwrap();
        assert_eq!(summary.peak.year, 2016);
    }

    #[test]
    fn test_empty_summary_is_no_data() {
        let err = EmissionSummary::from_observations(&[]).unwrap_err();
        assert_eq!(err.error_code(), "NO_DATA");
    }

    #[test]
    fn test_time_series_sums_per_year_ascending() {
        let series = TimeSeries::from_observations(&[
            obs(2017, 1.0),
            obs(2015, 2.0),
            obs(2017, 3.0),
        ])
        .unwrap();

        assert_eq!(
            series.points,
            vec![
                YearTotal { year: 2015, total: 2.0 },
                YearTotal { year: 2017, total: 4.0 },
            ]
        );
        assert_eq!(series.total(), 6.0);
        assert_eq!(series.years().collect::<Vec<_>>(), vec![2015, 2017]);
    }

    #[test]
    fn test_empty_time_series_is_no_data() {
        assert!(TimeSeries::from_pairs(Vec::new()).unwrap_err().is_empty_result());
    }
}
