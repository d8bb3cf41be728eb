//! Dashboard queries over a loaded dataset.
//!
//! [`Dashboard::company`] runs the full company pipeline. Each view is wrapped
//! in a [`Section`], so an empty filter result becomes a placeholder for that
//! view instead of failing the whole dashboard. Real errors still propagate.

use eco_processing::SchemaConfig;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::dataset::EmissionsDataset;
use crate::error::Result;
use crate::filters::{CompanyQuery, select_emission};
use crate::location::{LocationDashboard, LocationQuery};
use crate::peers::{PeerComparison, compare_peers, selected_record};
use crate::pivot::PivotTable;
use crate::summary::{EmissionSummary, TimeSeries};

/// A dashboard view, or the reason it has nothing to show.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Section<T> {
    Ready(T),
    Empty { code: String, message: String },
}

impl<T> Section<T> {
    /// Turn an empty-result error into [`Section::Empty`]; other errors pass through.
    pub fn from_result(result: Result<T>) -> Result<Self> {
        match result {
            Ok(view) => Ok(Self::Ready(view)),
            Err(e) if e.is_empty_result() => {
                debug!("Section is empty: {}", e);
                Ok(Self::Empty {
                    code: e.error_code().to_string(),
                    message: e.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(view) => Some(view),
            Self::Empty { .. } => None,
        }
    }
}

/// Every view of the company dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyDashboard {
    pub query: CompanyQuery,
    pub pivot: Section<PivotTable>,
    pub peers: Section<PeerComparison>,
    pub summary: Section<EmissionSummary>,
    pub time_series: Section<TimeSeries>,
}

/// Query entry point over one immutable dataset.
#[derive(Debug, Clone)]
pub struct Dashboard {
    dataset: EmissionsDataset,
}

static_assertions::assert_impl_all!(Dashboard: Send, Sync);

impl Dashboard {
    pub fn new(dataset: EmissionsDataset) -> Self {
        Self { dataset }
    }

    /// Load a processed CSV and wrap it.
    pub fn load(path: impl AsRef<Path>, schema: &SchemaConfig) -> Result<Self> {
        Ok(Self::new(EmissionsDataset::load(path, schema)?))
    }

    pub fn dataset(&self) -> &EmissionsDataset {
        &self.dataset
    }

    /// Run the company pipeline for `query`.
    pub fn company(&self, query: &CompanyQuery) -> Result<CompanyDashboard> {
        info!(
            "Company query: name='{}', years={}, emission={}",
            query.name, query.years, query.emission
        );

        let filtered = query.apply(self.dataset.records());
        if filtered.is_empty() {
            warn!("No records match '{}' in {}", query.name, query.years);
        }
        let observations = select_emission(&filtered, query.emission);

        let pivot = Section::from_result(PivotTable::from_observations(&observations))?;
        let peers = Section::from_result(selected_record(&filtered, &query.name).map(|selected| {
            compare_peers(
                self.dataset.records(),
                selected,
                query.emission,
                query.peer_limit,
            )
        }))?;
        let summary = Section::from_result(EmissionSummary::from_observations(&observations))?;
        let time_series = Section::from_result(TimeSeries::from_observations(&observations))?;

        Ok(CompanyDashboard {
            query: query.clone(),
            pivot,
            peers,
            summary,
            time_series,
        })
    }

    /// Run the location variant for `query`.
    ///
    /// An empty result is returned as [`Section::Empty`]; an unusable filter
    /// is an error.
    pub fn location(&self, query: &LocationQuery) -> Result<Section<LocationDashboard>> {
        info!(
            "Location query: state='{}', city='{}'",
            query.state, query.city
        );
        Section::from_result(LocationDashboard::build(&self.dataset, query))
    }
}

impl From<EmissionsDataset> for Dashboard {
    fn from(dataset: EmissionsDataset) -> Self {
        Self::new(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::EmissionRecord;
    use crate::error::AnalyticsError;
    use crate::filters::EmissionType;
    use crate::peers::Highlight;

    fn record(name: &str, sector: &str, year: i32, co2: f64) -> EmissionRecord {
        EmissionRecord {
            facility_name: name.to_string(),
            sector: sector.to_string(),
            year,
            state: Some("IL".to_string()),
            city: Some("North Chicago".to_string()),
            co2,
            ch4: 1.0,
            n2o: 0.5,
            co2_eq: co2 + 25.0 + 149.0,
            eco_score: 2.0,
            heat_output: Some(10.0),
        }
    }

    fn dashboard() -> Dashboard {
        Dashboard::new(EmissionsDataset::from_records(vec![
            record("ABBVIE LTD.", "Pharmaceuticals", 2017, 100.0),
            record("ABBVIE LTD.", "Pharmaceuticals", 2018, 80.0),
            record("ABBVIE LTD.", "Pharmaceuticals", 2019, 120.0),
            record("PFIZER INC.", "Pharmaceuticals", 2018, 300.0),
            record("STEEL WORKS", "Metals", 2018, 900.0),
        ]))
    }

    #[test]
    fn test_company_dashboard_all_sections_ready() {
        let query = CompanyQuery::builder().name("abbvie").build().unwrap();
        let result = dashboard().company(&query).unwrap();

        let pivot = result.pivot.ready().unwrap();
        assert_eq!(pivot.years, vec![2017, 2018, 2019]);
        assert_eq!(pivot.rows.len(), 1);

        let summary = result.summary.ready().unwrap();
        assert_eq!(summary.total, 300.0);
        assert_eq!(summary.peak.year, 2019);
        assert_eq!(summary.average_annual_change, Some(10.0));

        let peers = result.peers.ready().unwrap();
        assert_eq!(peers.sector, "Pharmaceuticals");
        assert_eq!(peers.entries[0].facility_name, "ABBVIE LTD.");
        assert_eq!(peers.entries[0].highlight, Highlight::Selected);
        assert_eq!(peers.entries.len(), 2);
    }

    #[test]
    fn test_unknown_facility_gives_placeholders() {
        let query = CompanyQuery::builder().name("XYZ").build().unwrap();
        let result = dashboard().company(&query).unwrap();

        assert!(!result.pivot.is_ready());
        assert!(!result.summary.is_ready());
        match &result.peers {
            Section::Empty { code, .. } => assert_eq!(code, "NO_MATCHING_FACILITY"),
            other => panic!("expected empty peers, got {:?}", other),
        }
    }

    #[test]
    fn test_year_range_without_data_is_no_data() {
        let query = CompanyQuery::builder()
            .name("ABBVIE")
            .years(2030, 2031)
            .build()
            .unwrap();
        let result = dashboard().company(&query).unwrap();
        match &result.time_series {
            Section::Empty { code, .. } => assert_eq!(code, "NO_DATA"),
            other => panic!("expected empty time series, got {:?}", other),
        }
    }

    #[test]
    fn test_emission_type_switches_values() {
        let query = CompanyQuery::builder()
            .name("ABBVIE")
            .emission(EmissionType::Ch4)
            .build()
            .unwrap();
        let result = dashboard().company(&query).unwrap();
        assert_eq!(result.summary.ready().unwrap().total, 3.0);
    }

    #[test]
    fn test_location_unusable_filter_is_error() {
        let dashboard = Dashboard::new(EmissionsDataset::from_records(vec![EmissionRecord {
            state: None,
            city: None,
            ..record("A", "Energy", 2015, 1.0)
        }]));
        let query = LocationQuery::builder().city("Austin").build().unwrap();
        assert!(dashboard.location(&query).is_err());
    }

    #[test]
    fn test_location_empty_is_placeholder() {
        let query = LocationQuery::builder().state("CA").build().unwrap();
        let section = dashboard().location(&query).unwrap();
        assert!(!section.is_ready());
    }

    #[test]
    fn test_section_serialization_is_tagged() {
        let section: Section<u32> = Section::Ready(3);
        assert_eq!(
            serde_json::to_string(&section).unwrap(),
            r#"{"status":"ready","data":3}"#
        );
        let empty: Section<u32> =
            Section::from_result(Err(AnalyticsError::NoData("nothing".into()))).unwrap();
        let json = serde_json::to_string(&empty).unwrap();
        assert!(json.contains(r#""status":"empty""#));
        assert!(json.contains("NO_DATA"));
    }
}
