//! Facility Emissions Analytics Library
//!
//! Query views over a processed facility emissions dataset (the output of
//! `eco_processing`).
//!
//! # Overview
//!
//! The company dashboard runs one pipeline per [`CompanyQuery`]:
//!
//! 1. Filter by facility name substring (case-insensitive)
//! 2. Filter by inclusive year range
//! 3. Project to the selected emission (CO2, CH4 or N2O)
//! 4. Pivot to facility × year
//! 5. Find the sector of the first matching record
//! 6. Rank the sector's facilities, keeping the selected one in view
//! 7. Summarize: total, peak year, average annual change
//! 8. Sum per year for a time series
//!
//! The location dashboard filters by state and city instead and produces a
//! CO2 series, a CO2e histogram, a sector breakdown and a scatter view.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use eco_analytics::{CompanyQuery, Dashboard, EmissionType};
//! use eco_processing::SchemaConfig;
//!
//! let dashboard = Dashboard::load("Processed_Unit.csv", &SchemaConfig::default())?;
//! let query = CompanyQuery::builder()
//!     .name("abbvie")
//!     .years(2015, 2020)
//!     .emission(EmissionType::Ch4)
//!     .build()?;
//!
//! let views = dashboard.company(&query)?;
//! if let Some(summary) = views.summary.ready() {
//!     println!("total {} peaking in {}", summary.total, summary.peak.year);
//! }
//! ```
//!
//! # Empty results
//!
//! A query that selects nothing is not a failure. Each view comes back as a
//! [`Section`], either `Ready` or `Empty { code, message }`.

pub mod dashboard;
pub mod dataset;
pub mod error;
pub mod filters;
pub mod location;
pub mod peers;
pub mod pivot;
pub mod summary;

// Re-exports for convenient access
pub use dashboard::{CompanyDashboard, Dashboard, Section};
pub use dataset::{EmissionRecord, EmissionsDataset};
pub use error::{AnalyticsError, Result, ResultExt};
pub use filters::{
    CompanyQuery, CompanyQueryBuilder, EmissionType, Observation, YearRange, filter_by_name,
    filter_by_years, select_emission,
};
pub use location::{
    DEFAULT_HISTOGRAM_BINS, Histogram, HistogramBin, LocationDashboard, LocationQuery,
    LocationQueryBuilder, ScatterAxis, ScatterPoint, ScatterView, SectorTotal,
    filter_by_location, sector_breakdown,
};
pub use peers::{Highlight, PeerComparison, PeerEntry, compare_peers, rank_facilities};
pub use pivot::{PivotRow, PivotTable};
pub use summary::{EmissionSummary, PeakYear, TimeSeries, YearTotal};
