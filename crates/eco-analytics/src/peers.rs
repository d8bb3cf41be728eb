//! Sector peer comparison.
//!
//! The facility a query selected is compared with the largest emitters of its
//! sector over the whole dataset; the year filter does not apply here.

use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::dataset::EmissionRecord;
use crate::error::{AnalyticsError, Result};
use crate::filters::EmissionType;

/// How an entry is drawn in the comparison chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Highlight {
    Selected,
    Other,
}

/// A facility and its summed emissions within the sector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeerEntry {
    pub facility_name: String,
    pub total: f64,
    pub highlight: Highlight,
}

/// Ranked peers of the selected facility.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeerComparison {
    pub sector: String,
    pub emission: EmissionType,
    pub selected_facility: String,
    /// Descending by total; the selected facility is appended last when it
    /// falls outside the top entries.
    pub entries: Vec<PeerEntry>,
}

impl PeerComparison {
    /// Position of the selected facility in `entries`.
    pub fn selected_position(&self) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.highlight == Highlight::Selected)
    }
}

/// The first record of a filtered set, which fixes the selected facility and its sector.
pub fn selected_record<'a>(
    filtered: &[&'a EmissionRecord],
    needle: &str,
) -> Result<&'a EmissionRecord> {
    filtered
        .first()
        .copied()
        .ok_or_else(|| AnalyticsError::NoMatchingFacility(needle.to_string()))
}

/// Sum `emission` per facility over `records` and sort descending.
///
/// Equal totals are ordered by facility name so the ranking is deterministic.
pub fn rank_facilities<'a>(
    records: impl IntoIterator<Item = &'a EmissionRecord>,
    emission: EmissionType,
) -> Vec<(&'a str, f64)> {
    let mut totals: HashMap<&'a str, f64> = HashMap::new();
    for record in records {
        *totals.entry(record.facility_name.as_str()).or_insert(0.0) += emission.value(record);
    }

    let mut ranked: Vec<(&str, f64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
}

/// Rank the sector peers of `selected` over `records`.
///
/// The top `limit` facilities are kept; if `selected` is not among them it is
/// appended as one more entry.
pub fn compare_peers(
    records: &[EmissionRecord],
    selected: &EmissionRecord,
    emission: EmissionType,
    limit: usize,
) -> PeerComparison {
    let sector = selected.sector.as_str();
    let ranked = rank_facilities(records.iter().filter(|r| r.sector == sector), emission);
    debug!(
        "Ranking {} facilities in sector '{}' by {}",
        ranked.len(),
        sector,
        emission
    );

    let tag = |name: &str| {
        if name == selected.facility_name {
            Highlight::Selected
        } else {
            Highlight::Other
        }
    };

    let mut entries: Vec<PeerEntry> = ranked
        .iter()
        .take(limit)
        .map(|&(name, total)| PeerEntry {
            facility_name: name.to_string(),
            total,
            highlight: tag(name),
        })
        .collect();

    if !entries.iter().any(|e| e.highlight == Highlight::Selected)
        && let Some(&(name, total)) = ranked
            .iter()
            .find(|(name, _)| *name == selected.facility_name)
    {
        entries.push(PeerEntry {
            facility_name: name.to_string(),
            total,
            highlight: Highlight::Selected,
        });
    }

    PeerComparison {
        sector: selected.sector.clone(),
        emission,
        selected_facility: selected.facility_name.clone(),
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(name: &str, sector: &str, year: i32, co2: f64) -> EmissionRecord {
        EmissionRecord {
            facility_name: name.to_string(),
            sector: sector.to_string(),
            year,
            state: None,
            city: None,
            co2,
            ch4: 0.0,
            n2o: 0.0,
            co2_eq: co2,
            eco_score: 0.0,
            heat_output: None,
        }
    }

    /// Twelve energy facilities, "PLANT 01" the largest, plus a small selected one.
    fn sector_records() -> Vec<EmissionRecord> {
        let mut records: Vec<EmissionRecord> = (1..=12)
            .map(|i| record(&format!("PLANT {:02}", i), "Energy", 2015, 1000.0 - i as f64))
            .collect();
        records.push(record("TINY CO.", "Energy", 2015, 1.0));
        records.push(record("TINY CO.", "Energy", 2016, 2.0));
        records.push(record("CHEM CO.", "Chemicals", 2015, 99999.0));
        records
    }

    #[test]
    fn test_selected_record_empty_is_no_match() {
        let err = selected_record(&[], "XYZ").unwrap_err();
        assert_eq!(err.error_code(), "NO_MATCHING_FACILITY");
        assert!(err.is_empty_result());
    }

    #[test]
    fn test_rank_facilities_sums_and_breaks_ties_by_name() {
        let records = vec![
            record("B", "Energy", 2015, 5.0),
            record("A", "Energy", 2015, 5.0),
            record("C", "Energy", 2015, 1.0),
            record("C", "Energy", 2016, 9.0),
        ];
        let ranked = rank_facilities(&records, EmissionType::Co2);
        assert_eq!(ranked, vec![("C", 10.0), ("A", 5.0), ("B", 5.0)]);
    }

    #[test]
    fn test_selected_outside_top_is_appended() {
        let records = sector_records();
        let selected = &records[12];
        let comparison = compare_peers(&records, selected, EmissionType::Co2, 10);

        assert_eq!(comparison.sector, "Energy");
        assert_eq!(comparison.entries.len(), 11);
        assert_eq!(comparison.entries[0].facility_name, "PLANT 01");
        let last = comparison.entries.last().unwrap();
        assert_eq!(last.facility_name, "TINY CO.");
        assert_eq!(last.total, 3.0);
        assert_eq!(last.highlight, Highlight::Selected);
        assert_eq!(comparison.selected_position(), Some(10));

        // Other sectors never leak in.
        assert!(comparison.entries.iter().all(|e| e.facility_name != "CHEM CO."));
    }

    #[test]
    fn test_selected_inside_top_is_not_duplicated() {
        let records = sector_records();
        let selected = &records[2]; // PLANT 03
        let comparison = compare_peers(&records, selected, EmissionType::Co2, 10);

        assert_eq!(comparison.entries.len(), 10);
        assert_eq!(comparison.selected_position(), Some(2));
        let selected_count = comparison
            .entries
            .iter()
            .filter(|e| e.highlight == Highlight::Selected)
            .count();
        assert_eq!(selected_count, 1);
    }

    #[test]
    fn test_ranking_is_deterministic() {
        let records = sector_records();
        let first = compare_peers(&records, &records[12], EmissionType::Co2, 10);
        let second = compare_peers(&records, &records[12], EmissionType::Co2, 10);
        assert_eq!(first, second);
    }
}
