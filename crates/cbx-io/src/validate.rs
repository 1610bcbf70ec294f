//! Invariant checks over processed datasets.
//!
//! Re-checks what the loader guarantees: one record per
//! (timestamp, partner), the net identity, and explicit (never merged)
//! hourly gaps. Used by both the `validate` and `inspect` surfaces.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDateTime;
use serde::Serialize;

use cbx_core::ProcessedRecord;

/// Tolerance on the `net = export - import` identity.
pub const NET_TOLERANCE: f64 = 1e-6;

/// Per-partner coverage of the hourly sequence.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PartnerCoverage {
    pub rows: usize,
    /// Missing hours between the first and last record.
    pub gap_hours: usize,
    pub first: Option<NaiveDateTime>,
    pub last: Option<NaiveDateTime>,
}

/// Outcome of validating one processed dataset.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub rows: usize,
    pub duplicate_keys: usize,
    pub net_mismatches: usize,
    pub min_net_mw: Option<f64>,
    pub max_net_mw: Option<f64>,
    pub partners: BTreeMap<String, PartnerCoverage>,
}

impl ValidationReport {
    /// True when the dataset upholds the ingestion invariants. Gaps are
    /// reported but legal: they are explicit missing rows.
    pub fn is_clean(&self) -> bool {
        self.duplicate_keys == 0 && self.net_mismatches == 0
    }
}

/// Validate `records` against the processed-dataset invariants.
pub fn validate_processed(records: &[ProcessedRecord]) -> ValidationReport {
    let mut report = ValidationReport {
        rows: records.len(),
        ..Default::default()
    };

    let mut seen: HashSet<(NaiveDateTime, &str)> = HashSet::new();
    let mut per_partner: BTreeMap<&str, Vec<NaiveDateTime>> = BTreeMap::new();
    for record in records {
        if !seen.insert((record.timestamp, record.partner.as_str())) {
            report.duplicate_keys += 1;
        }
        if (record.net_mw - (record.export_mw - record.import_mw)).abs() > NET_TOLERANCE {
            report.net_mismatches += 1;
        }
        per_partner
            .entry(record.partner.as_str())
            .or_default()
            .push(record.timestamp);
    }

    // The net range follows the overall series when present, else all rows.
    let total_nets: Vec<f64> = records
        .iter()
        .filter(|r| r.is_total())
        .map(|r| r.net_mw)
        .collect();
    let nets: Vec<f64> = if total_nets.is_empty() {
        records.iter().map(|r| r.net_mw).collect()
    } else {
        total_nets
    };
    report.min_net_mw = nets.iter().copied().reduce(f64::min);
    report.max_net_mw = nets.iter().copied().reduce(f64::max);

    for (partner, mut timestamps) in per_partner {
        timestamps.sort_unstable();
        let mut gap_hours = 0usize;
        for pair in timestamps.windows(2) {
            let hours = pair[1].signed_duration_since(pair[0]).num_hours();
            if hours > 1 {
                gap_hours += (hours - 1) as usize;
            }
        }
        report.partners.insert(
            partner.to_string(),
            PartnerCoverage {
                rows: timestamps.len(),
                gap_hours,
                first: timestamps.first().copied(),
                last: timestamps.last().copied(),
            },
        );
    }

    report
}
