//! # cbx-core: shared types for the cbx toolkit
//!
//! Home of the canonical data model for cross-border exchange processing:
//! the [`ProcessedRecord`] row shape, the hour-slot convention handling, the
//! declared column-mapping [`schema`], the [`units`] newtype, and the
//! unified [`CbxError`] used across the workspace.
//!
//! The processed dataset is one row per (timestamp, partner) with the
//! invariant `net_mw == export_mw - import_mw`. The overall France balance
//! travels as the reserved synthetic partner [`TOTAL_PARTNER`], which
//! downstream consumers exclude from partner enumeration.

pub mod error;
pub mod schema;
pub mod units;

pub use error::{CbxError, CbxResult};
pub use units::MegawattHours;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Reserved partner code for the overall France balance series.
pub const TOTAL_PARTNER: &str = "TOTAL";

/// Hour-slot convention of a raw file.
///
/// Decided once per file from the observed range of the slot column, never
/// per row, so a single file cannot mix interpretations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HourSlotConvention {
    /// Slots 0-23, used as hour-of-day directly.
    ZeroBased,
    /// Slots 1-24; slot 24 wraps to hour 0 of the next calendar day, slots
    /// 1-23 pass through as hour-of-day.
    OneTo24,
}

impl HourSlotConvention {
    pub fn as_str(&self) -> &'static str {
        match self {
            HourSlotConvention::ZeroBased => "0-23",
            HourSlotConvention::OneTo24 => "1-24",
        }
    }

    /// Whether `slot` is inside this convention's domain.
    pub fn admits(&self, slot: u32) -> bool {
        match self {
            HourSlotConvention::ZeroBased => slot <= 23,
            HourSlotConvention::OneTo24 => (1..=24).contains(&slot),
        }
    }

    /// Combine a calendar date and an hour slot into the hourly timestamp.
    ///
    /// Returns `None` when the slot is outside the convention's domain.
    pub fn resolve(&self, date: NaiveDate, slot: u32) -> Option<NaiveDateTime> {
        if !self.admits(slot) {
            return None;
        }
        match (self, slot) {
            (HourSlotConvention::OneTo24, 24) => date.succ_opt()?.and_hms_opt(0, 0, 0),
            (_, hour) => date.and_hms_opt(hour, 0, 0),
        }
    }
}

impl std::fmt::Display for HourSlotConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Canonical row of the processed dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    /// Hourly, timezone-naive.
    pub timestamp: NaiveDateTime,
    /// Partner code, or [`TOTAL_PARTNER`] for the overall balance.
    pub partner: String,
    /// Flow France → partner, MWh, non-negative.
    pub export_mw: f64,
    /// Flow partner → France, MWh, non-negative.
    pub import_mw: f64,
    /// `export_mw - import_mw`.
    pub net_mw: f64,
}

impl ProcessedRecord {
    /// Build a record with the net balance derived from its parts, so the
    /// `net == export - import` invariant holds by construction.
    pub fn new(
        timestamp: NaiveDateTime,
        partner: impl Into<String>,
        export_mw: f64,
        import_mw: f64,
    ) -> Self {
        Self {
            timestamp,
            partner: partner.into(),
            export_mw,
            import_mw,
            net_mw: export_mw - import_mw,
        }
    }

    pub fn is_total(&self) -> bool {
        self.partner == TOTAL_PARTNER
    }
}
