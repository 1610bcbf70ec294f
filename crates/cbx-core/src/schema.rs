//! Declared column-mapping schema for raw exchange files.
//!
//! Partner discovery is configuration-driven rather than inferred from
//! header text per query: the mapping between raw column names and partner
//! codes is resolved once at load time against an [`ExchangeSchema`]. A
//! built-in schema covers the RTE France export with its French headers; a
//! TOML file with the same shape can override it.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Export/import column pair for one trading partner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerColumns {
    /// Partner code used in the processed dataset (e.g. "GBR").
    pub code: String,
    /// Raw column holding flows from France to the partner.
    pub export_column: String,
    /// Raw column holding flows from the partner to France.
    pub import_column: String,
    /// True when the pair is a regional aggregate (CWE/Core) rather than a
    /// single country.
    #[serde(default)]
    pub aggregate: bool,
}

/// Column mapping for one raw file layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeSchema {
    /// Calendar-date column, combined with `slot_column`.
    #[serde(default = "default_date_column")]
    pub date_column: String,
    /// Hour-slot column (0-23 or 1-24, detected per file).
    #[serde(default = "default_slot_column")]
    pub slot_column: String,
    /// Pre-combined datetime column; takes precedence when present in the
    /// header.
    #[serde(default)]
    pub datetime_column: Option<String>,
    /// Bilateral partners, one export/import column pair each.
    pub partners: Vec<PartnerColumns>,
    /// Aggregate France export total, when the source provides one.
    #[serde(default)]
    pub export_total_column: Option<String>,
    /// Aggregate France import total, when the source provides one.
    #[serde(default)]
    pub import_total_column: Option<String>,
}

fn default_date_column() -> String {
    "Date".to_string()
}

fn default_slot_column() -> String {
    "Tranche horaire du programme d'échange".to_string()
}

impl ExchangeSchema {
    /// The RTE France cross-border layout: four bilateral partners plus the
    /// CWE/Core regional aggregate.
    pub fn france() -> ExchangeSchema {
        let pair = |code: &str, exp: &str, imp: &str, aggregate: bool| PartnerColumns {
            code: code.to_string(),
            export_column: exp.to_string(),
            import_column: imp.to_string(),
            aggregate,
        };
        ExchangeSchema {
            date_column: default_date_column(),
            slot_column: default_slot_column(),
            datetime_column: Some("datetime".to_string()),
            partners: vec![
                pair("GBR", "FR vers GB (MWh)", "GB vers FR (MWh)", false),
                pair("CHE", "FR vers CH (MWh)", "CH vers FR (MWh)", false),
                pair("ITA", "FR vers IT (MWh)", "IT vers FR (MWh)", false),
                pair("ESP", "FR vers ES (MWh)", "ES vers FR (MWh)", false),
                pair("CWE/Core", "FR->CWE/Core", "CWE/Core->FR", true),
            ],
            export_total_column: Some("Export France (MWh)".to_string()),
            import_total_column: Some("Import France (MWh)".to_string()),
        }
    }

    /// Partner codes declared by this schema, in declaration order.
    pub fn partner_codes(&self) -> Vec<&str> {
        self.partners.iter().map(|p| p.code.as_str()).collect()
    }

    pub fn partner(&self, code: &str) -> Option<&PartnerColumns> {
        self.partners.iter().find(|p| p.code == code)
    }
}

/// Default schema, resolved once.
pub static FRANCE_SCHEMA: Lazy<ExchangeSchema> = Lazy::new(ExchangeSchema::france);
