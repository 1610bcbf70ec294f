//! Load diagnostics with skip-and-count semantics.
//!
//! Row-level problems never abort a load: each one is recorded here with
//! enough context (row index, column, offending value) to diagnose without
//! re-reading the source file.

use serde::Serialize;

/// Severity level for load issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning, // Unusual but loaded (e.g., dropped partner mapping)
    Error,   // Row could not be ingested
}

/// A single issue encountered during a load
#[derive(Debug, Clone, Serialize)]
pub struct LoadIssue {
    pub severity: Severity,
    pub category: String, // "csv", "schema", "parse", "duplicate"
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>, // 1-based, counted from the file start
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Statistics about the load
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadStats {
    pub rows_read: usize,
    pub records: usize,
    pub partners_mapped: usize,
    pub partners_dropped: usize,
    pub skipped_rows: usize,
    pub duplicate_rows: usize,
}

/// Complete diagnostics for one load
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadDiagnostics {
    pub stats: LoadStats,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<LoadIssue>,
}

impl LoadDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a warning that does not skip any data
    pub fn add_warning(&mut self, category: &str, message: &str) {
        self.issues.push(LoadIssue {
            severity: Severity::Warning,
            category: category.to_string(),
            message: message.to_string(),
            row: None,
            column: None,
            value: None,
        });
    }

    /// Record a skipped row with its offending column and value
    pub fn add_row_error(
        &mut self,
        category: &str,
        message: &str,
        row: usize,
        column: &str,
        value: &str,
    ) {
        self.issues.push(LoadIssue {
            severity: Severity::Error,
            category: category.to_string(),
            message: message.to_string(),
            row: Some(row),
            column: (!column.is_empty()).then(|| column.to_string()),
            value: (!value.is_empty()).then(|| value.to_string()),
        });
        self.stats.skipped_rows += 1;
    }

    /// Record a duplicate (timestamp, partner) row
    pub fn add_duplicate(&mut self, row: usize, message: &str) {
        self.issues.push(LoadIssue {
            severity: Severity::Error,
            category: "duplicate".to_string(),
            message: message.to_string(),
            row: Some(row),
            column: None,
            value: None,
        });
        self.stats.duplicate_rows += 1;
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    /// One-line load summary for logs
    pub fn summary(&self) -> String {
        format!(
            "{} rows read, {} records, {} partners mapped ({} dropped), {} rows skipped, {} duplicates",
            self.stats.rows_read,
            self.stats.records,
            self.stats.partners_mapped,
            self.stats.partners_dropped,
            self.stats.skipped_rows,
            self.stats.duplicate_rows,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_counts() {
        let mut diag = LoadDiagnostics::new();
        diag.add_warning("schema", "partner DEU dropped");
        diag.add_row_error("parse", "unparseable date", 42, "Date", "2024-13-01");
        diag.add_duplicate(43, "duplicate timestamp");

        assert_eq!(diag.warning_count(), 1);
        assert_eq!(diag.error_count(), 2);
        assert_eq!(diag.stats.skipped_rows, 1);
        assert_eq!(diag.stats.duplicate_rows, 1);
        assert!(diag.has_issues());
    }

    #[test]
    fn test_diagnostics_serialization() {
        let mut diag = LoadDiagnostics::new();
        diag.stats.rows_read = 24;
        diag.add_row_error("parse", "hour slot outside 1-24", 7, "Heure", "25");

        let json = serde_json::to_string_pretty(&diag).unwrap();
        assert!(json.contains("\"rows_read\": 24"));
        assert!(json.contains("\"error\""));
        assert!(json.contains("\"row\": 7"));
        assert!(json.contains("\"value\": \"25\""));
    }

    #[test]
    fn test_summary_mentions_counts() {
        let mut diag = LoadDiagnostics::new();
        diag.stats.rows_read = 10;
        diag.stats.records = 48;
        let summary = diag.summary();
        assert!(summary.contains("10 rows read"));
        assert!(summary.contains("48 records"));
    }
}
