use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Result};
use tabwriter::TabWriter;
use tracing::info;

use cbx_core::MegawattHours;
use cbx_io::processed::read_processed;
use cbx_io::validate::validate_processed;

pub fn handle_inspect(processed: &str) -> Result<()> {
    let records = read_processed(Path::new(processed))?;
    let report = validate_processed(&records);

    println!("Processed dataset {processed}:");
    println!("  Rows           : {}", report.rows);
    println!("  Partners       : {}", report.partners.len());
    println!("  Duplicate keys : {}", report.duplicate_keys);
    println!("  Net mismatches : {}", report.net_mismatches);
    let scaled = |value: Option<f64>| {
        value
            .map(|v| MegawattHours(v).to_string())
            .unwrap_or_else(|| "n/a".to_string())
    };
    println!("  Min net        : {}", scaled(report.min_net_mw));
    println!("  Max net        : {}", scaled(report.max_net_mw));

    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "PARTNER\tROWS\tGAP HOURS\tFIRST\tLAST")?;
    for (partner, coverage) in &report.partners {
        writeln!(
            writer,
            "{partner}\t{}\t{}\t{}\t{}",
            coverage.rows,
            coverage.gap_hours,
            coverage
                .first
                .map(|ts| ts.to_string())
                .unwrap_or_else(|| "-".to_string()),
            coverage
                .last
                .map(|ts| ts.to_string())
                .unwrap_or_else(|| "-".to_string()),
        )?;
    }
    writer.flush()?;
    Ok(())
}

pub fn handle_validate(processed: &str) -> Result<()> {
    let records = read_processed(Path::new(processed))?;
    let report = validate_processed(&records);
    if !report.is_clean() {
        bail!(
            "validation failed for {processed}: {} duplicate key(s), {} net mismatch(es)",
            report.duplicate_keys,
            report.net_mismatches
        );
    }
    let gap_hours: usize = report.partners.values().map(|c| c.gap_hours).sum();
    info!(
        "validation successful: {} rows across {} partner(s), {} gap hour(s)",
        report.rows,
        report.partners.len(),
        gap_hours
    );
    Ok(())
}
