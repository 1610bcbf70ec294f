//! Canonical processed-dataset I/O.
//!
//! The processed artifact is a CSV with columns
//! `timestamp,partner,export_mw,import_mw,net_mw`, one row per
//! (timestamp, partner), regenerated wholesale on each ETL run. Reading and
//! writing go through a polars frame; the record vector is the in-memory
//! form used by the aggregation engine.

use std::fs::{self, File};
use std::path::Path;

use chrono::NaiveDateTime;
use polars::prelude::*;

use cbx_core::{CbxError, CbxResult, ProcessedRecord};

/// Canonical column order of the processed CSV.
pub const PROCESSED_COLUMNS: [&str; 5] =
    ["timestamp", "partner", "export_mw", "import_mw", "net_mw"];

/// Timestamp format of the processed CSV.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Build the canonical frame from records.
pub fn records_to_frame(records: &[ProcessedRecord]) -> CbxResult<DataFrame> {
    let timestamps: Vec<String> = records
        .iter()
        .map(|r| r.timestamp.format(TIMESTAMP_FORMAT).to_string())
        .collect();
    let partners: Vec<String> = records.iter().map(|r| r.partner.clone()).collect();
    let exports: Vec<f64> = records.iter().map(|r| r.export_mw).collect();
    let imports: Vec<f64> = records.iter().map(|r| r.import_mw).collect();
    let nets: Vec<f64> = records.iter().map(|r| r.net_mw).collect();

    DataFrame::new(vec![
        Series::new("timestamp", timestamps),
        Series::new("partner", partners),
        Series::new("export_mw", exports),
        Series::new("import_mw", imports),
        Series::new("net_mw", nets),
    ])
    .map_err(CbxError::data)
}

/// Write the processed dataset to `path`, creating parent directories.
pub fn write_processed(records: &[ProcessedRecord], path: &Path) -> CbxResult<()> {
    let mut df = records_to_frame(records)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .finish(&mut df)
        .map_err(CbxError::data)?;
    Ok(())
}

/// Read a processed dataset back into records.
pub fn read_processed(path: &Path) -> CbxResult<Vec<ProcessedRecord>> {
    let mut file = File::open(path)?;
    let df = CsvReader::new(&mut file)
        .has_header(true)
        .finish()
        .map_err(CbxError::data)?;
    frame_to_records(&df, &path.display().to_string())
}

/// Convert a canonical frame to records.
///
/// The processed artifact is produced by this crate, so damage is diagnosed
/// rather than skipped: a missing column is structural, a malformed cell is
/// a parse error with its row index.
pub fn frame_to_records(df: &DataFrame, origin: &str) -> CbxResult<Vec<ProcessedRecord>> {
    let column = |name: &str| {
        df.column(name).map_err(|_| {
            CbxError::format(
                origin,
                format!("missing processed column '{name}'"),
                &df.get_column_names().join("|"),
            )
        })
    };
    let float_column = |name: &str| {
        column(name).and_then(|series| {
            series
                .cast(&DataType::Float64)
                .map_err(CbxError::data)?
                .f64()
                .map_err(CbxError::data)
                .cloned()
        })
    };

    let timestamps = column("timestamp")?
        .utf8()
        .map_err(CbxError::data)?
        .clone();
    let partners = column("partner")?.utf8().map_err(CbxError::data)?.clone();
    let exports = float_column("export_mw")?;
    let imports = float_column("import_mw")?;
    let nets = float_column("net_mw")?;

    let mut records = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let row_no = i + 2; // header is line 1
        let raw_ts = timestamps.get(i).unwrap_or("");
        let timestamp = NaiveDateTime::parse_from_str(raw_ts, TIMESTAMP_FORMAT)
            .map_err(|_| CbxError::parse(row_no, "timestamp", raw_ts, "unparseable timestamp"))?;
        let partner = partners
            .get(i)
            .ok_or_else(|| CbxError::parse(row_no, "partner", "", "missing partner"))?;
        let export_mw = exports
            .get(i)
            .ok_or_else(|| CbxError::parse(row_no, "export_mw", "", "missing value"))?;
        let import_mw = imports
            .get(i)
            .ok_or_else(|| CbxError::parse(row_no, "import_mw", "", "missing value"))?;
        let net_mw = nets
            .get(i)
            .ok_or_else(|| CbxError::parse(row_no, "net_mw", "", "missing value"))?;
        records.push(ProcessedRecord {
            timestamp,
            partner: partner.to_string(),
            export_mw,
            import_mw,
            net_mw,
        });
    }
    Ok(records)
}
