//! Raw exchange CSV loading and normalization.
//!
//! Turns one raw file into canonical [`ProcessedRecord`]s: dialect and
//! column mapping are resolved once, the hour-slot convention is fixed from
//! the whole slot column, then every row yields one record per mapped
//! partner plus the synthetic overall balance. Rows with unparseable dates,
//! out-of-domain slots, corrupt numerics or duplicate timestamps are
//! skipped and counted in the diagnostics.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;

use cbx_core::schema::ExchangeSchema;
use cbx_core::{CbxError, CbxResult, HourSlotConvention, ProcessedRecord, TOTAL_PARTNER};

use crate::diagnostics::LoadDiagnostics;
use crate::dialect::{Confidence, Dialect};

/// Date formats accepted in the date column.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];
/// Formats accepted in a pre-combined datetime column.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Outcome of a raw load.
#[derive(Debug)]
pub struct LoadResult {
    pub records: Vec<ProcessedRecord>,
    /// Slot convention detected for the file; `None` when timestamps came
    /// from a pre-combined datetime column.
    pub convention: Option<HourSlotConvention>,
    pub dialect: Dialect,
    pub confidence: Confidence,
    pub diagnostics: LoadDiagnostics,
}

/// A raw column resolved against the header.
#[derive(Debug, Clone)]
struct MappedColumn {
    name: String,
    idx: usize,
}

#[derive(Debug)]
struct MappedPartner {
    code: String,
    export: MappedColumn,
    import: MappedColumn,
}

/// Where row timestamps come from, fixed before conversion starts.
#[derive(Debug)]
enum TimeSpec {
    Datetime(MappedColumn),
    DateSlot {
        date: MappedColumn,
        slot: MappedColumn,
        convention: HourSlotConvention,
    },
}

#[derive(Debug)]
struct ColumnMap {
    time: TimeSpec,
    partners: Vec<MappedPartner>,
    totals: Option<(MappedColumn, MappedColumn)>,
}

/// Load a schema override from a TOML file.
pub fn load_schema(path: &Path) -> CbxResult<ExchangeSchema> {
    let text = fs::read_to_string(path)?;
    toml::from_str(&text)
        .map_err(|err| CbxError::config(format!("invalid schema file '{}': {err}", path.display())))
}

/// Load and normalize the raw file at `path` against `schema`.
pub fn load_raw(path: &Path, schema: &ExchangeSchema) -> CbxResult<LoadResult> {
    let (dialect, confidence) = Dialect::detect(path)?;
    let bytes = fs::read(path)?;
    let text = dialect.encoding.decode(&bytes).ok_or_else(|| {
        CbxError::format(
            path.display().to_string(),
            format!(
                "content is not valid {} beyond the sniffed prefix",
                dialect.encoding.name()
            ),
            "",
        )
    })?;

    let mut diagnostics = LoadDiagnostics::new();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(dialect.separator.byte())
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = reader.headers().map_err(CbxError::data)?.clone();

    // Rows are materialized first: the slot convention must be fixed from
    // the whole column before any row is converted. Header is line 1, so
    // data rows are numbered from 2.
    let mut rows: Vec<(usize, StringRecord)> = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let row_no = i + 2;
        diagnostics.stats.rows_read += 1;
        match record {
            Ok(rec) => rows.push((row_no, rec)),
            Err(err) => diagnostics.add_row_error("csv", &err.to_string(), row_no, "", ""),
        }
    }

    let columns = resolve_columns(path, &headers, schema, &rows, &mut diagnostics)?;
    let convention = match &columns.time {
        TimeSpec::Datetime(_) => None,
        TimeSpec::DateSlot { convention, .. } => Some(*convention),
    };

    let mut seen: HashSet<NaiveDateTime> = HashSet::new();
    let mut records: Vec<ProcessedRecord> = Vec::new();
    for (row_no, rec) in &rows {
        match convert_row(rec, &columns, *row_no) {
            Ok((timestamp, row_records)) => {
                if !seen.insert(timestamp) {
                    diagnostics
                        .add_duplicate(*row_no, &format!("duplicate timestamp {timestamp}"));
                    continue;
                }
                records.extend(row_records);
            }
            Err(CbxError::Parse {
                row,
                column,
                value,
                detail,
            }) => diagnostics.add_row_error("parse", &detail, row, &column, &value),
            Err(other) => return Err(other),
        }
    }

    diagnostics.stats.records = records.len();
    Ok(LoadResult {
        records,
        convention,
        dialect,
        confidence,
        diagnostics,
    })
}

/// Match the schema against the header, dropping unmapped partners with a
/// warning. No usable time source or no partner at all is structural.
fn resolve_columns(
    path: &Path,
    headers: &StringRecord,
    schema: &ExchangeSchema,
    rows: &[(usize, StringRecord)],
    diagnostics: &mut LoadDiagnostics,
) -> CbxResult<ColumnMap> {
    let mapped = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .map(|idx| MappedColumn {
                name: name.to_string(),
                idx,
            })
    };
    let header_sample = headers.iter().collect::<Vec<_>>().join("|");

    let time = if let Some(col) = schema.datetime_column.as_deref().and_then(mapped) {
        TimeSpec::Datetime(col)
    } else {
        match (mapped(&schema.date_column), mapped(&schema.slot_column)) {
            (Some(date), Some(slot)) => {
                let convention = detect_convention(path, rows, &slot)?;
                TimeSpec::DateSlot {
                    date,
                    slot,
                    convention,
                }
            }
            _ => {
                return Err(CbxError::format(
                    path.display().to_string(),
                    format!(
                        "no usable time columns; expected '{}' or ('{}', '{}')",
                        schema.datetime_column.as_deref().unwrap_or("datetime"),
                        schema.date_column,
                        schema.slot_column,
                    ),
                    &header_sample,
                ));
            }
        }
    };

    let mut partners = Vec::new();
    for partner in &schema.partners {
        match (mapped(&partner.export_column), mapped(&partner.import_column)) {
            (Some(export), Some(import)) => partners.push(MappedPartner {
                code: partner.code.clone(),
                export,
                import,
            }),
            _ => {
                diagnostics.add_warning(
                    "schema",
                    &format!(
                        "partner {}: columns '{}'/'{}' not found, partner dropped",
                        partner.code, partner.export_column, partner.import_column
                    ),
                );
                diagnostics.stats.partners_dropped += 1;
            }
        }
    }
    if partners.is_empty() {
        return Err(CbxError::format(
            path.display().to_string(),
            "no partner columns matched the schema",
            &header_sample,
        ));
    }
    diagnostics.stats.partners_mapped = partners.len();

    let totals = match (
        schema.export_total_column.as_deref().and_then(mapped),
        schema.import_total_column.as_deref().and_then(mapped),
    ) {
        (Some(export), Some(import)) => Some((export, import)),
        (None, None) => None,
        _ => {
            diagnostics.add_warning(
                "schema",
                "only one of the export/import total columns is present, \
                 falling back to bilateral sums",
            );
            None
        }
    };

    Ok(ColumnMap {
        time,
        partners,
        totals,
    })
}

/// Fix the hour-slot convention from the observed range of the slot column.
///
/// A file holding both slot 0 and slot 24 fits neither convention and is
/// rejected rather than guessed at.
fn detect_convention(
    path: &Path,
    rows: &[(usize, StringRecord)],
    slot: &MappedColumn,
) -> CbxResult<HourSlotConvention> {
    let mut saw_zero = false;
    let mut saw_twenty_four = false;
    for (_, rec) in rows {
        if let Some(value) = rec.get(slot.idx).map(str::trim).and_then(parse_slot) {
            saw_zero |= value == 0;
            saw_twenty_four |= value == 24;
        }
    }
    if saw_zero && saw_twenty_four {
        return Err(CbxError::format(
            path.display().to_string(),
            format!(
                "column '{}' holds both slot 0 and slot 24; no single hour convention fits",
                slot.name
            ),
            "",
        ));
    }
    Ok(if saw_twenty_four {
        HourSlotConvention::OneTo24
    } else {
        HourSlotConvention::ZeroBased
    })
}

/// Convert one raw row into its partner records plus the overall balance.
fn convert_row(
    rec: &StringRecord,
    columns: &ColumnMap,
    row_no: usize,
) -> CbxResult<(NaiveDateTime, Vec<ProcessedRecord>)> {
    let timestamp = row_timestamp(rec, &columns.time, row_no)?;

    let mut records = Vec::with_capacity(columns.partners.len() + 1);
    let mut signed_sum = 0.0;
    for partner in &columns.partners {
        // Physical flows are positive volumes; missing values are zero.
        let export = flow_value(rec, &partner.export, row_no)?.abs();
        let import = flow_value(rec, &partner.import, row_no)?.abs();
        let record = ProcessedRecord::new(timestamp, partner.code.clone(), export, import);
        signed_sum += record.net_mw;
        records.push(record);
    }

    let total = match &columns.totals {
        Some((export_col, import_col)) => {
            let export = flow_value(rec, export_col, row_no)?.abs();
            let import = flow_value(rec, import_col, row_no)?.abs();
            ProcessedRecord::new(timestamp, TOTAL_PARTNER, export, import)
        }
        // No aggregate totals in the source: the overall net is the sum of
        // signed bilateral balances, split into its positive/negative parts.
        None => ProcessedRecord::new(
            timestamp,
            TOTAL_PARTNER,
            signed_sum.max(0.0),
            (-signed_sum).max(0.0),
        ),
    };
    records.push(total);

    Ok((timestamp, records))
}

fn row_timestamp(rec: &StringRecord, time: &TimeSpec, row_no: usize) -> CbxResult<NaiveDateTime> {
    match time {
        TimeSpec::Datetime(col) => {
            let raw = rec.get(col.idx).unwrap_or("").trim();
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .ok_or_else(|| CbxError::parse(row_no, &col.name, raw, "unparseable datetime"))
        }
        TimeSpec::DateSlot {
            date,
            slot,
            convention,
        } => {
            let raw_date = rec.get(date.idx).unwrap_or("").trim();
            let day: NaiveDate = DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw_date, fmt).ok())
                .ok_or_else(|| CbxError::parse(row_no, &date.name, raw_date, "unparseable date"))?;

            let raw_slot = rec.get(slot.idx).unwrap_or("").trim();
            let value = parse_slot(raw_slot).ok_or_else(|| {
                CbxError::parse(row_no, &slot.name, raw_slot, "hour slot is not an integer")
            })?;
            convention.resolve(day, value).ok_or_else(|| {
                CbxError::parse(
                    row_no,
                    &slot.name,
                    raw_slot,
                    format!("hour slot outside the {convention} convention"),
                )
            })
        }
    }
}

/// Numeric flow value; empty and NA-like cells count as zero volume.
fn flow_value(rec: &StringRecord, col: &MappedColumn, row_no: usize) -> CbxResult<f64> {
    let raw = rec.get(col.idx).unwrap_or("").trim();
    if raw.is_empty() || raw == "-" || raw.eq_ignore_ascii_case("na") || raw.eq_ignore_ascii_case("nan")
    {
        return Ok(0.0);
    }
    raw.parse::<f64>()
        // semicolon exports routinely carry decimal commas
        .or_else(|_| raw.replace(',', ".").parse::<f64>())
        .map_err(|_| CbxError::parse(row_no, &col.name, raw, "invalid numeric flow value"))
}

/// Hour slots appear as integers or as float-formatted integers ("24.0").
fn parse_slot(raw: &str) -> Option<u32> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(value) = raw.parse::<u32>() {
        return Some(value);
    }
    raw.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.fract() == 0.0 && (0.0..=1e6).contains(v))
        .map(|v| v as u32)
}
