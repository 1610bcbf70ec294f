use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use polars::prelude::{CsvWriter, DataFrame, SerWriter};

use cbx_ts::FilterSpec;

/// Build a [`FilterSpec`] from the shared --from/--to/--partners options.
pub fn parse_filter(
    from: Option<&str>,
    to: Option<&str>,
    partners: Option<&str>,
) -> Result<FilterSpec> {
    let parse_date = |label: &str, value: &str| -> Result<NaiveDate> {
        value
            .parse::<NaiveDate>()
            .with_context(|| format!("invalid --{label} date '{value}'; expected YYYY-MM-DD"))
    };
    let date_from = from.map(|value| parse_date("from", value)).transpose()?;
    let date_to = to.map(|value| parse_date("to", value)).transpose()?;
    let partners = partners.map(|list| {
        list.split(',')
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty())
            .collect::<BTreeSet<_>>()
    });
    Ok(FilterSpec {
        date_from,
        date_to,
        partners,
    })
}

/// Write a frame as CSV, creating parent directories.
pub fn write_frame(df: &mut DataFrame, out: &str) -> Result<()> {
    let path = Path::new(out);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating '{}'", parent.display()))?;
        }
    }
    let mut file =
        fs::File::create(path).with_context(|| format!("creating '{}'", path.display()))?;
    CsvWriter::new(&mut file)
        .finish(df)
        .with_context(|| format!("writing '{}'", path.display()))?;
    Ok(())
}
