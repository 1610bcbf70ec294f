use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;
use polars::prelude::{DataFrame, NamedFrom, Series};
use tabwriter::TabWriter;
use tracing::info;

use cbx_cli::cli::TsCommands;
use cbx_core::MegawattHours;
use cbx_io::processed::{read_processed, TIMESTAMP_FORMAT};
use cbx_ts::{
    breakdown, kpis, pivot_weekday_hour, resample, top_days, BreakdownPoint, Granularity,
    PivotTable, SeriesPoint, WEEKDAY_LABELS,
};

use crate::commands::util::{parse_filter, write_frame};

pub fn handle(command: &TsCommands) -> Result<()> {
    match command {
        TsCommands::Resample {
            input,
            granularity,
            from,
            to,
            partners,
            out,
        } => {
            let records = read_processed(Path::new(input))?;
            let filter = parse_filter(from.as_deref(), to.as_deref(), partners.as_deref())?;
            let granularity: Granularity = granularity.parse()?;
            let series = resample(&records, &filter, granularity)?;
            let mut df = series_frame(&series)?;
            write_frame(&mut df, out)?;
            info!(
                "wrote {} {} bucket(s) to {out}",
                series.len(),
                granularity
            );
            Ok(())
        }
        TsCommands::Breakdown {
            input,
            granularity,
            from,
            to,
            partners,
            out,
        } => {
            let records = read_processed(Path::new(input))?;
            let filter = parse_filter(from.as_deref(), to.as_deref(), partners.as_deref())?;
            let granularity: Granularity = granularity.parse()?;
            let points = breakdown(&records, &filter, granularity)?;
            let mut df = breakdown_frame(&points)?;
            write_frame(&mut df, out)?;
            info!("wrote {} partner bucket(s) to {out}", points.len());
            Ok(())
        }
        TsCommands::Kpi {
            input,
            granularity,
            from,
            to,
            partners,
            json,
        } => {
            let records = read_processed(Path::new(input))?;
            let filter = parse_filter(from.as_deref(), to.as_deref(), partners.as_deref())?;
            let granularity: Granularity = granularity.parse()?;
            let kpis = kpis(&records, &filter, granularity)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&kpis)?);
            } else {
                let mut writer = TabWriter::new(io::stdout());
                writeln!(writer, "METRIC\tVALUE")?;
                writeln!(
                    writer,
                    "Cumulative export\t{}",
                    MegawattHours(kpis.total_export_mwh)
                )?;
                writeln!(
                    writer,
                    "Cumulative import\t{}",
                    MegawattHours(kpis.total_import_mwh)
                )?;
                writeln!(
                    writer,
                    "Net balance\t{}",
                    MegawattHours(kpis.total_net_mwh)
                )?;
                writeln!(
                    writer,
                    "Net-exporter share\t{:.1}%",
                    kpis.exporter_fraction * 100.0
                )?;
                writeln!(writer, "Buckets ({granularity})\t{}", kpis.buckets)?;
                writer.flush()?;
            }
            Ok(())
        }
        TsCommands::Pivot {
            input,
            from,
            to,
            partners,
            out,
        } => {
            let records = read_processed(Path::new(input))?;
            let filter = parse_filter(from.as_deref(), to.as_deref(), partners.as_deref())?;
            let pivot = pivot_weekday_hour(&records, &filter)?;
            match out {
                Some(out) => {
                    let mut df = pivot_frame(&pivot)?;
                    write_frame(&mut df, out)?;
                    info!("wrote weekday x hour pivot to {out}");
                }
                None => print_pivot(&pivot)?,
            }
            Ok(())
        }
        TsCommands::TopDays {
            input,
            from,
            to,
            partners,
            count,
        } => {
            let records = read_processed(Path::new(input))?;
            let filter = parse_filter(from.as_deref(), to.as_deref(), partners.as_deref())?;
            let top = top_days(&records, &filter, *count)?;
            let mut writer = TabWriter::new(io::stdout());
            writeln!(writer, "TYPE\tDAY\tNET")?;
            for day in &top.exports {
                writeln!(
                    writer,
                    "Top export\t{}\t{}",
                    day.day,
                    MegawattHours(day.net_mwh)
                )?;
            }
            for day in &top.imports {
                writeln!(
                    writer,
                    "Top import\t{}\t{}",
                    day.day,
                    MegawattHours(day.net_mwh)
                )?;
            }
            writer.flush()?;
            Ok(())
        }
    }
}

fn series_frame(series: &[SeriesPoint]) -> Result<DataFrame> {
    let buckets: Vec<String> = series
        .iter()
        .map(|p| p.bucket.format(TIMESTAMP_FORMAT).to_string())
        .collect();
    let exports: Vec<f64> = series.iter().map(|p| p.export_mw).collect();
    let imports: Vec<f64> = series.iter().map(|p| p.import_mw).collect();
    let nets: Vec<f64> = series.iter().map(|p| p.net_mw).collect();
    Ok(DataFrame::new(vec![
        Series::new("bucket", buckets),
        Series::new("export_mw", exports),
        Series::new("import_mw", imports),
        Series::new("net_mw", nets),
    ])?)
}

fn breakdown_frame(points: &[BreakdownPoint]) -> Result<DataFrame> {
    let buckets: Vec<String> = points
        .iter()
        .map(|p| p.bucket.format(TIMESTAMP_FORMAT).to_string())
        .collect();
    let partners: Vec<String> = points.iter().map(|p| p.partner.clone()).collect();
    let exports: Vec<f64> = points.iter().map(|p| p.export_mw).collect();
    let imports: Vec<f64> = points.iter().map(|p| p.import_mw).collect();
    let nets: Vec<f64> = points.iter().map(|p| p.net_mw).collect();
    Ok(DataFrame::new(vec![
        Series::new("bucket", buckets),
        Series::new("partner", partners),
        Series::new("export_mw", exports),
        Series::new("import_mw", imports),
        Series::new("net_mw", nets),
    ])?)
}

fn pivot_frame(pivot: &PivotTable) -> Result<DataFrame> {
    let weekdays: Vec<String> = WEEKDAY_LABELS.iter().map(|d| d.to_string()).collect();
    let mut columns = vec![Series::new("weekday", weekdays)];
    for hour in 0..24 {
        let values: Vec<f64> = pivot.mean_net_mw.iter().map(|row| row[hour]).collect();
        columns.push(Series::new(&format!("h{hour:02}"), values));
    }
    Ok(DataFrame::new(columns)?)
}

fn print_pivot(pivot: &PivotTable) -> Result<()> {
    let mut writer = TabWriter::new(io::stdout());
    let header: Vec<String> = (0..24).map(|h| format!("h{h:02}")).collect();
    writeln!(writer, "WEEKDAY\t{}", header.join("\t"))?;
    for (label, row) in WEEKDAY_LABELS.iter().zip(&pivot.mean_net_mw) {
        let cells: Vec<String> = row.iter().map(|v| format!("{v:.0}")).collect();
        writeln!(writer, "{label}\t{}", cells.join("\t"))?;
    }
    writer.flush()?;
    Ok(())
}
