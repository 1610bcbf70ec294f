use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tracing::{info, warn};

use cbx_batch::{jobs_from_raw_files, run_batch, run_etl, BatchRunnerConfig};
use cbx_core::schema::{ExchangeSchema, FRANCE_SCHEMA};
use cbx_io::loader::load_schema;

/// Shown issues are capped; the full list goes into the JSON report.
const LOGGED_ISSUES: usize = 5;

fn resolve_schema(path: Option<&str>) -> Result<ExchangeSchema> {
    match path {
        Some(p) => Ok(load_schema(Path::new(p))?),
        None => Ok(FRANCE_SCHEMA.clone()),
    }
}

pub fn handle_etl(
    raw: &str,
    out: &str,
    schema: Option<&str>,
    report: Option<&str>,
) -> Result<()> {
    let schema = resolve_schema(schema)?;
    let result = run_etl(Path::new(raw), Path::new(out), &schema)?;

    info!("dialect: {} ({:?} confidence)", result.dialect, result.confidence);
    if let Some(convention) = result.convention {
        info!("hour-slot convention: {convention}");
    }
    info!("{}", result.diagnostics.summary());
    for issue in result.diagnostics.issues.iter().take(LOGGED_ISSUES) {
        match issue.row {
            Some(row) => warn!("row {row}: {} ({})", issue.message, issue.category),
            None => warn!("{} ({})", issue.message, issue.category),
        }
    }
    let hidden = result.diagnostics.issues.len().saturating_sub(LOGGED_ISSUES);
    if hidden > 0 {
        warn!("... and {hidden} further issue(s)");
    }

    if let Some(report_path) = report {
        let json = serde_json::to_string_pretty(&result.diagnostics)?;
        fs::write(report_path, json)?;
        info!("wrote load report to {report_path}");
    }
    info!("wrote processed dataset to {out}");
    Ok(())
}

pub fn handle_batch(
    raw: &[String],
    out_root: &str,
    schema: Option<&str>,
    threads: usize,
) -> Result<()> {
    let schema = resolve_schema(schema)?;
    let raw_paths: Vec<PathBuf> = raw.iter().map(PathBuf::from).collect();
    let config = BatchRunnerConfig {
        jobs: jobs_from_raw_files(&raw_paths, Path::new(out_root)),
        schema,
        output_root: PathBuf::from(out_root),
        threads,
    };
    let summary = run_batch(&config)?;
    info!(
        "batch finished: {} ok, {} failed, manifest at {}",
        summary.success,
        summary.failure,
        summary.manifest_path.display()
    );
    if summary.failure > 0 {
        bail!("{} batch job(s) failed", summary.failure);
    }
    Ok(())
}
