use crate::job::{EtlJob, EtlJobRecord};
use crate::manifest::{write_batch_manifest, BatchManifest};
use anyhow::{Context, Result};
use cbx_core::schema::ExchangeSchema;
use cbx_core::CbxResult;
use cbx_io::loader::{load_raw, LoadResult};
use cbx_io::processed::write_processed;
use chrono::Utc;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::fs;
use std::path::{Path, PathBuf};

/// Runner settings for one ETL batch.
pub struct BatchRunnerConfig {
    pub jobs: Vec<EtlJob>,
    pub schema: ExchangeSchema,
    pub output_root: PathBuf,
    /// Worker threads; 0 auto-detects the CPU count.
    pub threads: usize,
}

/// Summary returned after the run so clients can log success/failure counts
/// and the manifest location.
pub struct BatchSummary {
    pub success: usize,
    pub failure: usize,
    pub manifest_path: PathBuf,
    pub jobs: Vec<EtlJobRecord>,
}

/// Run one raw file through the loader and persist the processed dataset.
///
/// The single-job building block behind [`run_batch`], also used directly
/// by the CLI `etl` command.
pub fn run_etl(raw: &Path, out: &Path, schema: &ExchangeSchema) -> CbxResult<LoadResult> {
    let result = load_raw(raw, schema)?;
    write_processed(&result.records, out)?;
    Ok(result)
}

pub fn run_batch(config: &BatchRunnerConfig) -> Result<BatchSummary> {
    fs::create_dir_all(&config.output_root).with_context(|| {
        format!(
            "creating batch output root '{}'",
            config.output_root.display()
        )
    })?;

    // Configure thread pool: auto-detect CPU count if threads=0
    let thread_count = if config.threads == 0 {
        num_cpus::get()
    } else {
        config.threads
    };
    let pool = ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .build()
        .context("building Rayon thread pool for batch runs")?;

    // Each job is an independent file-to-file transformation
    let job_records: Vec<EtlJobRecord> = pool.install(|| {
        config
            .jobs
            .par_iter()
            .map(|job| run_job(job, &config.schema))
            .collect()
    });

    let success = job_records
        .iter()
        .filter(|record| record.status == "ok")
        .count();
    let failure = job_records.len() - success;

    // Write batch manifest JSON for downstream tools
    let manifest = BatchManifest {
        created_at: Utc::now(),
        num_jobs: job_records.len(),
        success,
        failure,
        jobs: job_records.clone(),
    };
    let manifest_path = config.output_root.join("batch_manifest.json");
    write_batch_manifest(&manifest_path, &manifest)?;
    Ok(BatchSummary {
        success,
        failure,
        manifest_path,
        jobs: job_records,
    })
}

fn run_job(job: &EtlJob, schema: &ExchangeSchema) -> EtlJobRecord {
    let outcome = run_etl(&job.raw_file, &job.processed_out, schema);
    let (status, error, records, skipped_rows, convention) = match &outcome {
        Ok(result) => (
            "ok".to_string(),
            None,
            result.diagnostics.stats.records,
            result.diagnostics.stats.skipped_rows,
            result.convention.map(|c| c.to_string()),
        ),
        Err(err) => {
            eprintln!("batch job {} failed: {err}", job.job_id);
            ("error".to_string(), Some(err.to_string()), 0, 0, None)
        }
    };
    EtlJobRecord {
        job_id: job.job_id.clone(),
        raw_file: job.raw_file.display().to_string(),
        status,
        error,
        records,
        skipped_rows,
        convention,
        output: job.processed_out.display().to_string(),
    }
}
