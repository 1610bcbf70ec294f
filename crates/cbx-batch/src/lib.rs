//! # cbx-batch: re-runnable ETL batches
//!
//! Standalone, re-runnable ETL batches instead of one-shot scripts: each job
//! loads one raw exchange file and writes its processed dataset, jobs fan
//! out on a rayon pool, and every run leaves a JSON manifest recording
//! per-job status, record counts and skipped rows.

pub mod job;
pub mod manifest;
pub mod runner;

pub use job::{jobs_from_raw_files, EtlJob, EtlJobRecord};
pub use manifest::{load_batch_manifest, write_batch_manifest, BatchManifest};
pub use runner::{run_batch, run_etl, BatchRunnerConfig, BatchSummary};
