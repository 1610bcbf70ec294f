use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One ETL unit: a raw exchange file and its processed destination.
#[derive(Debug, Clone)]
pub struct EtlJob {
    pub job_id: String,
    pub raw_file: PathBuf,
    pub processed_out: PathBuf,
}

/// Manifest entry for one executed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtlJobRecord {
    pub job_id: String,
    pub raw_file: String,
    pub status: String,
    pub error: Option<String>,
    pub records: usize,
    pub skipped_rows: usize,
    /// Detected hour-slot convention, when the file carried a slot column.
    pub convention: Option<String>,
    pub output: String,
}

/// Derive jobs from raw file paths; each job writes
/// `<output_root>/<stem>/processed.csv`.
pub fn jobs_from_raw_files(raw_files: &[PathBuf], output_root: &Path) -> Vec<EtlJob> {
    raw_files
        .iter()
        .map(|raw| {
            let stem = raw
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("raw")
                .to_string();
            EtlJob {
                processed_out: output_root.join(&stem).join("processed.csv"),
                job_id: stem,
                raw_file: raw.clone(),
            }
        })
        .collect()
}
