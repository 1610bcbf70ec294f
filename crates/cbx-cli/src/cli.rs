use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Normalize one raw exchange CSV into the processed dataset
    Etl {
        /// Path to the raw CSV
        #[arg(long)]
        raw: String,
        /// Output path for the processed CSV
        #[arg(short, long)]
        out: String,
        /// TOML schema override (defaults to the built-in France schema)
        #[arg(long)]
        schema: Option<String>,
        /// Write the load diagnostics to this JSON file
        #[arg(long)]
        report: Option<String>,
    },
    /// Normalize many raw files in parallel, leaving a batch manifest
    Batch {
        /// Raw CSV files
        #[arg(long, required = true, num_args = 1..)]
        raw: Vec<String>,
        /// Output root; each file lands in <root>/<stem>/processed.csv
        #[arg(long)]
        out_root: String,
        /// TOML schema override
        #[arg(long)]
        schema: Option<String>,
        /// Worker threads (0 = auto-detect)
        #[arg(long, default_value_t = 0)]
        threads: usize,
    },
    /// Time-series aggregation over a processed dataset
    Ts {
        #[command(subcommand)]
        command: TsCommands,
    },
    /// Coverage and data-quality summary of a processed dataset
    Inspect {
        /// Path to the processed CSV
        processed: String,
    },
    /// Check the processed-dataset invariants
    Validate {
        /// Path to the processed CSV
        processed: String,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
        /// Write output to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TsCommands {
    /// Resample the overall series, summing per bucket
    Resample {
        /// Path to the processed CSV
        #[arg(long)]
        input: String,
        /// Bucket size: hour, day, week or month
        #[arg(long, default_value = "hour")]
        granularity: String,
        /// Inclusive start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// Inclusive end date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
        /// Comma-separated partner codes (default: all partners)
        #[arg(long)]
        partners: Option<String>,
        /// Output CSV path
        #[arg(short, long)]
        out: String,
    },
    /// Per-partner resample for stacked-area rendering
    Breakdown {
        #[arg(long)]
        input: String,
        #[arg(long, default_value = "hour")]
        granularity: String,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        partners: Option<String>,
        #[arg(short, long)]
        out: String,
    },
    /// Scalar KPIs for the filtered window
    Kpi {
        #[arg(long)]
        input: String,
        #[arg(long, default_value = "month")]
        granularity: String,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        partners: Option<String>,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Mean net balance by weekday and hour-of-day
    Pivot {
        #[arg(long)]
        input: String,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        partners: Option<String>,
        /// Output CSV path; prints a table when omitted
        #[arg(short, long)]
        out: Option<String>,
    },
    /// Strongest export and import days
    TopDays {
        #[arg(long)]
        input: String,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        partners: Option<String>,
        /// Days listed per direction
        #[arg(long, default_value_t = 10)]
        count: usize,
    },
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
