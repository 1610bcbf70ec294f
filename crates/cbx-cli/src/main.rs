use clap::Parser;
use clap_complete::{generate, Shell};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

use cbx_cli::cli::{build_cli_command, Cli, Commands};

mod commands;

fn generate_completions(shell: Shell, out: Option<&Path>) -> anyhow::Result<()> {
    let mut cmd = build_cli_command();
    if let Some(path) = out {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = fs::File::create(path)?;
        generate(shell, &mut cmd, "cbx-cli", &mut file);
        println!("Wrote {shell:?} completion to {}", path.display());
    } else {
        let stdout = &mut io::stdout();
        generate(shell, &mut cmd, "cbx-cli", stdout);
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let result = match &cli.command {
        Some(Commands::Etl {
            raw,
            out,
            schema,
            report,
        }) => commands::etl::handle_etl(raw, out, schema.as_deref(), report.as_deref()),
        Some(Commands::Batch {
            raw,
            out_root,
            schema,
            threads,
        }) => commands::etl::handle_batch(raw, out_root, schema.as_deref(), *threads),
        Some(Commands::Ts { command }) => commands::ts::handle(command),
        Some(Commands::Inspect { processed }) => commands::inspect::handle_inspect(processed),
        Some(Commands::Validate { processed }) => commands::inspect::handle_validate(processed),
        Some(Commands::Completions { shell, out }) => generate_completions(*shell, out.as_deref()),
        None => {
            info!("No subcommand provided. Use `cbx-cli --help` for more information.");
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("command failed: {err:?}");
        std::process::exit(1);
    }
}
