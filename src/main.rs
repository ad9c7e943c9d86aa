//! Graupel CLI: incremental loader for NDJSON event files.

use std::process::ExitCode;

use clap::Parser;
use tracing::info;

use graupel::{Config, LoadRequest, init_tracing, run_load};

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "graupel", about = "Incremental NDJSON event loader")]
struct CliArgs {
    /// Path to the YAML configuration file.
    #[arg(short, long)]
    config: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = CliArgs::parse();

    let config = match Config::from_file(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        "Loading {} -> {}",
        config.source.load_path, config.sink.target_location
    );

    let request = LoadRequest::from_config(&config);
    match run_load(&request).await {
        Ok(summary) if summary.is_no_op() => {
            info!(skipped = summary.files_skipped, "Nothing to load");
            ExitCode::SUCCESS
        }
        Ok(summary) => {
            info!(
                rows = summary.rows_appended,
                files = summary.files_loaded.len(),
                skipped = summary.files_skipped,
                "Load complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Load failed: {e}");
            ExitCode::FAILURE
        }
    }
}
