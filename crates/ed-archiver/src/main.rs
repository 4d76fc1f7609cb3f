//! ed-archiver binary entry point

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ed_archiver::archiver::{self, RunOptions};
use ed_archiver::Config;

#[derive(Parser, Debug)]
#[command(name = "ed-archiver")]
#[command(about = "Compress daily trade CSV files into gzip and parquet archives")]
struct Args {
    /// Path to archiver configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Re-archive files even if their artifacts already exist
    #[arg(long, default_value_t = false)]
    force: bool,

    /// List what would be archived without writing
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Delete source files once all enabled artifacts are written
    #[arg(long, default_value_t = false)]
    delete_source: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, config = %args.config.display(), "Failed to load config");
            return ExitCode::from(1);
        }
    };

    info!(
        source = %config.archive.source.display(),
        destination = %config.archive.destination.display(),
        formats = ?config.archive.formats,
        force = args.force,
        dry_run = args.dry_run,
        delete_source = args.delete_source,
        "Starting archive run"
    );

    let opts = RunOptions {
        force: args.force,
        dry_run: args.dry_run,
        delete_source: args.delete_source,
    };

    match archiver::run(&config, &opts) {
        Ok(stats) => {
            info!(
                archived = stats.archived,
                skipped = stats.skipped,
                failed = stats.failed,
                bytes_written = stats.bytes_written,
                "Archive run complete"
            );
            if stats.failed > 0 {
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!(error = %e, "Archive run aborted");
            ExitCode::from(1)
        }
    }
}
