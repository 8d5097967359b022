//! Nextcloud keeps deleted files in a trash bin until it runs out of quota or
//! a retention job gets to them. Some files (editor temp files, caches,
//! sync leftovers) should not linger there at all. This tool lists the trash
//! bin over WebDAV and permanently removes what matches the configured
//! patterns, but refuses to delete more than a threshold unless forced.
use anyhow::Result;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

use trashbin_purge::builders::reporter::ReportingMode;
use trashbin_purge::core::config::RunOptions;
use trashbin_purge::utils;

#[derive(Parser)]
#[command(name = "trashbin-purge", version)]
#[command(about = "Purge files matching patterns from Nextcloud trash bin.")]
struct Cli {
    /// One or more configuration files to process in order.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Perform a dry run without deleting files (disables progress bar).
    #[arg(short = 'N', long)]
    dry_run: bool,

    /// Force deletion even when amount of files is over threshold.
    #[arg(short = 'F', long)]
    force: bool,

    /// Enable verbose output (repeat for more detail).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Show progress bar (cannot be combined with verbose output).
    #[arg(short = 'C', long, conflicts_with = "verbose")]
    progress: bool,

    /// Amount of subdirectory levels to search through. Defaults to 1 (only files directly in the trashbin).
    #[arg(short = 'D', long, default_value_t = 1)]
    depth: u32,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    utils::init_logging(cli.verbose);

    let options = RunOptions {
        dry_run: cli.dry_run,
        force: cli.force,
        depth: cli.depth,
        mode: ReportingMode::from_flags(cli.verbose, cli.progress, cli.dry_run),
    };

    let summary = utils::process_config_files(&cli.files, &options);
    if summary.has_failures() {
        anyhow::bail!(
            "{} of {} configuration units failed, {} deletions failed",
            summary.failed_units(),
            summary.units.len(),
            summary.failed_deletions()
        );
    }
    Ok(())
}
