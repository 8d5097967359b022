use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::builders::patterns::PatternRule;
use crate::builders::reporter::observer_for;
use crate::core::config::{ConfigManager, PurgeUnit, RunOptions};
use crate::core::engine::{PurgeEngine, UnitSummary};
use crate::core::error::PurgeError;
use crate::core::trash::TrashRepository;
use crate::core::webdav::WebDavTrashRepository;

/// Initialises `tracing` output on stderr.
///
/// The level follows the `-v` count (status lines already cover the first
/// level, so diagnostics start one level later); `RUST_LOG` takes precedence.
pub fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 | 1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("trashbin_purge={level}")));

    // A subscriber may already be installed when embedded; keep that one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// The result of one configuration unit.
#[derive(Debug)]
pub struct UnitResult {
    pub path: PathBuf,
    pub outcome: Result<UnitSummary, PurgeError>,
}

/// The results of every unit of one invocation, in processing order.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub units: Vec<UnitResult>,
}

impl RunSummary {
    pub fn failed_units(&self) -> usize {
        self.units.iter().filter(|u| u.outcome.is_err()).count()
    }

    pub fn failed_deletions(&self) -> usize {
        self.units
            .iter()
            .filter_map(|u| u.outcome.as_ref().ok())
            .map(|s| s.report.failed())
            .sum()
    }

    pub fn has_failures(&self) -> bool {
        self.failed_units() > 0 || self.failed_deletions() > 0
    }
}

/// Processes configuration units against their Nextcloud servers.
pub fn process_config_files(paths: &[PathBuf], options: &RunOptions) -> RunSummary {
    process_config_files_with(paths, options, |unit| {
        let repository = WebDavTrashRepository::new(&unit.connection)?;
        Ok(Box::new(repository) as Box<dyn TrashRepository>)
    })
}

/// Processes configuration units one at a time, in order.
///
/// `connect` builds the trash repository for a loaded unit. A unit that fails
/// to load, connect or list is reported and skipped; the next unit still runs.
pub fn process_config_files_with<F>(
    paths: &[PathBuf],
    options: &RunOptions,
    mut connect: F,
) -> RunSummary
where
    F: FnMut(&PurgeUnit) -> Result<Box<dyn TrashRepository>, PurgeError>,
{
    let mut summary = RunSummary::default();

    for path in paths {
        if options.mode.verbosity() >= 1 {
            println!("Processing configuration file: {}", path.display());
        }

        let outcome = run_unit(path, options, &mut connect);
        match &outcome {
            Ok(unit) => println!("{}: {unit}", path.display().to_string().bold()),
            Err(err) => {
                debug!(path = %path.display(), error = ?err, "unit failed");
                println!(
                    "{}",
                    format!("Error processing {}: {err}", path.display()).red()
                );
            }
        }

        summary.units.push(UnitResult {
            path: path.clone(),
            outcome,
        });
    }

    summary
}

fn run_unit<F>(
    path: &Path,
    options: &RunOptions,
    connect: &mut F,
) -> Result<UnitSummary, PurgeError>
where
    F: FnMut(&PurgeUnit) -> Result<Box<dyn TrashRepository>, PurgeError>,
{
    let unit = ConfigManager::new(path).load_unit(options)?;
    if options.mode.verbosity() >= 1 {
        print_unit_overview(&unit);
    }

    let mut repository = connect(&unit)?;
    let mut observer = observer_for(options.mode);
    PurgeEngine::new(repository.as_mut(), observer.as_mut()).run(
        &unit.rules,
        &unit.config,
        options.depth,
    )
}

fn print_unit_overview(unit: &PurgeUnit) {
    let patterns = unit
        .rules
        .iter()
        .map(PatternRule::pattern)
        .collect::<Vec<_>>()
        .join("\", \"");

    println!("Purging files matching:");
    println!(" - File name patterns: \"{patterns}\"");
    if !unit.config.force {
        println!(" - Maximum threshold of {} files", unit.config.threshold);
    }
    println!(" - Minimum age of {} days", unit.config.default_minimum_age);
}
