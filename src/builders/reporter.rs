use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::builders::executor::{PurgeOutcome, PurgeReport};
use crate::builders::selection::SelectionResult;
use crate::core::trash::TrashItem;

/// How much the run tells the operator while it works.
///
/// Progress display and verbose logging would fight over the terminal, so
/// they are variants of one mode rather than independent flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportingMode {
    /// Only the lines an operator must always see: aborts, failures, dry-run notices.
    Silent,
    /// Status lines, more of them as the level grows (1..=3).
    Verbose(u8),
    /// A progress bar over the deletion batch.
    Progress,
}

impl ReportingMode {
    /// Resolves the CLI flags into a single mode.
    ///
    /// A progress bar has nothing to advance during a dry run, so dry runs
    /// fall back to the verbosity-driven console output.
    pub fn from_flags(verbose: u8, progress: bool, dry_run: bool) -> Self {
        match (progress && !dry_run, verbose) {
            (true, _) => ReportingMode::Progress,
            (false, 0) => ReportingMode::Silent,
            (false, level) => ReportingMode::Verbose(level),
        }
    }

    pub fn verbosity(self) -> u8 {
        match self {
            ReportingMode::Verbose(level) => level,
            ReportingMode::Silent | ReportingMode::Progress => 0,
        }
    }
}

/// Observer notified by the engine and the executor as a purge unfolds.
///
/// Every method has a no-op default. Observers only present information: the
/// engine behaves identically whether one is attached or not.
pub trait PurgeObserver {
    fn listing_started(&mut self, _location: &str) {}
    fn listing_complete(&mut self, _items: &[TrashItem]) {}
    fn selection_computed(&mut self, _selection: &SelectionResult) {}
    fn threshold_exceeded(&mut self, _threshold: usize, _would_delete: &[TrashItem]) {}
    fn batch_started(&mut self, _total: usize, _dry_run: bool) {}
    fn item_started(&mut self, _item: &TrashItem) {}
    fn item_finished(&mut self, _item: &TrashItem, _outcome: &PurgeOutcome) {}
    fn batch_complete(&mut self, _report: &PurgeReport) {}
}

/// Observer that ignores every event. Used for headless library calls.
#[derive(Debug, Default)]
pub struct NullObserver;

impl PurgeObserver for NullObserver {}

/// Builds the observer matching a reporting mode.
pub fn observer_for(mode: ReportingMode) -> Box<dyn PurgeObserver> {
    match mode {
        ReportingMode::Progress => Box::new(ProgressReporter::new()),
        other => Box::new(ConsoleReporter::new(other.verbosity())),
    }
}

fn print_empty_trashbin() {
    println!("{}", "Trashbin is empty.".bright_blue());
}

fn threshold_lines(threshold: usize, would_delete: &[TrashItem]) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Threshold of {threshold} files exceeded ({} files to be deleted). Aborting operation.",
            would_delete.len()
        ),
        "Files that would be deleted:".to_string(),
    ];
    lines.extend(would_delete.iter().map(|item| format!("- {}", item.filename)));
    lines
}

fn failure_line(item: &TrashItem, reason: &str) -> String {
    format!("Failed to delete {}: {}", item.href, reason)
}

/// Prints human-readable status lines, gated by verbosity.
///
/// Level 0 prints only what the operator must always see, level 1 adds
/// counts and each deletion, level 2 adds per-rule counts and the trash URL.
pub struct ConsoleReporter {
    verbosity: u8,
    dry_run: bool,
}

impl ConsoleReporter {
    pub fn new(verbosity: u8) -> Self {
        Self {
            verbosity,
            dry_run: false,
        }
    }
}

impl PurgeObserver for ConsoleReporter {
    fn listing_started(&mut self, location: &str) {
        if self.verbosity >= 1 {
            println!("Listing trashbin contents...");
        }
        if self.verbosity >= 2 {
            println!("Trashbin URL: {location}");
        }
    }

    fn listing_complete(&mut self, items: &[TrashItem]) {
        if items.is_empty() {
            print_empty_trashbin();
        } else if self.verbosity >= 1 {
            println!("Found {} items in the trashbin.", items.len());
        }
    }

    fn selection_computed(&mut self, selection: &SelectionResult) {
        if self.verbosity >= 2 {
            for rule in &selection.rules {
                if self.verbosity >= 3 {
                    for item in &rule.items {
                        let modified = item
                            .last_modified
                            .map(|t| t.to_rfc2822())
                            .unwrap_or_default();
                        println!(
                            "{modified} is older than {} ({} days)",
                            rule.minimum_age,
                            item.age_in_days.unwrap_or_default()
                        );
                    }
                }
                println!(
                    "{} items match the pattern {} with minimum age of {} days.",
                    rule.items.len(),
                    rule.pattern.cyan(),
                    rule.minimum_age
                );
            }
        }
        if self.verbosity >= 1 {
            println!("{} items match the configured patterns.", selection.total());
        }
    }

    fn threshold_exceeded(&mut self, threshold: usize, would_delete: &[TrashItem]) {
        let mut lines = threshold_lines(threshold, would_delete).into_iter();
        if let Some(headline) = lines.next() {
            println!("{}", headline.yellow().bold());
        }
        for line in lines {
            println!("{line}");
        }
    }

    fn batch_started(&mut self, total: usize, dry_run: bool) {
        self.dry_run = dry_run;
        if self.verbosity >= 1 && !dry_run {
            println!("Deleting {total} matching items.");
        }
    }

    fn item_started(&mut self, item: &TrashItem) {
        if self.verbosity >= 2 && !self.dry_run {
            println!("Deleting {}...", item.filename);
        }
    }

    fn item_finished(&mut self, item: &TrashItem, outcome: &PurgeOutcome) {
        match outcome {
            PurgeOutcome::Deleted { already_absent } => {
                if self.verbosity >= 1 {
                    if *already_absent {
                        println!("Deleted: {} (already gone)", item.href);
                    } else {
                        println!("Deleted: {}", item.href);
                    }
                }
            }
            PurgeOutcome::Skipped => {
                println!("Dry run - not deleting {}", item.filename);
            }
            PurgeOutcome::Failed(reason) => {
                println!("{}", failure_line(item, reason).red());
            }
        }
    }

    fn batch_complete(&mut self, report: &PurgeReport) {
        if report.cancelled {
            println!(
                "{}",
                format!(
                    "Cancelled after {} of {} items.",
                    report.attempted(),
                    report.planned
                )
                .yellow()
            );
        }
    }
}

/// Drives a progress bar over the deletion batch.
///
/// Lines that must always reach the operator (aborts, failures) are printed
/// above the bar so they do not garble it.
pub struct ProgressReporter {
    bar: Option<ProgressBar>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self { bar: None }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:40} {wide_bar} {pos}/{len} [{elapsed_precise}<{eta_precise}]")
            .map(|style| style.progress_chars("█ "))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl PurgeObserver for ProgressReporter {
    fn listing_complete(&mut self, items: &[TrashItem]) {
        if items.is_empty() {
            print_empty_trashbin();
        }
    }

    fn threshold_exceeded(&mut self, threshold: usize, would_delete: &[TrashItem]) {
        for line in threshold_lines(threshold, would_delete) {
            println!("{line}");
        }
    }

    fn batch_started(&mut self, total: usize, _dry_run: bool) {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(Self::bar_style());
        bar.set_message("Processing items");
        self.bar = Some(bar);
    }

    fn item_started(&mut self, item: &TrashItem) {
        if let Some(bar) = &self.bar {
            bar.set_message(item.filename.chars().take(40).collect::<String>());
        }
    }

    fn item_finished(&mut self, item: &TrashItem, outcome: &PurgeOutcome) {
        let Some(bar) = &self.bar else {
            return;
        };
        if let PurgeOutcome::Failed(reason) = outcome {
            bar.println(failure_line(item, reason));
        }
        bar.inc(1);
    }

    fn batch_complete(&mut self, report: &PurgeReport) {
        if let Some(bar) = self.bar.take() {
            if report.cancelled {
                bar.abandon_with_message("Cancelled");
            } else {
                bar.finish_with_message("Done");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_wins_over_verbosity_outside_dry_run() {
        assert_eq!(ReportingMode::from_flags(0, true, false), ReportingMode::Progress);
    }

    #[test]
    fn test_dry_run_disables_progress() {
        assert_eq!(ReportingMode::from_flags(0, true, true), ReportingMode::Silent);
        assert_eq!(ReportingMode::from_flags(2, false, true), ReportingMode::Verbose(2));
    }

    #[test]
    fn test_progress_mode_has_no_verbosity() {
        assert_eq!(ReportingMode::Progress.verbosity(), 0);
        assert_eq!(ReportingMode::Verbose(3).verbosity(), 3);
    }

    #[test]
    fn test_threshold_lines_list_every_item() {
        let now = chrono::Utc::now();
        let items = vec![
            TrashItem::new("/trash/a.txt", Some(now), now),
            TrashItem::new("/trash/b.txt", Some(now), now),
        ];
        let lines = threshold_lines(1, &items);
        assert_eq!(
            lines,
            [
                "Threshold of 1 files exceeded (2 files to be deleted). Aborting operation.",
                "Files that would be deleted:",
                "- a.txt",
                "- b.txt",
            ]
        );
    }
}
