use colored::Colorize;
use std::fmt;
use tracing::info;

use crate::builders::executor::{CancellationToken, PurgeExecutor, PurgeReport};
use crate::builders::gate::{GateDecision, ThresholdGate};
use crate::builders::patterns::PatternRuleSet;
use crate::builders::reporter::PurgeObserver;
use crate::builders::selection::SelectionEngine;
use crate::core::config::PurgeConfig;
use crate::core::error::PurgeError;
use crate::core::trash::TrashRepository;

/// Per-rule match count, for the unit summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleCount {
    pub pattern: String,
    pub matched: usize,
}

/// What happened to one configuration unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSummary {
    /// Items returned by the listing.
    pub listed: usize,
    /// Items claimed by any rule.
    pub matched: usize,
    pub per_rule: Vec<RuleCount>,
    pub decision: GateDecision,
    pub report: PurgeReport,
}

impl UnitSummary {
    pub fn threshold_exceeded(&self) -> bool {
        matches!(self.decision, GateDecision::Abort { .. })
    }

    pub fn has_failures(&self) -> bool {
        self.report.failed() > 0
    }
}

impl fmt::Display for UnitSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} matched, {} deleted, {} skipped, {} failed",
            self.matched,
            self.report.deleted(),
            self.report.skipped(),
            self.report.failed()
        )?;
        if self.threshold_exceeded() {
            write!(f, " ({})", "threshold exceeded, nothing deleted".yellow())?;
        }
        if self.report.cancelled {
            write!(f, " ({})", "cancelled".yellow())?;
        }
        Ok(())
    }
}

/// Runs one configuration unit against one trash repository.
///
/// The engine lists the trash bin, selects with the unit's rules, consults the
/// threshold gate and, if allowed, hands the selection to the executor. The
/// observer only watches; the outcome is the same without one.
pub struct PurgeEngine<'a> {
    repository: &'a mut dyn TrashRepository,
    observer: &'a mut dyn PurgeObserver,
    cancellation: CancellationToken,
}

impl<'a> PurgeEngine<'a> {
    pub fn new(
        repository: &'a mut dyn TrashRepository,
        observer: &'a mut dyn PurgeObserver,
    ) -> Self {
        Self {
            repository,
            observer,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Purges the unit.
    ///
    /// # Errors
    /// Listing failures (`Transport`, `Parse`) abort the unit before anything
    /// is selected. Individual deletion failures do not: they are recorded in
    /// the returned summary.
    pub fn run(
        &mut self,
        rules: &PatternRuleSet,
        config: &PurgeConfig,
        depth: u32,
    ) -> Result<UnitSummary, PurgeError> {
        self.observer.listing_started(&self.repository.location());
        let items = self.repository.list(depth)?;
        info!(count = items.len(), "listed trashbin");
        self.observer.listing_complete(&items);

        let selection = SelectionEngine::select(&items, rules, config.default_minimum_age);
        self.observer.selection_computed(&selection);

        let decision = ThresholdGate::evaluate(&selection, config);
        let report = match &decision {
            GateDecision::Empty => PurgeReport::default(),
            GateDecision::Abort {
                threshold,
                would_delete,
            } => {
                info!(
                    threshold,
                    selected = would_delete.len(),
                    "threshold exceeded, aborting"
                );
                self.observer.threshold_exceeded(*threshold, would_delete);
                PurgeReport::default()
            }
            GateDecision::Proceed => PurgeExecutor::new(config)
                .with_cancellation(self.cancellation.clone())
                .execute(&selection.flattened, &mut *self.repository, &mut *self.observer),
        };

        let summary = UnitSummary {
            listed: items.len(),
            matched: selection.total(),
            per_rule: selection
                .rules
                .iter()
                .map(|rule| RuleCount {
                    pattern: rule.pattern.clone(),
                    matched: rule.items.len(),
                })
                .collect(),
            decision,
            report,
        };
        info!(
            matched = summary.matched,
            deleted = summary.report.deleted(),
            skipped = summary.report.skipped(),
            failed = summary.report.failed(),
            "unit complete"
        );
        Ok(summary)
    }
}
