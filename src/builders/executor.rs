use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use crate::builders::reporter::PurgeObserver;
use crate::core::config::PurgeConfig;
use crate::core::trash::{DeleteDisposition, TrashItem, TrashRepository};

/// What happened to one selected item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurgeOutcome {
    /// The item is gone. `already_absent` is set when the server answered
    /// "not found": the end state is the same, so it counts as a deletion.
    Deleted { already_absent: bool },
    /// Dry run: the delete capability was not invoked.
    Skipped,
    /// The server refused or the request failed.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub item: TrashItem,
    pub outcome: PurgeOutcome,
}

/// Ordered outcomes of one deletion batch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PurgeReport {
    pub outcomes: Vec<ItemOutcome>,
    /// Number of items handed to the executor.
    pub planned: usize,
    /// Set when the batch stopped early because cancellation was requested.
    pub cancelled: bool,
}

impl PurgeReport {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn deleted(&self) -> usize {
        self.count(|outcome| matches!(outcome, PurgeOutcome::Deleted { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, PurgeOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, PurgeOutcome::Failed(_)))
    }

    fn count(&self, predicate: impl Fn(&PurgeOutcome) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|entry| predicate(&entry.outcome))
            .count()
    }
}

/// Cooperative cancellation flag, checked between items.
///
/// Cancelling stops the executor from scheduling further deletions. Deletions
/// already issued stay applied.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Walks an approved selection and deletes it item by item.
///
/// One item's failure never stops the batch: every outcome is recorded and
/// the next item is attempted.
pub struct PurgeExecutor {
    dry_run: bool,
    cancellation: CancellationToken,
}

impl PurgeExecutor {
    pub fn new(config: &PurgeConfig) -> Self {
        Self {
            dry_run: config.dry_run,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Deletes `items` in order through `repository`, notifying `observer`.
    ///
    /// In dry-run mode every item is recorded as `Skipped` and the repository
    /// is never called.
    pub fn execute(
        &self,
        items: &[TrashItem],
        repository: &mut dyn TrashRepository,
        observer: &mut dyn PurgeObserver,
    ) -> PurgeReport {
        let mut report = PurgeReport {
            planned: items.len(),
            ..PurgeReport::default()
        };
        observer.batch_started(items.len(), self.dry_run);

        for item in items {
            if self.cancellation.is_cancelled() {
                warn!(
                    remaining = items.len() - report.attempted(),
                    "cancellation requested, stopping batch"
                );
                report.cancelled = true;
                break;
            }

            observer.item_started(item);
            let outcome = if self.dry_run {
                PurgeOutcome::Skipped
            } else {
                Self::delete_one(item, repository)
            };
            observer.item_finished(item, &outcome);

            report.outcomes.push(ItemOutcome {
                item: item.clone(),
                outcome,
            });
        }

        observer.batch_complete(&report);
        report
    }

    fn delete_one(item: &TrashItem, repository: &mut dyn TrashRepository) -> PurgeOutcome {
        match repository.delete(&item.href) {
            Ok(response) => match response.disposition() {
                DeleteDisposition::Removed => {
                    debug!(href = %item.href, status = response.status_code, "deleted");
                    PurgeOutcome::Deleted {
                        already_absent: false,
                    }
                }
                DeleteDisposition::AlreadyAbsent => {
                    debug!(href = %item.href, "already absent, counting as deleted");
                    PurgeOutcome::Deleted {
                        already_absent: true,
                    }
                }
                DeleteDisposition::Rejected => {
                    warn!(href = %item.href, status = response.status_code, "delete rejected");
                    PurgeOutcome::Failed(format!("{}, {}", response.status_code, response.message))
                }
            },
            Err(err) => {
                warn!(href = %item.href, error = %err, "delete request failed");
                PurgeOutcome::Failed(err.to_string())
            }
        }
    }
}
