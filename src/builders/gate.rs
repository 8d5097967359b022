use crate::builders::selection::SelectionResult;
use crate::core::config::PurgeConfig;
use crate::core::trash::TrashItem;

/// The verdict of the threshold gate for one configuration unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Nothing was selected, so there is nothing to gate.
    Empty,
    /// Deletion may go ahead.
    Proceed,
    /// Too many items matched to delete without `--force`. Nothing is deleted;
    /// the full selection is carried so the operator can review it.
    Abort {
        threshold: usize,
        would_delete: Vec<TrashItem>,
    },
}

impl GateDecision {
    pub fn allows_execution(&self) -> bool {
        matches!(self, GateDecision::Proceed)
    }
}

/// Safety valve against patterns that match far more than intended.
pub struct ThresholdGate;

impl ThresholdGate {
    pub fn evaluate(selection: &SelectionResult, config: &PurgeConfig) -> GateDecision {
        if selection.is_empty() {
            return GateDecision::Empty;
        }
        if config.force {
            return GateDecision::Proceed;
        }
        if selection.total() > config.threshold {
            return GateDecision::Abort {
                threshold: config.threshold,
                would_delete: selection.flattened.clone(),
            };
        }
        GateDecision::Proceed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn selection_of(count: usize) -> SelectionResult {
        let now = Utc::now();
        SelectionResult {
            rules: Vec::new(),
            flattened: (0..count)
                .map(|i| TrashItem::new(format!("/trash/item-{i}"), Some(now), now))
                .collect(),
        }
    }

    fn config(threshold: usize, force: bool) -> PurgeConfig {
        PurgeConfig {
            default_minimum_age: 30,
            threshold,
            force,
            dry_run: false,
        }
    }

    #[test]
    fn test_empty_selection_short_circuits() {
        assert_eq!(
            ThresholdGate::evaluate(&selection_of(0), &config(0, false)),
            GateDecision::Empty
        );
    }

    #[test]
    fn test_at_threshold_proceeds() {
        assert_eq!(
            ThresholdGate::evaluate(&selection_of(2), &config(2, false)),
            GateDecision::Proceed
        );
    }

    #[test]
    fn test_over_threshold_aborts_with_full_selection() {
        let selection = selection_of(3);
        match ThresholdGate::evaluate(&selection, &config(2, false)) {
            GateDecision::Abort {
                threshold,
                would_delete,
            } => {
                assert_eq!(threshold, 2);
                assert_eq!(would_delete, selection.flattened);
            }
            other => panic!("expected abort, got {other:?}"),
        }
    }

    #[test]
    fn test_force_bypasses_threshold() {
        let decision = ThresholdGate::evaluate(&selection_of(3), &config(2, true));
        assert!(decision.allows_execution());
    }
}
