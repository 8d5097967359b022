use tracing::{debug, trace};

use crate::builders::patterns::{PatternMatcher, PatternRule, PatternRuleSet};
use crate::core::trash::TrashItem;

/// The items one rule claimed, in listing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSelection {
    /// Position of the rule in the rule set.
    pub rule_index: usize,
    pub pattern: String,
    pub name: Option<String>,
    /// The minimum age that was applied for this rule.
    pub minimum_age: u32,
    pub items: Vec<TrashItem>,
}

/// Outcome of a selection pass.
///
/// `rules` has one entry per rule, in declaration order, even when a rule
/// claimed nothing. `flattened` is the concatenation of every rule's items in
/// that same order and is what the gate and the executor consume.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionResult {
    pub rules: Vec<RuleSelection>,
    pub flattened: Vec<TrashItem>,
}

impl SelectionResult {
    pub fn total(&self) -> usize {
        self.flattened.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flattened.is_empty()
    }
}

/// Partitions a trash snapshot between the rules of a rule set.
pub struct SelectionEngine;

impl SelectionEngine {
    /// Selects the items each rule should delete.
    ///
    /// Rules are evaluated in declaration order against the items no earlier
    /// rule has claimed. An item is eligible when its filename prefix-matches
    /// the rule and its age is known and at least the rule's effective minimum
    /// age. Items with an unknown age are never selected.
    ///
    /// The snapshot is only read: claims are tracked in a separate marker set,
    /// so the caller's slice is left exactly as it was.
    ///
    /// # Arguments
    /// * `items`: The trash listing, in the order the repository returned it.
    /// * `rules`: The compiled rules of the configuration unit.
    /// * `default_minimum_age`: Age in days applied to rules without an override.
    pub fn select(
        items: &[TrashItem],
        rules: &PatternRuleSet,
        default_minimum_age: u32,
    ) -> SelectionResult {
        let mut claimed = vec![false; items.len()];
        let mut result = SelectionResult::default();

        for (rule_index, rule) in rules.iter().enumerate() {
            let minimum_age = rule.effective_minimum_age(default_minimum_age);
            let picked = Self::claim(items, &mut claimed, rule, minimum_age);

            debug!(
                pattern = rule.pattern(),
                minimum_age,
                matched = picked.len(),
                "rule evaluated"
            );

            result.flattened.extend(picked.iter().cloned());
            result.rules.push(RuleSelection {
                rule_index,
                pattern: rule.pattern().to_string(),
                name: rule.name().map(str::to_string),
                minimum_age,
                items: picked,
            });
        }

        result
    }

    fn claim(
        items: &[TrashItem],
        claimed: &mut [bool],
        rule: &PatternRule,
        minimum_age: u32,
    ) -> Vec<TrashItem> {
        let mut picked = Vec::new();

        for (index, item) in items.iter().enumerate() {
            if claimed[index] || !rule.matches_filename(&item.filename) {
                continue;
            }
            if !item.is_older_than(minimum_age) {
                trace!(
                    filename = %item.filename,
                    age_in_days = ?item.age_in_days,
                    minimum_age,
                    "matched but too recent or of unknown age"
                );
                continue;
            }

            trace!(
                filename = %item.filename,
                age_in_days = ?item.age_in_days,
                minimum_age,
                "claimed"
            );
            claimed[index] = true;
            picked.push(item.clone());
        }

        picked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::patterns::RuleDefinition;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn item(name: &str, age: Option<i64>) -> TrashItem {
        TrashItem::new(
            format!("/remote.php/dav/trashbin/alice/trash/{name}"),
            age.map(|days| now() - Duration::days(days)),
            now(),
        )
    }

    fn rules(definitions: Vec<RuleDefinition>) -> PatternRuleSet {
        PatternRuleSet::new(definitions).unwrap()
    }

    fn names(items: &[TrashItem]) -> Vec<&str> {
        items.iter().map(|i| i.filename.as_str()).collect()
    }

    #[test]
    fn test_first_declared_rule_wins() {
        let items = vec![item("log-1", Some(40)), item("log-2", Some(40))];
        let set = rules(vec![RuleDefinition::new("log-1"), RuleDefinition::new("log-")]);

        let result = SelectionEngine::select(&items, &set, 30);

        assert_eq!(names(&result.rules[0].items), ["log-1"]);
        assert_eq!(names(&result.rules[1].items), ["log-2"]);
        assert_eq!(names(&result.flattened), ["log-1", "log-2"]);
    }

    #[test]
    fn test_unknown_age_is_never_selected() {
        let items = vec![item("tempfile-a", None), item("tempfile-b", Some(99))];
        let set = rules(vec![RuleDefinition::new("tempfile-.*").with_minimum_age(0)]);

        let result = SelectionEngine::select(&items, &set, 30);

        assert_eq!(names(&result.flattened), ["tempfile-b"]);
    }

    #[test]
    fn test_too_recent_item_stays_available_to_later_rules() {
        let items = vec![item("cache-1", Some(10))];
        let set = rules(vec![
            RuleDefinition::new("cache-"),
            RuleDefinition::new("cache-").with_minimum_age(7),
        ]);

        let result = SelectionEngine::select(&items, &set, 30);

        assert!(result.rules[0].items.is_empty());
        assert_eq!(result.rules[1].minimum_age, 7);
        assert_eq!(names(&result.rules[1].items), ["cache-1"]);
    }

    #[test]
    fn test_flattened_is_rule_order_then_item_order() {
        let items = vec![
            item("b-1", Some(50)),
            item("a-1", Some(50)),
            item("b-2", Some(50)),
            item("a-2", Some(50)),
        ];
        let set = rules(vec![RuleDefinition::new("a-"), RuleDefinition::new("b-")]);

        let result = SelectionEngine::select(&items, &set, 30);

        assert_eq!(names(&result.flattened), ["a-1", "a-2", "b-1", "b-2"]);
    }

    #[test]
    fn test_empty_pool_yields_empty_rules() {
        let set = rules(vec![RuleDefinition::new("a"), RuleDefinition::new("b")]);

        let result = SelectionEngine::select(&[], &set, 30);

        assert_eq!(result.rules.len(), 2);
        assert!(result.rules.iter().all(|r| r.items.is_empty()));
        assert!(result.is_empty());
    }

    #[test]
    fn test_selection_is_idempotent_and_leaves_input_untouched() {
        let items = vec![item("x-1", Some(31)), item("y-1", Some(31)), item("x-2", None)];
        let snapshot = items.clone();
        let set = rules(vec![RuleDefinition::new("x"), RuleDefinition::new(".*")]);

        let first = SelectionEngine::select(&items, &set, 30);
        let second = SelectionEngine::select(&items, &set, 30);

        assert_eq!(first, second);
        assert_eq!(items, snapshot);
    }

    #[test]
    fn test_boundary_age_is_inclusive() {
        let items = vec![item("edge", Some(30)), item("young", Some(29))];
        let set = rules(vec![RuleDefinition::new(".*")]);

        let result = SelectionEngine::select(&items, &set, 30);

        assert_eq!(names(&result.flattened), ["edge"]);
    }
}
