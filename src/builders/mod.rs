// This file is the module declaration file for the `builders` module.
// It declares and makes public all the sub-modules within the `src/builders`
// directory. Together they make up the selection-and-purge decision engine.

// `executor` module:
// Walks an approved selection in order and deletes item by item through the
// trash repository, tolerating individual failures and honouring dry runs and
// cooperative cancellation.
pub mod executor;

// `gate` module:
// The threshold gate. Decides whether a selection may be deleted or is too
// large to approve without `--force`.
pub mod gate;

// `patterns` module:
// Defines rule definitions, compiled `PatternRule`s with prefix-match
// semantics, and the ordered `PatternRuleSet`.
pub mod patterns;

// `reporter` module:
// The `PurgeObserver` hook, the `ReportingMode` enumeration, and the console
// and progress-bar observers.
pub mod reporter;

// `selection` module:
// The first-rule-wins partition of a trash snapshot between the rules.
pub mod selection;

// `validator` module:
// Checks a configuration unit for missing fields, invalid patterns and
// settings that are probably mistakes.
pub mod validator;
