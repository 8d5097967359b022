use regex::Regex;
use std::fmt;

use crate::core::error::PurgeError;

/// The raw definition of a rule, as read from a configuration unit.
///
/// Definitions are plain data. They become a [`PatternRule`] only once the
/// pattern has been compiled by [`PatternRuleSet::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDefinition {
    /// Optional human-friendly label used in reports.
    pub name: Option<String>,
    /// The regular expression, matched against the start of each filename.
    pub pattern: String,
    /// Minimum age in days for this rule; `None` falls back to the unit default.
    pub minimum_age: Option<u32>,
}

impl RuleDefinition {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            name: None,
            pattern: pattern.into(),
            minimum_age: None,
        }
    }

    pub fn with_minimum_age(mut self, days: u32) -> Self {
        self.minimum_age = Some(days);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A compiled filename rule.
///
/// The pattern is matched with *prefix* semantics: it must match starting at
/// the first character of the filename but may stop before the end of it.
/// `tempfile-` therefore matches `tempfile-1234.tmp.d1700000000`, while `tmp`
/// does not match `file.tmp`.
#[derive(Debug, Clone)]
pub struct PatternRule {
    definition: RuleDefinition,
    matcher: Regex,
}

/// The `PatternMatcher` trait is the matching primitive used by the selection
/// engine, kept separate so the engine never needs to know how a rule is
/// compiled.
pub trait PatternMatcher {
    /// Checks whether `filename` starts with a match of the pattern.
    fn matches_filename(&self, filename: &str) -> bool;
}

impl PatternRule {
    /// Compiles a single rule definition.
    ///
    /// The user pattern is wrapped as `^(?:<pattern>)`. The group keeps
    /// alternations such as `a|b` anchored as a whole, and leaving the end
    /// unanchored preserves prefix-match semantics.
    ///
    /// # Arguments
    /// * `definition`: The rule as written in the configuration unit.
    ///
    /// # Returns
    /// `Result<Self, PurgeError>` which is the compiled rule, or
    /// `PurgeError::InvalidPattern` if the regex does not compile.
    pub fn compile(definition: RuleDefinition) -> Result<Self, PurgeError> {
        let anchored = format!("^(?:{})", definition.pattern);
        let matcher = Regex::new(&anchored).map_err(|source| PurgeError::InvalidPattern {
            pattern: definition.pattern.clone(),
            source,
        })?;

        Ok(Self {
            definition,
            matcher,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.definition.pattern
    }

    pub fn name(&self) -> Option<&str> {
        self.definition.name.as_deref()
    }

    pub fn minimum_age_override(&self) -> Option<u32> {
        self.definition.minimum_age
    }

    /// The minimum age this rule applies, given the unit-wide default.
    pub fn effective_minimum_age(&self, default_minimum_age: u32) -> u32 {
        self.definition.minimum_age.unwrap_or(default_minimum_age)
    }
}

impl PatternMatcher for PatternRule {
    fn matches_filename(&self, filename: &str) -> bool {
        self.matcher.is_match(filename)
    }
}

impl fmt::Display for PatternRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({})", self.pattern(), name),
            None => write!(f, "{}", self.pattern()),
        }
    }
}

/// An ordered collection of compiled rules.
///
/// Declaration order is significant: when two rules match the same item, the
/// one declared first claims it.
#[derive(Debug, Clone, Default)]
pub struct PatternRuleSet {
    rules: Vec<PatternRule>,
}

impl PatternRuleSet {
    /// Compiles every definition, in order. The first pattern that fails to
    /// compile rejects the whole set.
    pub fn new<I>(definitions: I) -> Result<Self, PurgeError>
    where
        I: IntoIterator<Item = RuleDefinition>,
    {
        let rules = definitions
            .into_iter()
            .map(PatternRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PatternRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<'a> IntoIterator for &'a PatternRuleSet {
    type Item = &'a PatternRule;
    type IntoIter = std::slice::Iter<'a, PatternRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
