use regex::Regex;
use reqwest::Url;
use std::fmt;

use crate::core::config::{PatternBlock, PurgeFile, ServerSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The unit cannot run.
    Error,
    /// The unit runs, but probably not the way its author intended.
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub message: String,
}

impl ValidationIssue {
    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Error => write!(f, "error: {}", self.message),
            Severity::Warning => write!(f, "warning: {}", self.message),
        }
    }
}

/// The `ConfigValidator` trait defines the public interface for validating a
/// configuration unit before anything is listed or deleted.
pub trait ConfigValidator {
    /// Performs a full validation of the unit and returns every issue found.
    fn validate_config(&self, config: &PurgeFile) -> Vec<ValidationIssue>;

    /// Validates a single `[[pattern]]` block.
    fn validate_pattern(&self, block: &PatternBlock) -> Vec<ValidationIssue>;
}

/// The `StandardValidator` checks that a unit can connect, that it has at
/// least one rule, and that its rules are not obviously dangerous.
pub struct StandardValidator;

impl StandardValidator {
    pub fn new() -> Self {
        Self
    }

    fn check_server(&self, settings: &ServerSettings) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for (field, value) in [
            ("url", &settings.url),
            ("username", &settings.username),
            ("password", &settings.password),
        ] {
            if value.as_deref().is_none_or(|v| v.trim().is_empty()) {
                issues.push(ValidationIssue::error(format!(
                    "missing required field `{field}`"
                )));
            }
        }

        if let Some(url) = settings.url.as_deref()
            && !url.trim().is_empty()
        {
            match Url::parse(url.trim()) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
                Ok(parsed) => issues.push(ValidationIssue::error(format!(
                    "unsupported URL scheme `{}` in `{url}`",
                    parsed.scheme()
                ))),
                Err(e) => issues.push(ValidationIssue::error(format!("invalid url `{url}`: {e}"))),
            }
        }

        if settings.threshold == 0 {
            issues.push(ValidationIssue::warning(
                "threshold is 0: every non-empty purge aborts unless forced",
            ));
        }

        issues
    }
}

impl Default for StandardValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigValidator for StandardValidator {
    fn validate_config(&self, config: &PurgeFile) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        match &config.nextcloud {
            Some(settings) => issues.extend(self.check_server(settings)),
            None => issues.push(ValidationIssue::error("missing [nextcloud] section")),
        }

        if config.rule_definitions().is_empty() {
            issues.push(ValidationIssue::error("no patterns specified"));
        }

        for block in &config.patterns {
            issues.extend(self.validate_pattern(block));
        }

        issues
    }

    fn validate_pattern(&self, block: &PatternBlock) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let Some(pattern) = block.pattern.as_deref() else {
            return issues;
        };
        if pattern.trim().is_empty() {
            return issues;
        }

        if let Err(e) = Regex::new(&format!("^(?:{pattern})")) {
            issues.push(ValidationIssue::error(format!(
                "invalid pattern `{pattern}`: {e}"
            )));
            return issues;
        }

        if matches!(pattern, ".*" | ".+" | "^.*") {
            issues.push(ValidationIssue::warning(format!(
                "pattern `{pattern}` matches every item in the trash bin"
            )));
        }

        issues
    }
}
