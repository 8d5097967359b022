use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::builders::patterns::{PatternRuleSet, RuleDefinition};
use crate::builders::reporter::ReportingMode;
use crate::builders::validator::{ConfigValidator, Severity, StandardValidator};
use crate::core::error::PurgeError;

pub const DEFAULT_MINIMUM_AGE: u32 = 30;
pub const DEFAULT_THRESHOLD: usize = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

fn default_minimum_age() -> u32 {
    DEFAULT_MINIMUM_AGE
}

fn default_threshold() -> usize {
    DEFAULT_THRESHOLD
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// The `[nextcloud]` table of a configuration unit.
///
/// Credentials are optional at the serde level so that a missing one is
/// reported by the validator with a readable message instead of a TOML error.
#[derive(Deserialize, Clone)]
pub struct ServerSettings {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_minimum_age")]
    pub minimum_age: u32,
    #[serde(default = "default_threshold")]
    pub threshold: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl fmt::Debug for ServerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerSettings")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("minimum_age", &self.minimum_age)
            .field("threshold", &self.threshold)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// One `[[pattern]]` block.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PatternBlock {
    pub name: Option<String>,
    pub pattern: Option<String>,
    pub minimum_age: Option<u32>,
}

/// A configuration unit exactly as it appears on disk.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PurgeFile {
    pub nextcloud: Option<ServerSettings>,
    #[serde(default, rename = "pattern")]
    pub patterns: Vec<PatternBlock>,
}

impl PurgeFile {
    /// Rule definitions in declaration order. Blocks without a pattern, or
    /// with a blank one, are not rules and are left out.
    pub fn rule_definitions(&self) -> Vec<RuleDefinition> {
        self.patterns
            .iter()
            .filter_map(|block| {
                let pattern = block.pattern.as_deref()?;
                if pattern.trim().is_empty() {
                    return None;
                }
                Some(RuleDefinition {
                    name: block.name.clone(),
                    pattern: pattern.to_string(),
                    minimum_age: block.minimum_age,
                })
            })
            .collect()
    }
}

/// The knobs the purge decision depends on, fixed for one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeConfig {
    /// Minimum age in days for rules without their own override.
    pub default_minimum_age: u32,
    /// Maximum number of deletions approved without `force`.
    pub threshold: usize,
    pub force: bool,
    pub dry_run: bool,
}

/// Options shared by every unit of one invocation, taken from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub dry_run: bool,
    pub force: bool,
    /// Subdirectory levels the trash listing descends into.
    pub depth: u32,
    pub mode: ReportingMode,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            force: false,
            depth: 1,
            mode: ReportingMode::Silent,
        }
    }
}

/// Where and as whom to connect.
#[derive(Clone)]
pub struct ConnectionSettings {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// A validated configuration unit, ready to run.
#[derive(Debug, Clone)]
pub struct PurgeUnit {
    pub path: PathBuf,
    pub connection: ConnectionSettings,
    pub rules: PatternRuleSet,
    pub config: PurgeConfig,
}

pub trait ConfigProvider {
    fn load_config(&self) -> Result<PurgeFile, PurgeError>;
    fn get_config_path(&self) -> &Path;
}

/// Reads one configuration-unit file.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Loads, validates and compiles the unit, folding in the CLI options.
    ///
    /// Validation warnings are logged; any validation error rejects the unit
    /// with `PurgeError::Config`.
    pub fn load_unit(&self, options: &RunOptions) -> Result<PurgeUnit, PurgeError> {
        let path = self.get_config_path();
        let file = self.load_config()?;

        let issues = StandardValidator::new().validate_config(&file);
        let mut errors = Vec::new();
        for issue in issues {
            match issue.severity {
                Severity::Warning => {
                    warn!(path = %path.display(), "{}", issue.message)
                }
                Severity::Error => errors.push(issue.message),
            }
        }
        if !errors.is_empty() {
            return Err(PurgeError::config(path, errors.join("; ")));
        }

        let settings = file
            .nextcloud
            .as_ref()
            .ok_or_else(|| PurgeError::config(path, "missing [nextcloud] section"))?;
        let connection = ConnectionSettings {
            base_url: required(path, "url", &settings.url)?,
            username: required(path, "username", &settings.username)?,
            password: required(path, "password", &settings.password)?,
            timeout: Duration::from_secs(settings.timeout_secs),
        };
        let rules = PatternRuleSet::new(file.rule_definitions())?;
        let config = PurgeConfig {
            default_minimum_age: settings.minimum_age,
            threshold: settings.threshold,
            force: options.force,
            dry_run: options.dry_run,
        };

        debug!(
            path = %path.display(),
            rules = rules.len(),
            ?config,
            "configuration unit loaded"
        );

        Ok(PurgeUnit {
            path: path.to_path_buf(),
            connection,
            rules,
            config,
        })
    }
}

impl ConfigProvider for ConfigManager {
    fn load_config(&self) -> Result<PurgeFile, PurgeError> {
        let content = fs::read_to_string(&self.config_path).map_err(|e| {
            PurgeError::config(&self.config_path, format!("failed to read config file: {e}"))
        })?;

        toml::from_str(&content).map_err(|e| {
            PurgeError::config(&self.config_path, format!("failed to parse config file: {e}"))
        })
    }

    fn get_config_path(&self) -> &Path {
        &self.config_path
    }
}

fn required(path: &Path, field: &str, value: &Option<String>) -> Result<String, PurgeError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| PurgeError::config(path, format!("missing required field `{field}`")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::patterns::PatternRule;
    use tempfile::tempdir;

    const FULL: &str = r#"
[nextcloud]
url = "https://cloud.example.com"
username = "alice"
password = "s3cret"
minimum_age = 14
threshold = 25

[[pattern]]
name = "temp files"
pattern = "tempfile-.*"
minimum_age = 7

[[pattern]]
pattern = ""

[[pattern]]
name = "no pattern here"

[[pattern]]
pattern = "cache-.*"
"#;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("unit.toml");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_unit_keeps_order_and_skips_blank_patterns() {
        let (_dir, path) = write_config(FULL);

        let unit = ConfigManager::new(&path)
            .load_unit(&RunOptions::default())
            .unwrap();

        let patterns: Vec<&str> = unit.rules.iter().map(PatternRule::pattern).collect();
        assert_eq!(patterns, ["tempfile-.*", "cache-.*"]);
        assert_eq!(unit.rules.iter().next().unwrap().minimum_age_override(), Some(7));
        assert_eq!(unit.config.default_minimum_age, 14);
        assert_eq!(unit.config.threshold, 25);
        assert_eq!(unit.connection.username, "alice");
        assert_eq!(unit.path, path);
    }

    #[test]
    fn test_defaults_apply() {
        let (_dir, path) = write_config(
            r#"
[nextcloud]
url = "https://cloud.example.com"
username = "alice"
password = "s3cret"

[[pattern]]
pattern = "x"
"#,
        );
        let options = RunOptions {
            dry_run: true,
            force: true,
            ..RunOptions::default()
        };

        let unit = ConfigManager::new(&path).load_unit(&options).unwrap();

        assert_eq!(
            unit.config,
            PurgeConfig {
                default_minimum_age: DEFAULT_MINIMUM_AGE,
                threshold: DEFAULT_THRESHOLD,
                force: true,
                dry_run: true,
            }
        );
        assert_eq!(unit.connection.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_missing_credentials_reject_the_unit() {
        let (_dir, path) = write_config(
            r#"
[nextcloud]
url = "https://cloud.example.com"

[[pattern]]
pattern = "x"
"#,
        );

        let err = ConfigManager::new(&path)
            .load_unit(&RunOptions::default())
            .unwrap_err();

        let message = err.to_string();
        assert!(matches!(err, PurgeError::Config { .. }));
        assert!(message.contains("username"), "{message}");
        assert!(message.contains("password"), "{message}");
    }

    #[test]
    fn test_unreadable_file_is_a_config_error() {
        let dir = tempdir().unwrap();
        let err = ConfigManager::new(dir.path().join("missing.toml"))
            .load_unit(&RunOptions::default())
            .unwrap_err();
        assert!(matches!(err, PurgeError::Config { .. }));
    }

    #[test]
    fn test_debug_output_redacts_password() {
        let (_dir, path) = write_config(FULL);
        let file = ConfigManager::new(&path).load_config().unwrap();
        let unit = ConfigManager::new(&path)
            .load_unit(&RunOptions::default())
            .unwrap();

        assert!(!format!("{file:?}").contains("s3cret"));
        assert!(!format!("{unit:?}").contains("s3cret"));
    }
}
