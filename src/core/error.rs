use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a whole configuration unit, or that reject a rule set
/// before any work is done.
///
/// Per-item deletion failures are not part of this enum: they are reported as
/// [`DeleteError`] and folded into the purge outcome of a single item.
#[derive(Debug, Error)]
pub enum PurgeError {
    /// A pattern rule did not compile as a regular expression.
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A configuration unit is missing a required field or could not be read.
    #[error("invalid configuration in {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    /// The trash listing did not come back with a success status.
    #[error("failed to list trashbin{}: {message}", status_suffix(.status))]
    Transport { status: Option<u16>, message: String },

    /// The trash listing payload could not be parsed.
    #[error("malformed trashbin listing: {0}")]
    Parse(String),
}

impl PurgeError {
    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        PurgeError::Config {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A deletion request that never produced an HTTP status (connection refused,
/// timeout, TLS failure, ...).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}{}", status_suffix(.status_code))]
pub struct DeleteError {
    pub status_code: Option<u16>,
    pub message: String,
}

impl DeleteError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status_code: None,
            message: message.into(),
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (status {code})"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_mentions_status() {
        let err = PurgeError::Transport {
            status: Some(401),
            message: "Unauthorized".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to list trashbin (status 401): Unauthorized"
        );
    }

    #[test]
    fn test_config_error_mentions_path() {
        let err = PurgeError::config("/etc/purge/alice.toml", "missing url");
        assert_eq!(
            err.to_string(),
            "invalid configuration in /etc/purge/alice.toml: missing url"
        );
    }

    #[test]
    fn test_delete_error_without_status() {
        let err = DeleteError::transport("connection refused");
        assert_eq!(err.to_string(), "connection refused");
    }
}
