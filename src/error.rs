//! Error types for tokens-bench
//!
//! Two families live here:
//!
//! - [`ConfigError`]: loading the models file or resolving `${VAR}` placeholders
//! - [`InvokeError`]: the tagged outcome of a single failed model invocation
//!
//! Invocation errors never abort a run. The runner records them against the
//! model that produced them and moves on.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration error
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file does not exist
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The config file exists but could not be read
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        /// Path that failed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid YAML or does not match the schema
    #[error("malformed config: {0}")]
    Parse(String),

    /// A model entry is missing a required key and no default covers it
    #[error("model '{model}' is missing required field '{field}'")]
    MissingField {
        /// Display name of the model entry
        model: String,
        /// Name of the missing field
        field: &'static str,
    },

    /// The config lists no models
    #[error("no models configured")]
    NoModels,

    /// A `${VAR}` placeholder refers to an unset or empty variable
    #[error("environment variable {0} is not set")]
    UnsetVariable(String),
}

impl From<serde_yaml_ng::Error> for ConfigError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// Classification of an invocation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Placeholder resolution failed for this model
    Config,
    /// Connection refused, DNS failure, reset, ...
    Network,
    /// The request exceeded the per-request timeout
    Timeout,
    /// HTTP 401 or 403
    Auth,
    /// Any other non-2xx status
    Api,
    /// The response body did not match the chat-completion schema
    Protocol,
    /// Anything else, including a panic inside the invocation
    Unknown,
}

impl ErrorKind {
    /// Short label used in reports and exports
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Config => "config",
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Auth => "auth",
            ErrorKind::Api => "api",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed model invocation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvokeError {
    /// Endpoint settings for this model could not be resolved
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport-level failure
    #[error("network error: {0}")]
    Network(String),

    /// No response within the configured timeout
    #[error("request timed out after {0:.1?}")]
    Timeout(Duration),

    /// The endpoint rejected the credential
    #[error("authentication failed ({status}): {body}")]
    Auth {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// The endpoint answered with a non-2xx status
    #[error("API error ({status}): {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// The response body had an unexpected shape
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Unclassified failure
    #[error("unexpected failure: {0}")]
    Unknown(String),
}

impl InvokeError {
    /// Get the classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            InvokeError::Config(_) => ErrorKind::Config,
            InvokeError::Network(_) => ErrorKind::Network,
            InvokeError::Timeout(_) => ErrorKind::Timeout,
            InvokeError::Auth { .. } => ErrorKind::Auth,
            InvokeError::Api { .. } => ErrorKind::Api,
            InvokeError::Protocol(_) => ErrorKind::Protocol,
            InvokeError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Classify a non-2xx HTTP status
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => InvokeError::Auth { status, body },
            _ => InvokeError::Api { status, body },
        }
    }
}

impl From<ConfigError> for InvokeError {
    fn from(err: ConfigError) -> Self {
        InvokeError::Config(err.to_string())
    }
}
