//! Error types for kitprep
//!
//! All modules use `KitprepResult<T>` as their return type.

use crate::deps::ValidationIssue;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for kitprep operations
pub type KitprepResult<T> = Result<T, KitprepError>;

/// All errors that can occur in kitprep
#[derive(Error, Debug)]
pub enum KitprepError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Estimation errors
    #[error("Cannot estimate download: {reason}")]
    Estimation { reason: String },

    // Prefetch errors
    #[error("A prefetch is already running for {}", cache_path.display())]
    PrefetchAlreadyRunning { cache_path: PathBuf },

    #[error("Prefetch failed with exit code {exit_code}: {stderr}")]
    PrefetchFailed { exit_code: i32, stderr: String },

    #[error("Prefetch cancelled for {}", cache_path.display())]
    PrefetchCancelled { cache_path: PathBuf },

    // Validation errors
    #[error("{} dependency check(s) failed: {}", issues.len(), summarize(issues))]
    ValidationFailure { issues: Vec<ValidationIssue> },

    #[error("Registry lookup failed at {url}: {reason}")]
    Registry { url: String, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl KitprepError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a config error for a declaration or settings file
    pub fn config(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether the caller can simply re-issue the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PrefetchAlreadyRunning { .. }
                | Self::PrefetchFailed { .. }
                | Self::PrefetchCancelled { .. }
                | Self::Registry { .. }
        )
    }

    /// Process exit code for the CLI front end
    ///
    /// A failed prefetch passes the child's code through; OS-level and
    /// transport failures use 2 so they are never mistaken for a failed check.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::PrefetchFailed { exit_code, .. } => match u8::try_from(*exit_code) {
                Ok(0) | Err(_) => 1,
                Ok(code) => code,
            },
            Self::Io { .. }
            | Self::CommandFailed { .. }
            | Self::ConfigDirCreate { .. }
            | Self::Registry { .. } => 2,
            _ => 1,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::PrefetchAlreadyRunning { .. } => {
                Some("Wait for the running prefetch to finish, then check: kitprep status")
            }
            Self::PrefetchFailed { .. } | Self::PrefetchCancelled { .. } => {
                Some("The cache is resumable. Re-run: kitprep prefetch")
            }
            Self::Estimation { .. } => Some("Pass a positive value, e.g. --bandwidth 50"),
            Self::ValidationFailure { .. } => {
                Some("Fix the [dependencies] table in the app's dependencies.toml")
            }
            Self::Registry { .. } => Some("Check registry.url or retry without --check-registry"),
            _ => None,
        }
    }
}
