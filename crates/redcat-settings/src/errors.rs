//! Settings error types.

use std::path::PathBuf;

use thiserror::Error;

/// Why a settings file could not become a [`crate::RedcatSettings`].
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("cannot read redcat settings at {}: {source}", path.display())]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// The file is not JSON, or a field has the wrong type.
    #[error("redcat settings are not valid JSON for the schema: {0}")]
    Json(#[from] serde_json::Error),
    /// A merged value breaks a constraint, e.g. a template without `{label}`.
    #[error("setting {key} {reason}")]
    Invalid {
        /// camelCase path of the offending setting, e.g. `embedder.maxLength`.
        key: &'static str,
        /// What the value must satisfy.
        reason: String,
    },
}

impl SettingsError {
    pub(crate) fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;
