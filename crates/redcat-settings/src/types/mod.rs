//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`,
//! so a settings file only needs the fields it changes.

mod embedder;
mod server;

pub use embedder::*;
pub use server::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "embedder": { "maxLength": 256 },
///   "catalog": { "dedup": "keepFirst" },
///   "server": { "port": 9000 }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RedcatSettings {
    /// Tokenizer / model / inference settings.
    pub embedder: EmbedderSettings,
    /// Batch catalog pipeline settings.
    pub catalog: CatalogSettings,
    /// Similarity validator settings.
    pub validation: ValidationSettings,
    /// HTTP server settings.
    pub server: ServerSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl RedcatSettings {
    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.embedder.max_length == 0 {
            return Err(SettingsError::invalid(
                "embedder.maxLength",
                "must be greater than 0",
            ));
        }
        if self.embedder.session_pool_size == 0 {
            return Err(SettingsError::invalid(
                "embedder.sessionPoolSize",
                "must be greater than 0",
            ));
        }
        if !self.catalog.template.contains(LABEL_PLACEHOLDER) {
            return Err(SettingsError::invalid(
                "catalog.template",
                format!("must contain {LABEL_PLACEHOLDER}"),
            ));
        }
        if self.validation.top_k == 0 {
            return Err(SettingsError::invalid(
                "validation.topK",
                "must be greater than 0",
            ));
        }
        if !self.validation.epsilon.is_finite() || self.validation.epsilon <= 0.0 {
            return Err(SettingsError::invalid(
                "validation.epsilon",
                "must be a positive finite number",
            ));
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
