//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`RedcatSettings::default()`]
//! 2. If the settings file exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Validate cross-field constraints
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::RedcatSettings;

/// Env var naming an explicit settings file.
pub const SETTINGS_PATH_ENV: &str = "REDCAT_SETTINGS";

/// Resolve the settings file path: `$REDCAT_SETTINGS`, else `~/.redcat/settings.json`.
pub fn settings_path() -> PathBuf {
    if let Some(explicit) = read_env_string(SETTINGS_PATH_ENV) {
        return PathBuf::from(explicit);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".redcat").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<RedcatSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON or the merged result fails validation, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<RedcatSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Defaults deep-merged with the file at `path`, without env overrides.
pub fn load_file_layer(path: &Path) -> Result<RedcatSettings> {
    let defaults = serde_json::to_value(RedcatSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply process environment overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut RedcatSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary variable lookup.
///
/// Invalid values are ignored with a warning and the file/default value is kept.
pub fn apply_overrides_from<F>(settings: &mut RedcatSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let string = |name: &str| lookup(name).filter(|v| !v.is_empty());
    let ranged = |name: &str, min: u64, max: u64| {
        let raw = lookup(name)?;
        let parsed = parse_u64_range(&raw, min, max);
        if parsed.is_none() {
            warn!(key = name, value = %raw, "invalid numeric env var, ignoring");
        }
        parsed
    };

    // ── Embedder ────────────────────────────────────────────────────
    if let Some(v) = string("EMBEDDER_MODEL_PATH") {
        settings.embedder.model_path = v;
    }
    if let Some(v) = string("EMBEDDER_TOKENIZER_PATH") {
        settings.embedder.tokenizer_path = v;
    }
    if let Some(v) = ranged("EMBEDDER_MAX_LEN", 1, 8192) {
        settings.embedder.max_length = v as usize;
    }
    if let Some(v) = string("EMBEDDER_MODEL") {
        settings.embedder.model_repo = Some(v);
    }
    if let Some(v) = string("EMBEDDER_CACHE_DIR") {
        settings.embedder.cache_dir = v;
    }
    if let Some(v) = ranged("EMBEDDER_TIMEOUT_MS", 0, 3_600_000) {
        settings.embedder.request_timeout_ms = v;
    }

    // ── Catalog / validation ────────────────────────────────────────
    if let Some(v) = string("EMBEDDER_TEMPLATE") {
        settings.catalog.template = v;
    }
    if let Some(v) = ranged("REDCAT_TOP_K", 1, 10_000) {
        settings.validation.top_k = v as usize;
    }

    // ── Server / logging ────────────────────────────────────────────
    if let Some(v) = string("REDCAT_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = ranged("REDCAT_PORT", 1, 65535) {
        settings.server.port = v as u16;
    }
    if let Some(v) = string("REDCAT_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
