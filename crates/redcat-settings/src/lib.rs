//! # redcat-settings
//!
//! Configuration for the redcat embedder, loaded from three layers
//! (in priority order):
//! 1. **Compiled defaults**: [`RedcatSettings::default()`]
//! 2. **User file**: `$REDCAT_SETTINGS` or `~/.redcat/settings.json`
//! 3. **Environment variables**: `EMBEDDER_*` / `REDCAT_*` overrides
//!
//! Settings are loaded once by the binary and passed down by reference.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides_from, deep_merge, load_file_layer, load_settings,
    load_settings_from_path, settings_path,
};
pub use types::*;
