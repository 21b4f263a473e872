//! Embedding configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use redcat_settings::EmbedderSettings;
use serde::{Deserialize, Serialize};

/// File name looked up when `tokenizer_path` points at a directory.
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Immutable configuration for the embedding engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddingConfig {
    /// ONNX model file.
    pub model_path: String,
    /// `tokenizer.json` file or the directory containing it.
    pub tokenizer_path: String,
    /// Fixed token sequence length.
    pub max_length: usize,
    /// Optional Hugging Face repo to fetch missing files from.
    pub model_repo: Option<String>,
    /// Download cache directory (may contain `~`).
    pub cache_dir: String,
    /// ONNX Runtime intra-op threads per session.
    pub intra_threads: usize,
    /// Number of independently locked inference sessions.
    pub session_pool_size: usize,
    /// Inference bound for async callers, in milliseconds (0 disables).
    pub request_timeout_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self::from_settings(&EmbedderSettings::default())
    }
}

impl EmbeddingConfig {
    /// Create config from settings.
    pub fn from_settings(s: &EmbedderSettings) -> Self {
        Self {
            model_path: s.model_path.clone(),
            tokenizer_path: s.tokenizer_path.clone(),
            max_length: s.max_length,
            model_repo: s.model_repo.clone(),
            cache_dir: s.cache_dir.clone(),
            intra_threads: s.intra_threads,
            session_pool_size: s.session_pool_size,
            request_timeout_ms: s.request_timeout_ms,
        }
    }

    /// Resolve the cache directory, expanding `~/` to the home directory.
    pub fn resolved_cache_dir(&self) -> String {
        if self.cache_dir.starts_with("~/") {
            if let Ok(home) = std::env::var("HOME") {
                return format!("{}{}", home, &self.cache_dir[1..]);
            }
        }
        self.cache_dir.clone()
    }

    /// The tokenizer file, appending [`TOKENIZER_FILE`] when the path is a directory.
    pub fn tokenizer_file(&self) -> PathBuf {
        let path = Path::new(&self.tokenizer_path);
        if path.is_dir() {
            path.join(TOKENIZER_FILE)
        } else {
            path.to_path_buf()
        }
    }

    /// Inference bound, or `None` when disabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }
}
