//! Embedder, catalog, and validation settings.

use serde::{Deserialize, Serialize};

/// Placeholder substituted with the category label in [`CatalogSettings::template`].
pub const LABEL_PLACEHOLDER: &str = "{label}";

/// Tokenizer, model, and inference runtime settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbedderSettings {
    /// Path to the ONNX model file.
    pub model_path: String,
    /// Path to `tokenizer.json`, or a directory containing it.
    pub tokenizer_path: String,
    /// Fixed token sequence length (pad / truncate target).
    pub max_length: usize,
    /// Hugging Face repo to fetch the model from when the local files are missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_repo: Option<String>,
    /// Download cache for `model_repo` (may contain `~`).
    pub cache_dir: String,
    /// ONNX Runtime intra-op threads per session.
    pub intra_threads: usize,
    /// Number of inference sessions; 1 serializes every forward pass.
    pub session_pool_size: usize,
    /// Upper bound on a single inference call in the HTTP path (0 disables).
    pub request_timeout_ms: u64,
}

impl Default for EmbedderSettings {
    fn default() -> Self {
        Self {
            model_path: "models/e5-multilingual-large/onnx/model_qint8_avx512_vnni.onnx"
                .to_string(),
            tokenizer_path: "models/e5-multilingual-large/onnx".to_string(),
            max_length: 128,
            model_repo: None,
            cache_dir: "~/.redcat/models".to_string(),
            intra_threads: 2,
            session_pool_size: 1,
            request_timeout_ms: 30_000,
        }
    }
}

/// Duplicate `category_id` resolution in the batch pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DedupPolicy {
    /// Keep the first row seen for an id.
    KeepFirst,
    /// Keep the last row seen for an id, at the position of that last row.
    #[default]
    KeepLast,
}

/// Batch catalog pipeline settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogSettings {
    /// Embedding text template; `{label}` is replaced with the category label.
    pub template: String,
    /// Duplicate id policy.
    pub dedup: DedupPolicy,
    /// Log progress every N embedded rows.
    pub progress_every: usize,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            template: format!("passage: place category: {LABEL_PLACEHOLDER}"),
            dedup: DedupPolicy::KeepLast,
            progress_every: 1000,
        }
    }
}

/// Similarity validator settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationSettings {
    /// Number of matches to report.
    pub top_k: usize,
    /// Norms below this are treated as 1.0.
    pub epsilon: f64,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            top_k: 10,
            epsilon: 1e-9,
        }
    }
}
