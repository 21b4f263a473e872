//! Embedding error types.
//!
//! Request-level failures (`Tokenization`, `Inference`, `Timeout`) leave the
//! process healthy. `UnexpectedOutputShape` and `NonNumericComponent` mean the
//! model and the adapters disagree and will fail every request the same way.

use std::time::Duration;

use thiserror::Error;

/// Errors from embedding, pooling, catalog, and scoring operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Text could not be encoded by the tokenizer.
    #[error("Tokenization failed: {0}")]
    Tokenization(String),

    /// The inference runtime rejected the inputs or failed internally.
    #[error("Inference failed: {0}")]
    Inference(String),

    /// The model output has a rank or shape the pooling engine cannot handle.
    #[error("Unexpected model output shape: {0}")]
    UnexpectedOutputShape(String),

    /// A model output component is not a number.
    #[error("Non-numeric embedding component: {0}")]
    NonNumericComponent(String),

    /// Two vectors that must share a dimension do not.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the catalog (or the first vector seen).
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },

    /// A catalog already holds a record with this id.
    #[error("Duplicate category id: {0}")]
    DuplicateId(String),

    /// Inference did not finish within the configured bound.
    #[error("Inference timed out after {0:?}")]
    Timeout(Duration),

    /// Model or tokenizer could not be loaded.
    #[error("Model initialization failed: {0}")]
    ModelInit(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Filesystem error (preserves source chain).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error (preserves source chain).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic internal error.
    #[error("{0}")]
    Internal(String),
}

impl EmbeddingError {
    /// Model/adapter contract violations that no retry will fix.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedOutputShape(_)
                | Self::NonNumericComponent(_)
                | Self::ModelInit(_)
                | Self::Config(_)
        )
    }

    /// Failures that may succeed when the caller tries again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Inference(_) | Self::Timeout(_))
    }

    /// Stable snake_case name of the variant, used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Tokenization(_) => "tokenization",
            Self::Inference(_) => "inference",
            Self::UnexpectedOutputShape(_) => "unexpected_output_shape",
            Self::NonNumericComponent(_) => "non_numeric_component",
            Self::DimensionMismatch { .. } => "dimension_mismatch",
            Self::DuplicateId(_) => "duplicate_id",
            Self::Timeout(_) => "timeout",
            Self::ModelInit(_) => "model_init",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;
