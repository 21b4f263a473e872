//! # redcat-embeddings
//!
//! Turns category labels and search queries into dense vectors and checks
//! the resulting catalog by cosine nearest-neighbor search.
//!
//! - [`tokenizer`] / [`runtime`]: adapter contracts for the external
//!   tokenizer and forward-pass engine
//! - [`pooling`]: rank dispatch, attention-masked mean pooling, sanitization
//! - [`service`]: single-text embedding, sync and async
//! - [`catalog`]: batch pipeline, dedup, catalog JSON I/O
//! - [`similarity`] / [`coverage`]: top-k validation and id coverage
//!
//! The ONNX Runtime adapters live behind the `ort` feature; [`mock`]
//! provides deterministic adapters that need no model files.

#![deny(unsafe_code)]

pub mod catalog;
pub mod config;
pub mod coverage;
pub mod errors;
pub mod mock;
pub mod normalize;
#[cfg(feature = "ort")]
pub mod ort_service;
pub mod pooling;
pub mod runtime;
pub mod service;
pub mod similarity;
pub mod tokenizer;

pub use catalog::{Catalog, CatalogBuilder, CategoryId, CategoryRecord, CategoryRow, read_rows};
pub use config::EmbeddingConfig;
pub use coverage::{CoverageReport, coverage};
pub use errors::{EmbeddingError, Result};
pub use pooling::{PooledOutput, pool, pool_and_sanitize};
pub use runtime::{InferenceRuntime, RawModelOutput, TensorData};
pub use service::{BlockingEmbeddingService, EmbeddingService, TextEmbedder};
pub use similarity::{ScoredMatch, SimilarityValidator};
pub use tokenizer::{TextTokenizer, TokenizedInput};

/// Load the ONNX adapters described by `config` and bind them into a [`TextEmbedder`].
///
/// Blocking: may download model files and always parses the model.
#[cfg(feature = "ort")]
pub fn load_onnx_embedder(config: &EmbeddingConfig) -> Result<TextEmbedder> {
    use std::sync::Arc;

    let (model, tokenizer) = ort_service::resolve_model_files(config)?;
    let tokenizer = ort_service::HfTokenizer::from_file(&tokenizer, config.max_length)?;
    let runtime = ort_service::OrtRuntime::load(&model, config)?;
    TextEmbedder::new(Arc::new(tokenizer), Arc::new(runtime), config.max_length)
}
