//! Single-text embedding service.
//!
//! [`TextEmbedder`] is the synchronous tokenize → infer → pool path shared by
//! the HTTP surface and the batch pipeline. [`EmbeddingService`] is the async
//! contract the server depends on; [`BlockingEmbeddingService`] adapts a
//! `TextEmbedder` to it by running inference on the blocking pool with an
//! optional timeout.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::errors::{EmbeddingError, Result};
use crate::pooling::pool_and_sanitize;
use crate::runtime::InferenceRuntime;
use crate::tokenizer::TextTokenizer;

/// Tokenizer + runtime + sequence length, bound once and shared by reference.
#[derive(Clone)]
pub struct TextEmbedder {
    tokenizer: Arc<dyn TextTokenizer>,
    runtime: Arc<dyn InferenceRuntime>,
    max_length: usize,
}

impl std::fmt::Debug for TextEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextEmbedder")
            .field("max_length", &self.max_length)
            .finish_non_exhaustive()
    }
}

impl TextEmbedder {
    /// Bind adapters. `max_length` must be positive.
    pub fn new(
        tokenizer: Arc<dyn TextTokenizer>,
        runtime: Arc<dyn InferenceRuntime>,
        max_length: usize,
    ) -> Result<Self> {
        if max_length == 0 {
            return Err(EmbeddingError::Config("max_length must be > 0".into()));
        }
        Ok(Self {
            tokenizer,
            runtime,
            max_length,
        })
    }

    /// Embed one text.
    ///
    /// Leading and trailing whitespace is trimmed; an empty result yields an
    /// empty vector without touching the adapters. Any adapter failure is
    /// returned as-is.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let input = self.tokenizer.tokenize(text, self.max_length)?;
        let raw = self.runtime.run(&input)?;
        let vector = pool_and_sanitize(raw, &input.attention_mask)?;
        debug!(
            chars = text.len(),
            tokens = input.real_tokens(),
            dim = vector.len(),
            "embedded text"
        );
        Ok(vector)
    }
}

/// Async embedding contract used by request handlers.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Embed one text; empty or whitespace-only text yields an empty vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Whether the service can take requests.
    fn is_ready(&self) -> bool;

    /// Model dimension, once known (after the first non-empty embedding).
    fn dimensions(&self) -> Option<usize>;
}

/// Runs a [`TextEmbedder`] on tokio's blocking pool.
pub struct BlockingEmbeddingService {
    embedder: TextEmbedder,
    timeout: Option<Duration>,
    dim: AtomicUsize,
}

impl BlockingEmbeddingService {
    /// Wrap an embedder. `None` disables the timeout.
    pub fn new(embedder: TextEmbedder, timeout: Option<Duration>) -> Self {
        Self {
            embedder,
            timeout,
            dim: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingService for BlockingEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let embedder = self.embedder.clone();
        let owned = text.to_owned();
        let task = tokio::task::spawn_blocking(move || embedder.embed(&owned));

        let joined = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, task)
                .await
                .map_err(|_| EmbeddingError::Timeout(limit))?,
            None => task.await,
        };
        let vector =
            joined.map_err(|e| EmbeddingError::Internal(format!("join error: {e}")))??;

        if !vector.is_empty() {
            self.dim.store(vector.len(), Ordering::Relaxed);
        }
        Ok(vector)
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn dimensions(&self) -> Option<usize> {
        match self.dim.load(Ordering::Relaxed) {
            0 => None,
            d => Some(d),
        }
    }
}
