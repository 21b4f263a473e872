//! Deterministic adapters for tests and offline runs.
//!
//! [`MockTokenizer`] hashes whitespace-separated words into ids;
//! [`MockRuntime`] derives outputs from those ids with SHA-256, so the same
//! text always produces the same vector without any model files.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::errors::{EmbeddingError, Result};
use crate::runtime::{InferenceRuntime, RawModelOutput};
use crate::tokenizer::{TextTokenizer, TokenizedInput, fit_to_length};

const MOCK_VOCAB: u64 = 30_000;
const MOCK_PAD_ID: i64 = 0;

/// Whitespace tokenizer with hashed ids in `1..30000`; pad id is 0.
#[derive(Clone, Copy, Debug, Default)]
pub struct MockTokenizer;

impl MockTokenizer {
    /// Create a mock tokenizer.
    pub fn new() -> Self {
        Self
    }

    #[allow(clippy::cast_possible_wrap)]
    fn word_id(word: &str) -> i64 {
        let digest = Sha256::digest(word.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        (u64::from_le_bytes(head) % (MOCK_VOCAB - 1) + 1) as i64
    }
}

impl TextTokenizer for MockTokenizer {
    fn tokenize(&self, text: &str, max_length: usize) -> Result<TokenizedInput> {
        if text.contains('\0') {
            return Err(EmbeddingError::Tokenization(
                "text contains a NUL character".into(),
            ));
        }
        let ids: Vec<i64> = text.split_whitespace().map(Self::word_id).collect();
        let mask = vec![1; ids.len()];
        fit_to_length(ids, mask, max_length, MOCK_PAD_ID)
    }
}

#[derive(Clone, Debug)]
enum Behavior {
    TokenSequence(usize),
    Pooled(usize),
    Fixed(RawModelOutput),
    Failing(String),
}

/// Scripted inference runtime.
#[derive(Debug)]
pub struct MockRuntime {
    behavior: Behavior,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockRuntime {
    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Returns `(1, max_length, dim)` token embeddings, one hashed row per id.
    pub fn token_sequence(dim: usize) -> Self {
        Self::with_behavior(Behavior::TokenSequence(dim))
    }

    /// Returns a pre-pooled `(1, dim)` vector hashed from the unmasked ids.
    pub fn pooled(dim: usize) -> Self {
        Self::with_behavior(Behavior::Pooled(dim))
    }

    /// Returns the same output for every call.
    pub fn fixed(output: RawModelOutput) -> Self {
        Self::with_behavior(Behavior::Fixed(output))
    }

    /// Fails every call with [`EmbeddingError::Inference`].
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_behavior(Behavior::Failing(message.into()))
    }

    /// Sleep this long inside every `run`.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `run` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// `dim` values in `[-1, 1]` derived from `seed`.
fn hashed_vector(seed: &[u8], dim: usize) -> Vec<f32> {
    (0..dim)
        .map(|i| {
            let mut hasher = Sha256::new();
            hasher.update(seed);
            hasher.update((i as u64).to_le_bytes());
            let digest = hasher.finalize();
            let mut head = [0u8; 4];
            head.copy_from_slice(&digest[..4]);
            let unit = f64::from(u32::from_le_bytes(head)) / f64::from(u32::MAX);
            (unit * 2.0 - 1.0) as f32
        })
        .collect()
}

impl InferenceRuntime for MockRuntime {
    fn run(&self, input: &TokenizedInput) -> Result<RawModelOutput> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        match &self.behavior {
            Behavior::TokenSequence(dim) => {
                let data: Vec<f32> = input
                    .token_ids
                    .iter()
                    .flat_map(|id| hashed_vector(&id.to_le_bytes(), *dim))
                    .collect();
                Ok(RawModelOutput::f32(vec![1, input.len(), *dim], data))
            }
            Behavior::Pooled(dim) => {
                let seed: Vec<u8> = input
                    .token_ids
                    .iter()
                    .zip(&input.attention_mask)
                    .filter(|(_, m)| **m != 0)
                    .flat_map(|(id, _)| id.to_le_bytes())
                    .collect();
                Ok(RawModelOutput::f32(vec![1, *dim], hashed_vector(&seed, *dim)))
            }
            Behavior::Fixed(output) => Ok(output.clone()),
            Behavior::Failing(message) => Err(EmbeddingError::Inference(message.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizer_is_deterministic_and_padded() {
        let tok = MockTokenizer::new();
        let a = tok.tokenize("coffee shop", 6).unwrap();
        let b = tok.tokenize("coffee shop", 6).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 6);
        assert_eq!(a.real_tokens(), 2);
        assert_eq!(&a.token_ids[2..], &[0, 0, 0, 0]);
        assert!(a.token_ids[..2].iter().all(|&id| id > 0));
    }

    #[test]
    fn tokenizer_rejects_nul() {
        assert!(matches!(
            MockTokenizer::new().tokenize("a\0b", 4),
            Err(EmbeddingError::Tokenization(_))
        ));
    }

    #[test]
    fn token_sequence_shape_follows_input() {
        let input = MockTokenizer::new().tokenize("a b c", 5).unwrap();
        let out = MockRuntime::token_sequence(3).run(&input).unwrap();
        assert_eq!(out.shape, vec![1, 5, 3]);
        assert_eq!(out.data.len(), 15);
    }

    #[test]
    fn pooled_ignores_padding() {
        let rt = MockRuntime::pooled(4);
        let short = MockTokenizer::new().tokenize("bar", 4).unwrap();
        let long = MockTokenizer::new().tokenize("bar", 12).unwrap();
        assert_eq!(rt.run(&short).unwrap(), rt.run(&long).unwrap());
        assert_eq!(rt.calls(), 2);
    }

    #[test]
    fn hashed_values_in_unit_range() {
        assert!(hashed_vector(b"seed", 64).iter().all(|x| (-1.0..=1.0).contains(x)));
    }

    #[test]
    fn failing_runtime_reports_inference_error() {
        let input = MockTokenizer::new().tokenize("x", 2).unwrap();
        let err = MockRuntime::failing("boom").run(&input).unwrap_err();
        assert_eq!(err.to_string(), "Inference failed: boom");
    }
}
