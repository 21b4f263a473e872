//! Pooling & sanitization engine.
//!
//! Model exports disagree on what their primary output holds: some return
//! per-token hidden states `(1, seq_len, dim)`, some a pre-pooled sentence
//! embedding `(1, dim)`, some a bare `(dim,)` vector. [`PooledOutput`] resolves
//! the rank once per call and [`pool`] reduces every variant to one vector.
//! [`pool_and_sanitize`] is the single entry point used by the service and
//! the batch pipeline; its output never contains NaN or infinities.

use tracing::warn;

use crate::errors::{EmbeddingError, Result};
use crate::normalize::sanitize_in_place;
use crate::runtime::RawModelOutput;

/// Model output resolved by rank.
#[derive(Clone, Debug, PartialEq)]
pub enum PooledOutput {
    /// Rank 1 `(dim,)`: already one vector.
    RawVector(Vec<f32>),
    /// Rank 2 `(batch, dim)`: pre-pooled; holds the first row.
    PooledBatch(Vec<f32>),
    /// Rank 3 `(batch, seq_len, dim)`: token embeddings of the first item, row-major.
    TokenSequence {
        /// Number of token positions.
        seq_len: usize,
        /// Hidden size.
        dim: usize,
        /// `seq_len * dim` values.
        tokens: Vec<f32>,
    },
}

impl PooledOutput {
    /// Validate a raw runtime tensor and classify it by rank.
    pub fn from_raw(raw: RawModelOutput) -> Result<Self> {
        let (shape, values) = raw.into_components()?;
        match shape.as_slice() {
            [_] => Ok(Self::RawVector(values)),
            [batch, dim] => {
                ensure_non_empty_batch(*batch, &shape)?;
                Ok(Self::PooledBatch(values[..*dim].to_vec()))
            }
            [batch, seq_len, dim] => {
                ensure_non_empty_batch(*batch, &shape)?;
                let first = seq_len * dim;
                Ok(Self::TokenSequence {
                    seq_len: *seq_len,
                    dim: *dim,
                    tokens: values[..first].to_vec(),
                })
            }
            _ => Err(EmbeddingError::UnexpectedOutputShape(format!(
                "rank {} output {shape:?}; expected (dim,), (1, dim) or (1, seq_len, dim)",
                shape.len()
            ))),
        }
    }

    /// Dimension of the vector this output pools to.
    pub fn dim(&self) -> usize {
        match self {
            Self::RawVector(v) | Self::PooledBatch(v) => v.len(),
            Self::TokenSequence { dim, .. } => *dim,
        }
    }
}

fn ensure_non_empty_batch(batch: usize, shape: &[usize]) -> Result<()> {
    if batch == 0 {
        return Err(EmbeddingError::UnexpectedOutputShape(format!(
            "empty batch in output {shape:?}"
        )));
    }
    Ok(())
}

/// Reduce a classified output to one vector.
///
/// Token sequences use attention-masked mean pooling: positions with mask 0
/// are excluded and the sum is divided by the mask total. An all-zero mask
/// falls back to the unweighted mean over every position.
pub fn pool(output: &PooledOutput, attention_mask: &[i64]) -> Result<Vec<f32>> {
    match output {
        PooledOutput::RawVector(v) | PooledOutput::PooledBatch(v) => Ok(v.clone()),
        PooledOutput::TokenSequence {
            seq_len,
            dim,
            tokens,
        } => {
            if attention_mask.len() != *seq_len {
                return Err(EmbeddingError::UnexpectedOutputShape(format!(
                    "model returned {seq_len} token positions for a mask of {}",
                    attention_mask.len()
                )));
            }
            Ok(masked_mean(tokens, *seq_len, *dim, attention_mask))
        }
    }
}

fn masked_mean(tokens: &[f32], seq_len: usize, dim: usize, mask: &[i64]) -> Vec<f32> {
    if dim == 0 {
        return Vec::new();
    }
    let mask_total: f64 = mask.iter().map(|&m| m as f64).sum();
    let mut sums = vec![0.0f64; dim];

    if mask_total == 0.0 {
        if seq_len == 0 {
            return vec![0.0; dim];
        }
        for row in tokens.chunks_exact(dim) {
            for (acc, &x) in sums.iter_mut().zip(row) {
                *acc += f64::from(x);
            }
        }
        return sums.into_iter().map(|s| (s / seq_len as f64) as f32).collect();
    }

    for (row, &weight) in tokens.chunks_exact(dim).zip(mask) {
        if weight == 0 {
            continue;
        }
        let weight = weight as f64;
        for (acc, &x) in sums.iter_mut().zip(row) {
            *acc += f64::from(x) * weight;
        }
    }
    sums.into_iter().map(|s| (s / mask_total) as f32).collect()
}

/// Classify, pool, and sanitize one runtime output.
pub fn pool_and_sanitize(raw: RawModelOutput, attention_mask: &[i64]) -> Result<Vec<f32>> {
    let output = PooledOutput::from_raw(raw)?;
    let mut vector = pool(&output, attention_mask)?;
    let replaced = sanitize_in_place(&mut vector);
    if replaced > 0 {
        warn!(replaced, dim = vector.len(), "replaced non-finite embedding components with 0.0");
    }
    Ok(vector)
}
