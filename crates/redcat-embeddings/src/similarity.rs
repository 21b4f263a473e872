//! Cosine top-k validator over a catalog.

use std::fmt;

use redcat_settings::ValidationSettings;
use serde::Serialize;
use tracing::{debug, warn};

use crate::catalog::{Catalog, CategoryId};
use crate::errors::{EmbeddingError, Result};
use crate::normalize::{cosine_similarity, sanitize_in_place};

/// One ranked catalog entry.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoredMatch {
    /// Category id.
    pub id: CategoryId,
    /// Category label.
    pub label: String,
    /// Cosine similarity in `[-1, 1]`.
    pub score: f64,
}

impl fmt::Display for ScoredMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}  {}  {}", self.score, self.id, self.label)
    }
}

/// Ranks catalog entries against a query vector.
#[derive(Clone, Copy, Debug)]
pub struct SimilarityValidator {
    epsilon: f64,
}

impl Default for SimilarityValidator {
    fn default() -> Self {
        Self::from_settings(&ValidationSettings::default())
    }
}

impl SimilarityValidator {
    /// Validator with the given norm guard.
    pub fn new(epsilon: f64) -> Self {
        Self { epsilon }
    }

    /// Validator from settings.
    pub fn from_settings(settings: &ValidationSettings) -> Self {
        Self::new(settings.epsilon)
    }

    /// Top `k` entries by descending cosine score.
    ///
    /// Catalog vectors are sanitized in place first. Equal scores keep catalog
    /// order. An empty catalog yields no matches.
    pub fn top_k(&self, catalog: &mut Catalog, query: &[f32], k: usize) -> Result<Vec<ScoredMatch>> {
        let Some(expected) = catalog.dim() else {
            return Ok(Vec::new());
        };
        if query.len() != expected {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: query.len(),
            });
        }

        let replaced: usize = catalog
            .records_mut()
            .iter_mut()
            .map(|r| sanitize_in_place(&mut r.embedding))
            .sum();
        if replaced > 0 {
            warn!(replaced, "sanitized non-finite catalog components before scoring");
        }

        let mut query = query.to_vec();
        let _ = sanitize_in_place(&mut query);

        let mut matches: Vec<ScoredMatch> = catalog
            .records()
            .iter()
            .map(|r| ScoredMatch {
                id: r.category_id.clone(),
                label: r.category_label.clone(),
                score: cosine_similarity(&r.embedding, &query, self.epsilon),
            })
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(k);
        debug!(candidates = catalog.len(), k, returned = matches.len(), "scored catalog");
        Ok(matches)
    }
}
