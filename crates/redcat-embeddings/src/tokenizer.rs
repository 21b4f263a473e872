//! Tokenizer adapter contract.

use crate::errors::{EmbeddingError, Result};

/// Fixed-length token ids and attention mask for one text.
///
/// `token_ids.len() == attention_mask.len() == max_length` always holds for
/// values produced by [`fit_to_length`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenizedInput {
    /// Token ids, padded with the pad id.
    pub token_ids: Vec<i64>,
    /// 1 for real tokens, 0 for padding.
    pub attention_mask: Vec<i64>,
}

impl TokenizedInput {
    /// Sequence length (equal to the configured maximum).
    pub fn len(&self) -> usize {
        self.token_ids.len()
    }

    /// Whether the sequence has no positions at all.
    pub fn is_empty(&self) -> bool {
        self.token_ids.is_empty()
    }

    /// Number of real (unmasked) tokens.
    pub fn real_tokens(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m != 0).count()
    }
}

/// Encodes text into a fixed-length [`TokenizedInput`].
///
/// Implementations must be pure per call so they can be shared across
/// threads without locking.
pub trait TextTokenizer: Send + Sync {
    /// Encode `text`, truncating (keeping leading tokens) or padding to `max_length`.
    fn tokenize(&self, text: &str, max_length: usize) -> Result<TokenizedInput>;
}

/// Truncate or pad raw ids and mask to exactly `max_length` positions.
///
/// Keeps the leading tokens on truncation; pads with `pad_id` and mask 0.
pub fn fit_to_length(
    mut ids: Vec<i64>,
    mut mask: Vec<i64>,
    max_length: usize,
    pad_id: i64,
) -> Result<TokenizedInput> {
    if ids.len() != mask.len() {
        return Err(EmbeddingError::Tokenization(format!(
            "tokenizer produced {} ids but {} mask entries",
            ids.len(),
            mask.len()
        )));
    }
    if max_length == 0 {
        return Err(EmbeddingError::Config("max_length must be > 0".into()));
    }

    ids.truncate(max_length);
    mask.truncate(max_length);
    ids.resize(max_length, pad_id);
    mask.resize(max_length, 0);

    Ok(TokenizedInput {
        token_ids: ids,
        attention_mask: mask,
    })
}
