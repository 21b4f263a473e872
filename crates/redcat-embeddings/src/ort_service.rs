//! ONNX Runtime and Hugging Face tokenizer adapters (feature-gated behind `ort`).
//!
//! Model files are read from the configured paths; when they are missing and
//! a `modelRepo` is configured they are fetched through `hf-hub` into the
//! cache directory. The input/output binding is resolved once per model and
//! every session in the pool shares it.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use ort::session::{Session, SessionInputValue, SessionInputs};
use ort::value::{DynValue, Tensor};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::{EmbeddingConfig, TOKENIZER_FILE};
use crate::errors::{EmbeddingError, Result};
use crate::runtime::{InferenceRuntime, RawModelOutput, TensorData};
use crate::tokenizer::{TextTokenizer, TokenizedInput, fit_to_length};

const INPUT_IDS: &str = "input_ids";
const ATTENTION_MASK: &str = "attention_mask";
const TOKEN_TYPE: &str = "token_type";
const PAD_TOKENS: [&str; 3] = ["<pad>", "[PAD]", "<|endoftext|>"];

// ─────────────────────────────────────────────────────────────────────────────
// Model files
// ─────────────────────────────────────────────────────────────────────────────

/// Resolve `(model, tokenizer)` file paths, downloading missing ones when a
/// repo is configured.
pub fn resolve_model_files(config: &EmbeddingConfig) -> Result<(PathBuf, PathBuf)> {
    let model = PathBuf::from(&config.model_path);
    let tokenizer = config.tokenizer_file();
    if model.is_file() && tokenizer.is_file() {
        return Ok((model, tokenizer));
    }

    let Some(repo_id) = config.model_repo.as_deref() else {
        let missing = if model.is_file() { &tokenizer } else { &model };
        return Err(EmbeddingError::ModelInit(format!(
            "{} not found and no model repo configured",
            missing.display()
        )));
    };

    let cache_dir = config.resolved_cache_dir();
    debug!(cache_dir, repo = repo_id, "fetching model files via hf-hub");
    let api = hf_hub::api::sync::ApiBuilder::new()
        .with_cache_dir(PathBuf::from(&cache_dir))
        .build()
        .map_err(|e| EmbeddingError::ModelInit(format!("hf-hub api: {e}")))?;
    let repo = api.model(repo_id.to_owned());

    let model = if model.is_file() {
        model
    } else {
        let remote = hub_model_file(&model)?;
        repo.get(&remote)
            .map_err(|e| EmbeddingError::ModelInit(format!("model download ({remote}): {e}")))?
    };
    let tokenizer = if tokenizer.is_file() {
        tokenizer
    } else {
        repo.get(TOKENIZER_FILE)
            .map_err(|e| EmbeddingError::ModelInit(format!("tokenizer download: {e}")))?
    };

    info!(model = %model.display(), tokenizer = %tokenizer.display(), "model files ready");
    Ok((model, tokenizer))
}

/// Repo-relative location of an ONNX export: `onnx/<file name>`.
fn hub_model_file(local: &Path) -> Result<String> {
    let name = local
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| EmbeddingError::Config(format!("invalid model path {}", local.display())))?;
    Ok(format!("onnx/{name}"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tokenizer
// ─────────────────────────────────────────────────────────────────────────────

/// `tokenizers`-backed [`TextTokenizer`].
///
/// Truncation to `max_length` happens inside `encode`, so special tokens such
/// as `</s>` or `[SEP]` survive on long inputs.
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
    pad_id: i64,
}

impl HfTokenizer {
    /// Load `tokenizer.json`, truncate encodings to `max_length` tokens and
    /// resolve the pad id.
    pub fn from_file(path: &Path, max_length: usize) -> Result<Self> {
        let mut inner = tokenizers::Tokenizer::from_file(path)
            .map_err(|e| EmbeddingError::ModelInit(format!("tokenizer load: {e}")))?;
        let _ = inner
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length,
                ..tokenizers::TruncationParams::default()
            }))
            .map_err(|e| EmbeddingError::ModelInit(format!("tokenizer truncation: {e}")))?;
        let pad_id = inner
            .get_padding()
            .map(|p| p.pad_id)
            .or_else(|| PAD_TOKENS.iter().find_map(|t| inner.token_to_id(t)))
            .map_or(0, i64::from);
        debug!(path = %path.display(), max_length, pad_id, "tokenizer loaded");
        Ok(Self { inner, pad_id })
    }
}

impl TextTokenizer for HfTokenizer {
    fn tokenize(&self, text: &str, max_length: usize) -> Result<TokenizedInput> {
        let encoding = self
            .inner
            .encode(text, true)
            .map_err(|e| EmbeddingError::Tokenization(e.to_string()))?;
        let ids = encoding.get_ids().iter().map(|&id| i64::from(id)).collect();
        let mask = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| i64::from(m))
            .collect();
        fit_to_length(ids, mask, max_length, self.pad_id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Runtime
// ─────────────────────────────────────────────────────────────────────────────

/// Named slots the model is fed from and read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelBinding {
    /// Token id input.
    pub input_ids: String,
    /// Attention mask input.
    pub attention_mask: String,
    /// Segment id input, fed zeros when present.
    pub token_type_ids: Option<String>,
    /// Output holding the embeddings.
    pub output: String,
}

/// Match inputs by name, falling back to declaration order.
///
/// The output is always the first declared one.
pub fn resolve_binding(inputs: &[String], outputs: &[String]) -> Result<ModelBinding> {
    if inputs.len() < 2 {
        return Err(EmbeddingError::ModelInit(format!(
            "model declares {} inputs, need token ids and attention mask",
            inputs.len()
        )));
    }
    let output = outputs
        .first()
        .cloned()
        .ok_or_else(|| EmbeddingError::ModelInit("model declares no outputs".into()))?;

    let named = |needle: &str| {
        inputs
            .iter()
            .find(|name| name.to_ascii_lowercase().contains(needle))
            .cloned()
    };
    let (input_ids, attention_mask) = match (named(INPUT_IDS), named(ATTENTION_MASK)) {
        (Some(ids), Some(mask)) => (ids, mask),
        _ => (inputs[0].clone(), inputs[1].clone()),
    };
    let token_type_ids =
        named(TOKEN_TYPE).filter(|name| *name != input_ids && *name != attention_mask);

    Ok(ModelBinding {
        input_ids,
        attention_mask,
        token_type_ids,
        output,
    })
}

/// ONNX Runtime [`InferenceRuntime`] over a pool of independently locked sessions.
///
/// A pool of one serializes every forward pass.
pub struct OrtRuntime {
    sessions: Vec<Mutex<Session>>,
    next: AtomicUsize,
    binding: ModelBinding,
}

impl OrtRuntime {
    /// Load `config.session_pool_size` sessions from `model_path`.
    pub fn load(model_path: &Path, config: &EmbeddingConfig) -> Result<Self> {
        let pool_size = config.session_pool_size.max(1);
        info!(model = %model_path.display(), pool_size, "loading ONNX model");

        let mut sessions = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            sessions.push(Mutex::new(build_session(model_path, config.intra_threads)?));
        }

        let binding = {
            let first = sessions[0].lock();
            let inputs: Vec<String> = first.inputs().iter().map(|o| o.name().to_owned()).collect();
            let outputs: Vec<String> = first.outputs().iter().map(|o| o.name().to_owned()).collect();
            resolve_binding(&inputs, &outputs)?
        };
        info!(
            input_ids = %binding.input_ids,
            attention_mask = %binding.attention_mask,
            token_type_ids = ?binding.token_type_ids,
            output = %binding.output,
            "model binding resolved"
        );

        Ok(Self {
            sessions,
            next: AtomicUsize::new(0),
            binding,
        })
    }
}

fn build_session(model_path: &Path, intra_threads: usize) -> Result<Session> {
    Session::builder()
        .map_err(|e| EmbeddingError::ModelInit(format!("session builder: {e}")))?
        .with_intra_threads(intra_threads)
        .map_err(|e| EmbeddingError::ModelInit(format!("thread config: {e}")))?
        .with_log_level(ort::logging::LogLevel::Warning)
        .map_err(|e| EmbeddingError::ModelInit(format!("log level: {e}")))?
        .commit_from_file(model_path)
        .map_err(|e| EmbeddingError::ModelInit(format!("model load: {e}")))
}

fn tensor_input(shape: &[i64], data: Vec<i64>) -> Result<SessionInputValue<'static>> {
    let tensor = Tensor::from_array((shape.to_vec(), data))
        .map_err(|e| EmbeddingError::Inference(format!("input tensor: {e}")))?;
    Ok(tensor.into())
}

/// Copy an output value into an owned tensor, trying each numeric type.
fn extract_output(value: &DynValue) -> Result<RawModelOutput> {
    fn dims(shape: &[i64]) -> Result<Vec<usize>> {
        shape
            .iter()
            .map(|&d| {
                usize::try_from(d).map_err(|_| {
                    EmbeddingError::UnexpectedOutputShape(format!("dynamic dimension in {shape:?}"))
                })
            })
            .collect()
    }

    if let Ok((shape, data)) = value.try_extract_tensor::<f32>() {
        return Ok(RawModelOutput {
            shape: dims(shape)?,
            data: TensorData::F32(data.to_vec()),
        });
    }
    if let Ok((shape, data)) = value.try_extract_tensor::<f64>() {
        return Ok(RawModelOutput {
            shape: dims(shape)?,
            data: TensorData::F64(data.to_vec()),
        });
    }
    match value.try_extract_tensor::<i64>() {
        Ok((shape, data)) => Ok(RawModelOutput {
            shape: dims(shape)?,
            data: TensorData::I64(data.to_vec()),
        }),
        Err(e) => Err(EmbeddingError::NonNumericComponent(format!(
            "output is not a numeric tensor: {e}"
        ))),
    }
}

impl InferenceRuntime for OrtRuntime {
    #[allow(clippy::cast_possible_wrap)]
    fn run(&self, input: &TokenizedInput) -> Result<RawModelOutput> {
        let shape = [1, input.len() as i64];
        let mut feeds: Vec<(Cow<'static, str>, SessionInputValue<'static>)> = vec![
            (
                Cow::Owned(self.binding.input_ids.clone()),
                tensor_input(&shape, input.token_ids.clone())?,
            ),
            (
                Cow::Owned(self.binding.attention_mask.clone()),
                tensor_input(&shape, input.attention_mask.clone())?,
            ),
        ];
        if let Some(name) = &self.binding.token_type_ids {
            feeds.push((Cow::Owned(name.clone()), tensor_input(&shape, vec![0; input.len()])?));
        }
        let feeds: SessionInputs<'static, 'static> = feeds.into();

        let slot = self.next.fetch_add(1, Ordering::Relaxed) % self.sessions.len();
        let mut session = self.sessions[slot].lock();
        let outputs = session
            .run(feeds)
            .map_err(|e| EmbeddingError::Inference(format!("inference: {e}")))?;
        let value = outputs.get(self.binding.output.as_str()).ok_or_else(|| {
            EmbeddingError::UnexpectedOutputShape(format!(
                "output {} missing from run results",
                self.binding.output
            ))
        })?;
        extract_output(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn binding_by_name() {
        let b = resolve_binding(
            &names(&["attention_mask", "input_ids", "token_type_ids"]),
            &names(&["last_hidden_state", "pooler_output"]),
        )
        .unwrap();
        assert_eq!(b.input_ids, "input_ids");
        assert_eq!(b.attention_mask, "attention_mask");
        assert_eq!(b.token_type_ids.as_deref(), Some("token_type_ids"));
        assert_eq!(b.output, "last_hidden_state");
    }

    #[test]
    fn binding_falls_back_to_order() {
        let b = resolve_binding(&names(&["ids", "mask"]), &names(&["sentence_embedding"])).unwrap();
        assert_eq!(b.input_ids, "ids");
        assert_eq!(b.attention_mask, "mask");
        assert!(b.token_type_ids.is_none());
    }

    #[test]
    fn binding_requires_two_inputs_and_an_output() {
        assert!(matches!(
            resolve_binding(&names(&["input_ids"]), &names(&["out"])),
            Err(EmbeddingError::ModelInit(_))
        ));
        assert!(matches!(
            resolve_binding(&names(&["input_ids", "attention_mask"]), &[]),
            Err(EmbeddingError::ModelInit(_))
        ));
    }

    const WORD_LEVEL_TOKENIZER: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [
            {"id": 0, "content": "[PAD]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
            {"id": 1, "content": "[CLS]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
            {"id": 2, "content": "[SEP]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
            {"id": 3, "content": "[UNK]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
        ],
        "normalizer": null,
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": {
            "type": "TemplateProcessing",
            "single": [
                {"SpecialToken": {"id": "[CLS]", "type_id": 0}},
                {"Sequence": {"id": "A", "type_id": 0}},
                {"SpecialToken": {"id": "[SEP]", "type_id": 0}}
            ],
            "pair": [
                {"SpecialToken": {"id": "[CLS]", "type_id": 0}},
                {"Sequence": {"id": "A", "type_id": 0}},
                {"SpecialToken": {"id": "[SEP]", "type_id": 0}},
                {"Sequence": {"id": "B", "type_id": 1}},
                {"SpecialToken": {"id": "[SEP]", "type_id": 1}}
            ],
            "special_tokens": {
                "[CLS]": {"id": "[CLS]", "ids": [1], "tokens": ["[CLS]"]},
                "[SEP]": {"id": "[SEP]", "ids": [2], "tokens": ["[SEP]"]}
            }
        },
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {"[PAD]": 0, "[CLS]": 1, "[SEP]": 2, "[UNK]": 3, "cafe": 4, "bar": 5, "park": 6},
            "unk_token": "[UNK]"
        }
    }"#;

    fn word_level_tokenizer(max_length: usize) -> HfTokenizer {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokenizer.json");
        std::fs::write(&path, WORD_LEVEL_TOKENIZER).unwrap();
        HfTokenizer::from_file(&path, max_length).unwrap()
    }

    #[test]
    fn long_text_keeps_closing_special_token() {
        let tok = word_level_tokenizer(4);
        let input = tok.tokenize("cafe bar park cafe bar park", 4).unwrap();
        assert_eq!(input.token_ids, vec![1, 4, 5, 2]);
        assert_eq!(input.attention_mask, vec![1, 1, 1, 1]);
    }

    #[test]
    fn short_text_padded_with_pad_token() {
        let tok = word_level_tokenizer(5);
        let input = tok.tokenize("park", 5).unwrap();
        assert_eq!(input.token_ids, vec![1, 6, 2, 0, 0]);
        assert_eq!(input.attention_mask, vec![1, 1, 1, 0, 0]);
    }

    #[test]
    fn hub_path_uses_onnx_dir() {
        let remote = hub_model_file(Path::new("models/e5/onnx/model_qint8_avx512_vnni.onnx")).unwrap();
        assert_eq!(remote, "onnx/model_qint8_avx512_vnni.onnx");
    }

    #[test]
    fn missing_files_without_repo_is_model_init() {
        let config = EmbeddingConfig {
            model_path: "/nonexistent/model.onnx".into(),
            tokenizer_path: "/nonexistent/tokenizer.json".into(),
            model_repo: None,
            ..EmbeddingConfig::default()
        };
        assert!(matches!(
            resolve_model_files(&config),
            Err(EmbeddingError::ModelInit(_))
        ));
    }
}
