//! Inference runtime adapter contract and the raw tensor it returns.

use crate::errors::{EmbeddingError, Result};
use crate::tokenizer::TokenizedInput;

/// Element storage of a model output, in whatever type the runtime produced.
#[derive(Clone, Debug, PartialEq)]
pub enum TensorData {
    /// 32-bit floats.
    F32(Vec<f32>),
    /// 64-bit floats.
    F64(Vec<f64>),
    /// 64-bit integers.
    I64(Vec<i64>),
    /// Booleans.
    Bool(Vec<bool>),
    /// Strings.
    Text(Vec<String>),
}

impl TensorData {
    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
            Self::I64(v) => v.len(),
            Self::Bool(v) => v.len(),
            Self::Text(v) => v.len(),
        }
    }

    /// Whether there are no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::I64(_) => "i64",
            Self::Bool(_) => "bool",
            Self::Text(_) => "string",
        }
    }
}

/// Opaque rank-1/2/3 tensor produced by an [`InferenceRuntime`].
#[derive(Clone, Debug, PartialEq)]
pub struct RawModelOutput {
    /// Dimensions, outermost first.
    pub shape: Vec<usize>,
    /// Row-major elements.
    pub data: TensorData,
}

impl RawModelOutput {
    /// Build an `f32` output.
    pub fn f32(shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self {
            shape,
            data: TensorData::F32(data),
        }
    }

    /// Tensor rank.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Convert every element to `f32`.
    ///
    /// Floats and integers are numeric; NaN and infinities pass through
    /// unchanged for sanitization to handle. Booleans, strings and finite
    /// `f64` values outside the `f32` range fail with
    /// [`EmbeddingError::NonNumericComponent`]. The element count must match
    /// the shape.
    pub fn into_components(self) -> Result<(Vec<usize>, Vec<f32>)> {
        let expected = self
            .shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| {
                EmbeddingError::UnexpectedOutputShape(format!(
                    "shape {:?} overflows the element count",
                    self.shape
                ))
            })?;
        if expected != self.data.len() {
            return Err(EmbeddingError::UnexpectedOutputShape(format!(
                "shape {:?} implies {expected} elements, runtime returned {}",
                self.shape,
                self.data.len()
            )));
        }

        let values = match self.data {
            TensorData::F32(v) => v,
            TensorData::F64(v) => v.into_iter().map(narrow_f64).collect::<Result<_>>()?,
            TensorData::I64(v) => v.into_iter().map(|x| x as f32).collect(),
            other @ (TensorData::Bool(_) | TensorData::Text(_)) => {
                return Err(EmbeddingError::NonNumericComponent(format!(
                    "model output element type is {}",
                    other.type_name()
                )));
            }
        };
        Ok((self.shape, values))
    }
}

/// Narrow to `f32`, refusing finite values the narrower type cannot hold.
fn narrow_f64(x: f64) -> Result<f32> {
    if x.is_finite() && x.abs() > f64::from(f32::MAX) {
        return Err(EmbeddingError::NonNumericComponent(format!(
            "f64 component {x:e} is outside the f32 range"
        )));
    }
    Ok(x as f32)
}

/// Forward-pass engine behind a resolved input/output binding.
///
/// The binding (which named inputs the model takes, which output holds the
/// result) is resolved once when the adapter is constructed and never changes.
/// Implementations that wrap a non-reentrant engine must serialize `run`.
pub trait InferenceRuntime: Send + Sync {
    /// Run one forward pass.
    fn run(&self, input: &TokenizedInput) -> Result<RawModelOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f32_passthrough() {
        let out = RawModelOutput::f32(vec![2], vec![1.0, f32::NAN]);
        let (shape, values) = out.into_components().unwrap();
        assert_eq!(shape, vec![2]);
        assert_eq!(values[0], 1.0);
        assert!(values[1].is_nan());
    }

    #[test]
    fn f64_and_i64_are_numeric() {
        let out = RawModelOutput {
            shape: vec![1, 2],
            data: TensorData::F64(vec![0.5, -2.0]),
        };
        assert_eq!(out.into_components().unwrap().1, vec![0.5, -2.0]);

        let out = RawModelOutput {
            shape: vec![3],
            data: TensorData::I64(vec![1, 2, 3]),
        };
        assert_eq!(out.into_components().unwrap().1, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn strings_are_non_numeric() {
        let out = RawModelOutput {
            shape: vec![1],
            data: TensorData::Text(vec!["x".into()]),
        };
        let err = out.into_components().unwrap_err();
        assert!(matches!(err, EmbeddingError::NonNumericComponent(_)));
        assert!(err.to_string().contains("string"));
    }

    #[test]
    fn bools_are_non_numeric() {
        let out = RawModelOutput {
            shape: vec![2],
            data: TensorData::Bool(vec![true, false]),
        };
        assert!(matches!(
            out.into_components(),
            Err(EmbeddingError::NonNumericComponent(_))
        ));
    }

    #[test]
    fn element_count_must_match_shape() {
        let out = RawModelOutput::f32(vec![2, 3], vec![0.0; 5]);
        assert!(matches!(
            out.into_components(),
            Err(EmbeddingError::UnexpectedOutputShape(_))
        ));
    }

    #[test]
    fn overflowing_shape_is_rejected() {
        let out = RawModelOutput::f32(vec![usize::MAX, 2], vec![0.0; 4]);
        assert!(matches!(
            out.into_components(),
            Err(EmbeddingError::UnexpectedOutputShape(_))
        ));
    }

    #[test]
    fn f64_beyond_f32_range_is_rejected() {
        let out = RawModelOutput {
            shape: vec![2],
            data: TensorData::F64(vec![1.0, 1e300]),
        };
        let err = out.into_components().unwrap_err();
        assert!(matches!(err, EmbeddingError::NonNumericComponent(_)));
        assert!(err.to_string().contains("f32 range"));
    }

    #[test]
    fn f64_non_finite_passes_through() {
        let out = RawModelOutput {
            shape: vec![2],
            data: TensorData::F64(vec![f64::NAN, f64::NEG_INFINITY]),
        };
        let values = out.into_components().unwrap().1;
        assert!(values[0].is_nan());
        assert_eq!(values[1], f32::NEG_INFINITY);
    }

    #[test]
    fn rank_reports_shape_len() {
        assert_eq!(RawModelOutput::f32(vec![1, 4, 8], vec![0.0; 32]).rank(), 3);
    }
}
