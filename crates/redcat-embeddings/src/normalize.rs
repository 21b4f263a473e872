//! Vector sanitization, norms, and similarity functions.

/// Replace every NaN / ±Infinity component with `0.0`.
///
/// Returns the number of components that were replaced.
pub fn sanitize_in_place(v: &mut [f32]) -> usize {
    let mut replaced = 0;
    for x in v.iter_mut() {
        if !x.is_finite() {
            *x = 0.0;
            replaced += 1;
        }
    }
    replaced
}

/// Compute the L2 (Euclidean) norm of a vector, accumulated in `f64`.
pub fn l2_norm(v: &[f32]) -> f64 {
    v.iter()
        .map(|&x| f64::from(x) * f64::from(x))
        .sum::<f64>()
        .sqrt()
}

/// Dot product accumulated in `f64`.
pub fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum()
}

/// Cosine similarity with norm guarding and clipping.
///
/// A norm below `epsilon` is replaced by `1.0` instead of dividing by a
/// near-zero number; the result is clipped into `[-1, 1]`. Callers must pass
/// equal-length slices.
pub fn cosine_similarity(a: &[f32], b: &[f32], epsilon: f64) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have equal dimensions");
    let guard = |n: f64| if n < epsilon { 1.0 } else { n };
    let score = dot(a, b) / (guard(l2_norm(a)) * guard(l2_norm(b)));
    score.clamp(-1.0, 1.0)
}
