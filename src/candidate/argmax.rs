//! Arg-max class selection over one confidence row.

/// Returns the first class index holding the row maximum and its value.
///
/// Raw confidences are compared as-is (no softmax). The scan starts from a
/// zero score at class 0, so rows whose values are all non-positive, or NaN,
/// report `(0, 0.0)`.
pub fn best_class(row: &[f32]) -> (usize, f32) {
    let mut best_idx = 0usize;
    let mut best = 0.0f32;
    for (idx, &value) in row.iter().enumerate() {
        if value > best {
            best = value;
            best_idx = idx;
        }
    }
    (best_idx, best)
}
