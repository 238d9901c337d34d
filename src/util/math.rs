//! Rounding helpers for displayed confidences and distances.

/// Rounds to the nearest tenth.
pub(crate) fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Converts a `[0, 1]` score to a percentage rounded to one decimal.
pub(crate) fn score_percent(score: f32) -> f64 {
    round_to_tenth(f64::from(score) * 100.0)
}
