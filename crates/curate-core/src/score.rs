//! Score helpers shared by merge, edits, and export.

/// Tactics at or below this suggested score are not seeded for review.
pub const TACTIC_THRESHOLD: f64 = 0.3;

/// Slack absorbed before rounding so that decimal halves stored as binary
/// floats just below the half (0.35 is 0.34999…) still round up.
const ROUNDING_SLACK: f64 = 1e-9;

/// A score is usable if it is finite and within `[0.0, 1.0]`.
pub fn is_valid(score: f64) -> bool {
  score.is_finite() && (0.0..=1.0).contains(&score)
}

/// Format a score to one decimal place, rounding half up on the decimal value.
///
/// `0.35 → "0.4"`, `0.25 → "0.3"`, `0.95 → "1.0"`, `0.31 → "0.3"`.
pub fn format_one_decimal(score: f64) -> String {
  let tenths = (score * 10.0 + 0.5 + ROUNDING_SLACK).floor();
  format!("{:.1}", tenths / 10.0)
}

/// Whether a suggested tactic score clears [`TACTIC_THRESHOLD`].
pub fn clears_tactic_threshold(score: f64) -> bool { score > TACTIC_THRESHOLD }

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rounds_half_up() {
    assert_eq!(format_one_decimal(0.35), "0.4");
    assert_eq!(format_one_decimal(0.25), "0.3");
    assert_eq!(format_one_decimal(0.45), "0.5");
    assert_eq!(format_one_decimal(0.95), "1.0");
  }

  #[test]
  fn rounds_down_below_half() {
    assert_eq!(format_one_decimal(0.31), "0.3");
    assert_eq!(format_one_decimal(0.649), "0.6");
    assert_eq!(format_one_decimal(0.9), "0.9");
    assert_eq!(format_one_decimal(1.0), "1.0");
    assert_eq!(format_one_decimal(0.0), "0.0");
  }

  #[test]
  fn threshold_is_strict() {
    assert!(!clears_tactic_threshold(0.3));
    assert!(!clears_tactic_threshold(0.2));
    assert!(clears_tactic_threshold(0.35));
  }

  #[test]
  fn validity_bounds() {
    assert!(is_valid(0.0));
    assert!(is_valid(1.0));
    assert!(!is_valid(1.01));
    assert!(!is_valid(-0.1));
    assert!(!is_valid(f64::NAN));
  }
}
