use crate::models::{RatingPair, RawRatingPair};

/// Pearson product-moment correlation over paired ratings
///
/// Returns 0 for an empty input and whenever either rating series has zero
/// variance; neither case is a real correlation of zero, just "no signal".
/// The result is not clamped, so rounding can leave it a few ULPs outside
/// [-1, 1].
pub fn correlate(pairs: &[RatingPair]) -> f64 {
    if pairs.is_empty() {
        return 0.0;
    }

    let n = pairs.len() as f64;
    let (mut sum_xy, mut sum_x, mut sum_y, mut sum_x2, mut sum_y2) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for pair in pairs {
        let x = pair.mine as f64;
        let y = pair.theirs as f64;
        sum_xy += x * y;
        sum_x += x;
        sum_y += y;
        sum_x2 += x * x;
        sum_y2 += y * y;
    }

    let denominator = (sum_x2 - sum_x * sum_x / n).sqrt() * (sum_y2 - sum_y * sum_y / n).sqrt();
    if denominator == 0.0 || denominator.is_nan() {
        return 0.0;
    }

    (sum_xy - sum_x * sum_y / n) / denominator
}

/// Validates raw pairs and scores them
///
/// Pairs with a non-integer side are dropped. Returns the similarity and the
/// number of pairs that were actually used.
pub fn score_comparison(raw: &[RawRatingPair]) -> (f64, usize) {
    let pairs: Vec<RatingPair> = raw.iter().filter_map(RatingPair::from_raw).collect();
    let dropped = raw.len() - pairs.len();
    if dropped > 0 {
        tracing::debug!(dropped, kept = pairs.len(), "Dropped unparsable rating pairs");
    }
    (correlate(&pairs), pairs.len())
}
