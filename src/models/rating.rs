use serde::{Deserialize, Serialize};

/// A rating cell exactly as the platform sends it
///
/// Platforms are inconsistent here: numbers, numeric strings, blanks and
/// nulls all show up for the same field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRating {
    Number(serde_json::Number),
    Text(String),
    Missing,
}

impl RawRating {
    /// Integer value of the cell, if it has one
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RawRating::Number(n) => n.as_i64(),
            RawRating::Text(s) => s.trim().parse().ok(),
            RawRating::Missing => None,
        }
    }
}

impl Default for RawRating {
    fn default() -> Self {
        RawRating::Missing
    }
}

impl From<&str> for RawRating {
    fn from(value: &str) -> Self {
        RawRating::Text(value.to_string())
    }
}

/// One commonly-rated book before validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRatingPair {
    #[serde(default)]
    pub your_rating: RawRating,
    #[serde(default)]
    pub their_rating: RawRating,
}

impl RawRatingPair {
    pub fn new(your_rating: impl Into<RawRating>, their_rating: impl Into<RawRating>) -> Self {
        Self {
            your_rating: your_rating.into(),
            their_rating: their_rating.into(),
        }
    }
}

/// One book's two ratings, both known to be integers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingPair {
    pub mine: i64,
    pub theirs: i64,
}

impl RatingPair {
    pub fn new(mine: i64, theirs: i64) -> Self {
        Self { mine, theirs }
    }

    /// Validates a raw pair; `None` when either side is not an integer
    pub fn from_raw(raw: &RawRatingPair) -> Option<Self> {
        Some(Self {
            mine: raw.your_rating.as_integer()?,
            theirs: raw.their_rating.as_integer()?,
        })
    }
}
