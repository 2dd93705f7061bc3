pub mod comparison;
pub mod job;
pub mod rating;
pub mod user;

pub use comparison::{ComparisonResult, ComparisonRow, RESULT_HEADER, TSV_HEADER};
pub use job::{JobState, JobStatus, RunId};
pub use rating::{RatingPair, RawRating, RawRatingPair};
pub use user::{Connection, UserId};

// ============================================================================
// Rating platform wire types
// ============================================================================

use serde::Deserialize;

/// Response of the friend listing endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ApiFriendsResponse {
    #[serde(default)]
    pub friends: Vec<ApiFriend>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiFriend {
    #[serde(default)]
    pub id: serde_json::Value,
    #[serde(default)]
    pub name: Option<String>,
}

/// Response of the book comparison endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ApiCompareResponse {
    #[serde(default)]
    pub reviews: Vec<RawRatingPair>,
}
