use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::error::{AppError, AppResult};

/// Opaque identifier of a platform user
///
/// The only key used for progress, state and result records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Builds a user id, rejecting blank input
    pub fn parse(raw: impl AsRef<str>) -> AppResult<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(AppError::InvalidInput("User id cannot be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One peer in a user's social graph, as reported by the rating platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub connection_id: UserId,
    pub display_name: String,
}

impl Connection {
    pub fn new(connection_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            connection_id,
            display_name: display_name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_trims_whitespace() {
        let id = UserId::parse("  4812  ").unwrap();
        assert_eq!(id.as_str(), "4812");
        assert_eq!(format!("{}", id), "4812");
    }

    #[test]
    fn test_user_id_rejects_blank() {
        assert!(matches!(UserId::parse("   "), Err(AppError::InvalidInput(_))));
        assert!(UserId::parse("").is_err());
    }

    #[test]
    fn test_user_id_serializes_as_plain_string() {
        let id = UserId::parse("77").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"77\"");
    }
}
