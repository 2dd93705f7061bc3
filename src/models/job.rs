use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use uuid::Uuid;

use super::UserId;

/// Lifecycle of a user's comparison run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Failed,
    Complete,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Failed => "failed",
            JobState::Complete => "complete",
        }
    }
}

impl Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobState::Pending),
            "running" => Ok(JobState::Running),
            "failed" => Ok(JobState::Failed),
            "complete" => Ok(JobState::Complete),
            other => Err(format!("unknown job state '{}'", other)),
        }
    }
}

/// Snapshot of a user's run as seen through the result store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub user: UserId,
    pub state: JobState,
    pub percent: u8,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl JobStatus {
    /// Status reported for a user that has never been triggered
    pub fn not_started(user: UserId) -> Self {
        Self {
            user,
            state: JobState::Pending,
            percent: 0,
            error: None,
            updated_at: Utc::now(),
        }
    }
}

/// Identifier stamped on a single run, used to correlate its log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_string_round_trip() {
        for state in [
            JobState::Pending,
            JobState::Running,
            JobState::Failed,
            JobState::Complete,
        ] {
            assert_eq!(state.as_str().parse::<JobState>().unwrap(), state);
        }
        assert!("done".parse::<JobState>().is_err());
    }

    #[test]
    fn test_status_serializes_state_lowercase() {
        let status = JobStatus::not_started(UserId::parse("9").unwrap());
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "pending");
        assert_eq!(json["percent"], 0);
        assert_eq!(json["user"], "9");
    }
}
