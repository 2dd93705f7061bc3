//! Durable record of comparison progress, run state and final results
//!
//! Every operation is keyed by user. Progress and state share one record per
//! user; the result is a second, insert-once record.

use crate::{
    error::AppResult,
    models::{JobState, JobStatus, UserId},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryResultStore;
pub use postgres::PgResultStore;

#[async_trait::async_trait]
pub trait ResultStore: Send + Sync {
    /// Upserts the progress percentage for a user
    async fn set_progress(&self, user: &UserId, percent: u8) -> AppResult<()>;

    /// Progress percentage, 0 when the user has no record
    async fn get_progress(&self, user: &UserId) -> AppResult<u8>;

    async fn has_result(&self, user: &UserId) -> AppResult<bool>;

    /// Stores the final payload
    ///
    /// Fails with `AppError::DuplicateResult` when a result already exists;
    /// an existing result is never overwritten.
    async fn insert_result(&self, user: &UserId, payload: &str) -> AppResult<()>;

    /// Stored payload, empty when the user has no result yet
    async fn get_result(&self, user: &UserId) -> AppResult<String>;

    /// Upserts the run state, keeping the current progress
    async fn set_state(&self, user: &UserId, state: JobState, error: Option<&str>)
        -> AppResult<()>;

    /// Full status snapshot, `None` when the user has no record
    async fn get_status(&self, user: &UserId) -> AppResult<Option<JobStatus>>;
}
