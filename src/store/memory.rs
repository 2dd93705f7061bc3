use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{JobState, JobStatus, UserId},
    store::ResultStore,
};

/// In-process result store
///
/// Same contract as the Postgres store; nothing survives a restart.
#[derive(Clone, Default)]
pub struct MemoryResultStore {
    inner: Arc<RwLock<MemoryInner>>,
}

#[derive(Default)]
struct MemoryInner {
    statuses: HashMap<UserId, JobStatus>,
    results: HashMap<UserId, String>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryInner {
    fn status_mut(&mut self, user: &UserId) -> &mut JobStatus {
        self.statuses
            .entry(user.clone())
            .or_insert_with(|| JobStatus::not_started(user.clone()))
    }
}

#[async_trait::async_trait]
impl ResultStore for MemoryResultStore {
    async fn set_progress(&self, user: &UserId, percent: u8) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        let status = inner.status_mut(user);
        status.percent = percent;
        status.updated_at = Utc::now();
        Ok(())
    }

    async fn get_progress(&self, user: &UserId) -> AppResult<u8> {
        let inner = self.inner.read().await;
        Ok(inner.statuses.get(user).map(|s| s.percent).unwrap_or(0))
    }

    async fn has_result(&self, user: &UserId) -> AppResult<bool> {
        Ok(self.inner.read().await.results.contains_key(user))
    }

    async fn insert_result(&self, user: &UserId, payload: &str) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if inner.results.contains_key(user) {
            return Err(AppError::DuplicateResult(user.clone()));
        }
        inner.results.insert(user.clone(), payload.to_string());
        Ok(())
    }

    async fn get_result(&self, user: &UserId) -> AppResult<String> {
        let inner = self.inner.read().await;
        Ok(inner.results.get(user).cloned().unwrap_or_default())
    }

    async fn set_state(
        &self,
        user: &UserId,
        state: JobState,
        error: Option<&str>,
    ) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        let status = inner.status_mut(user);
        status.state = state;
        status.error = error.map(str::to_string);
        status.updated_at = Utc::now();
        Ok(())
    }

    async fn get_status(&self, user: &UserId) -> AppResult<Option<JobStatus>> {
        Ok(self.inner.read().await.statuses.get(user).cloned())
    }
}
