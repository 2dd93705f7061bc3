use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::instrument;

use crate::{
    error::{AppError, AppResult},
    models::{ComparisonResult, ComparisonRow, Connection, JobState, RunId, UserId},
    services::{
        correlation::score_comparison,
        providers::SharedProvider,
        retry::{with_retry, RetryPolicy},
        run_lock::{LockToken, RunLock},
    },
    store::ResultStore,
};

pub type SharedStore = Arc<dyn ResultStore>;
pub type SharedRunLock = Arc<dyn RunLock>;

/// How a comparison run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// A result already existed; nothing was fetched or recomputed
    Cached,
    /// A new result with this many rows was stored
    Completed { rows: usize },
}

/// Computes and stores one user's comparison table
///
/// A run is a pure function of what the provider returns; it never decides
/// whether it is allowed to run. Exclusion is `ComparisonService`'s job.
pub struct ComparisonJob {
    provider: SharedProvider,
    store: SharedStore,
    retry: RetryPolicy,
}

impl ComparisonJob {
    pub fn new(provider: SharedProvider, store: SharedStore, retry: RetryPolicy) -> Self {
        Self {
            provider,
            store,
            retry,
        }
    }

    /// Runs the full comparison for `user`
    ///
    /// Progress only ever moves forward within a run. The final 100 is
    /// written after the result, so a reader that sees 100 finds the result.
    /// A provider call that still fails after retries aborts the run with
    /// progress left where it was and nothing stored.
    #[instrument(
        skip(self, user, run_id),
        fields(user = %user, run_id = %run_id, provider = self.provider.name())
    )]
    pub async fn run_comparison(&self, user: &UserId, run_id: RunId) -> AppResult<RunOutcome> {
        if self.store.has_result(user).await? {
            mark_complete(&*self.store, user).await?;
            tracing::info!("Result already stored, skipping comparison");
            return Ok(RunOutcome::Cached);
        }

        self.store.set_progress(user, 0).await?;
        self.store.set_state(user, JobState::Running, None).await?;

        let connections = with_retry(self.retry, "list connections", || {
            self.provider.list_connections(user)
        })
        .await?;

        let total = connections.len();
        tracing::info!(connections = total, "Starting comparison");

        let mut rows = Vec::with_capacity(total);
        let mut last_percent = 0u8;

        for (index, connection) in connections.iter().enumerate() {
            let position = index + 1;
            rows.push(self.compare_one(user, connection).await?);

            if position < total {
                let percent = progress_percent(position, total);
                if percent > last_percent {
                    self.store.set_progress(user, percent).await?;
                    last_percent = percent;
                }
            }
        }

        let row_count = rows.len();
        let payload = ComparisonResult::new(rows).to_payload()?;
        self.store.insert_result(user, &payload).await?;
        mark_complete(&*self.store, user).await?;

        tracing::info!(rows = row_count, "Comparison complete");

        Ok(RunOutcome::Completed { rows: row_count })
    }

    async fn compare_one(&self, user: &UserId, connection: &Connection) -> AppResult<ComparisonRow> {
        let raw = with_retry(self.retry, "rating comparison", || {
            self.provider
                .rating_comparison(user, &connection.connection_id)
        })
        .await?;

        let (similarity, sample_size) = score_comparison(&raw);

        tracing::debug!(
            connection = %connection.connection_id,
            name = %connection.display_name,
            similarity,
            sample_size,
            "Connection scored"
        );

        Ok(ComparisonRow {
            name: connection.display_name.clone(),
            similarity,
            sample_size,
        })
    }
}

/// Final writes for a user whose result is stored
async fn mark_complete(store: &dyn ResultStore, user: &UserId) -> AppResult<()> {
    store.set_progress(user, 100).await?;
    store.set_state(user, JobState::Complete, None).await
}

/// `floor(position * 100 / total)`; `total` must be non-zero
fn progress_percent(position: usize, total: usize) -> u8 {
    (position * 100 / total).min(100) as u8
}

/// Result of asking for a new run
#[derive(Debug)]
pub enum StartOutcome {
    /// A run was spawned; awaiting `finished` is optional
    Started {
        run_id: RunId,
        finished: JoinHandle<()>,
    },
    /// Another run for the same user holds the lock
    AlreadyRunning,
}

/// Trigger boundary for comparison runs
///
/// Hands each run to the tokio runtime under a per-user lock and supervises
/// it. The lock is kept alive while the run is in flight and released
/// however the run ends. Errors and panics end up as a `Failed` state,
/// except a losing write against an already stored result, which leaves the
/// user `Complete`.
#[derive(Clone)]
pub struct ComparisonService {
    job: Arc<ComparisonJob>,
    store: SharedStore,
    lock: SharedRunLock,
}

impl ComparisonService {
    pub fn new(job: ComparisonJob, lock: SharedRunLock) -> Self {
        let store = job.store.clone();
        Self {
            job: Arc::new(job),
            store,
            lock,
        }
    }

    /// Starts a run for `user` without waiting for it
    pub async fn start(&self, user: UserId) -> AppResult<StartOutcome> {
        let Some(token) = self.lock.try_acquire(&user).await? else {
            tracing::info!(user = %user, "Comparison already running, ignoring trigger");
            return Ok(StartOutcome::AlreadyRunning);
        };

        let run_id = RunId::new();
        tracing::info!(user = %user, run_id = %run_id, "Comparison run started");

        let job = self.job.clone();
        let run_user = user.clone();
        let run = tokio::spawn(async move { job.run_comparison(&run_user, run_id).await });

        let finished = tokio::spawn(Self::supervise(
            run,
            self.store.clone(),
            self.lock.clone(),
            user,
            token,
            run_id,
        ));

        Ok(StartOutcome::Started { run_id, finished })
    }

    async fn supervise(
        mut run: JoinHandle<AppResult<RunOutcome>>,
        store: SharedStore,
        lock: SharedRunLock,
        user: UserId,
        token: LockToken,
        run_id: RunId,
    ) {
        let joined = match lock.renew_every() {
            Some(period) => {
                let mut heartbeat = tokio::time::interval(period);
                heartbeat.tick().await;
                loop {
                    tokio::select! {
                        joined = &mut run => break joined,
                        _ = heartbeat.tick() => {
                            match lock.extend(&user, token).await {
                                Ok(true) => {}
                                Ok(false) => tracing::warn!(user = %user, run_id = %run_id, "Run lock lost while running"),
                                Err(e) => tracing::warn!(user = %user, error = %e, "Failed to extend run lock"),
                            }
                        }
                    }
                }
            }
            None => run.await,
        };

        let failure = match joined {
            Ok(Ok(outcome)) => {
                tracing::info!(user = %user, run_id = %run_id, ?outcome, "Comparison run finished");
                None
            }
            Ok(Err(AppError::DuplicateResult(_))) => {
                tracing::warn!(user = %user, run_id = %run_id, "Another run stored the result first, keeping it");
                match mark_complete(&*store, &user).await {
                    Ok(()) => None,
                    Err(e) => Some(e.to_string()),
                }
            }
            Ok(Err(e)) => Some(e.to_string()),
            Err(join_err) => Some(format!("Comparison run aborted: {}", join_err)),
        };

        if let Some(message) = failure {
            tracing::error!(user = %user, run_id = %run_id, error = %message, "Comparison run failed");
            if let Err(e) = store
                .set_state(&user, JobState::Failed, Some(&message))
                .await
            {
                tracing::error!(user = %user, error = %e, "Failed to record run failure");
            }
        }

        match lock.release(&user, token).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(user = %user, run_id = %run_id, "Run lock was no longer held"),
            Err(e) => tracing::error!(user = %user, error = %e, "Failed to release run lock"),
        }
    }
}
