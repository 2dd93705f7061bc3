use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    models::{JobState, JobStatus, UserId},
    store::ResultStore,
};

/// PostgreSQL-backed result store
///
/// Uniqueness of the result row is enforced by the primary key on
/// `comparison_result.user_id`, so concurrent writers cannot both succeed.
#[derive(Clone)]
pub struct PgResultStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct StatusRow {
    percent: i32,
    state: String,
    error: Option<String>,
    updated_at: DateTime<Utc>,
}

impl PgResultStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Clamps a stored percentage into the 0..=100 range
fn percent_from_db(value: i32) -> u8 {
    value.clamp(0, 100) as u8
}

#[async_trait::async_trait]
impl ResultStore for PgResultStore {
    async fn set_progress(&self, user: &UserId, percent: u8) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO comparison_progress (user_id, percent)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET percent = EXCLUDED.percent, updated_at = now()
            "#,
        )
        .bind(user.as_str())
        .bind(i32::from(percent))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_progress(&self, user: &UserId) -> AppResult<u8> {
        let percent: Option<i32> =
            sqlx::query_scalar("SELECT percent FROM comparison_progress WHERE user_id = $1")
                .bind(user.as_str())
                .fetch_optional(&self.pool)
                .await?;

        Ok(percent.map(percent_from_db).unwrap_or(0))
    }

    async fn has_result(&self, user: &UserId) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM comparison_result WHERE user_id = $1)",
        )
        .bind(user.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn insert_result(&self, user: &UserId, payload: &str) -> AppResult<()> {
        let inserted = sqlx::query("INSERT INTO comparison_result (user_id, payload) VALUES ($1, $2)")
            .bind(user.as_str())
            .bind(payload)
            .execute(&self.pool)
            .await;

        match inserted {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                tracing::error!(user = %user, "Rejected second result write");
                Err(AppError::DuplicateResult(user.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_result(&self, user: &UserId) -> AppResult<String> {
        let payload: Option<String> =
            sqlx::query_scalar("SELECT payload FROM comparison_result WHERE user_id = $1")
                .bind(user.as_str())
                .fetch_optional(&self.pool)
                .await?;

        Ok(payload.unwrap_or_default())
    }

    async fn set_state(
        &self,
        user: &UserId,
        state: JobState,
        error: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO comparison_progress (user_id, state, error)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id)
            DO UPDATE SET state = EXCLUDED.state, error = EXCLUDED.error, updated_at = now()
            "#,
        )
        .bind(user.as_str())
        .bind(state.as_str())
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_status(&self, user: &UserId) -> AppResult<Option<JobStatus>> {
        let row: Option<StatusRow> = sqlx::query_as(
            r#"
            SELECT percent, state, error, updated_at
            FROM comparison_progress
            WHERE user_id = $1
            "#,
        )
        .bind(user.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let state = row.state.parse::<JobState>().map_err(AppError::Internal)?;
            Ok(JobStatus {
                user: user.clone(),
                state,
                percent: percent_from_db(row.percent),
                error: row.error,
                updated_at: row.updated_at,
            })
        })
        .transpose()
    }
}
