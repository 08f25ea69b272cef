//! Processing job queue repository.
//!
//! Jobs are claimed with `FOR UPDATE SKIP LOCKED` so multiple workers never
//! hand the same job to two runners.

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use clipnotes_core::models::{JobStatus, ProcessingJob};
use clipnotes_core::AppError;

fn job_from_row(row: &PgRow) -> Result<ProcessingJob, sqlx::Error> {
    let status = row
        .get::<String, _>("status")
        .parse::<JobStatus>()
        .map_err(|e| sqlx::Error::Decode(format!("Failed to parse job status: {}", e).into()))?;

    Ok(ProcessingJob {
        id: row.get("id"),
        video_id: row.get("video_id"),
        owner_id: row.get("owner_id"),
        status,
        retry_count: row.get("retry_count"),
        max_retries: row.get("max_retries"),
        timeout_seconds: row.get("timeout_seconds"),
        last_error: row.get("last_error"),
        scheduled_at: row.get("scheduled_at"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[derive(Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Durably accept a processing job for a video.
    pub async fn create(
        &self,
        video_id: Uuid,
        owner_id: Uuid,
        max_retries: i32,
        timeout_seconds: i32,
    ) -> Result<ProcessingJob, AppError> {
        let row = sqlx::query(
            "INSERT INTO processing_jobs (id, video_id, owner_id, status, max_retries, timeout_seconds) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(video_id)
        .bind(owner_id)
        .bind(JobStatus::Pending.to_string())
        .bind(max_retries)
        .bind(timeout_seconds)
        .fetch_one(&self.pool)
        .await?;

        Ok(job_from_row(&row)?)
    }

    /// Claim the next due job, marking it `Running`. `SKIP LOCKED` keeps
    /// concurrent workers from double-claiming.
    pub async fn claim_next(&self) -> Result<Option<ProcessingJob>, AppError> {
        let row = sqlx::query(
            "UPDATE processing_jobs SET status = $1, started_at = now(), updated_at = now() \
             WHERE id = ( \
               SELECT id FROM processing_jobs \
               WHERE status IN ($2, $3) AND scheduled_at <= now() \
               ORDER BY scheduled_at \
               LIMIT 1 \
               FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING *",
        )
        .bind(JobStatus::Running.to_string())
        .bind(JobStatus::Pending.to_string())
        .bind(JobStatus::Scheduled.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| job_from_row(&r)).transpose().map_err(Into::into)
    }

    pub async fn mark_completed(&self, job_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE processing_jobs SET status = $2, completed_at = now(), updated_at = now() \
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(JobStatus::Completed.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn mark_failed(&self, job_id: Uuid, error: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE processing_jobs SET status = $2, last_error = $3, completed_at = now(), \
             updated_at = now() WHERE id = $1",
        )
        .bind(job_id)
        .bind(JobStatus::Failed.to_string())
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Reschedule a failed attempt after a backoff delay.
    pub async fn reschedule_retry(
        &self,
        job_id: Uuid,
        error: &str,
        backoff_seconds: i64,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE processing_jobs SET status = $2, last_error = $3, \
             retry_count = retry_count + 1, \
             scheduled_at = now() + make_interval(secs => $4::double precision), \
             updated_at = now() \
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(JobStatus::Scheduled.to_string())
        .bind(error)
        .bind(backoff_seconds as f64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Recover jobs stranded in `Running` by a terminated worker: past their
    /// timeout plus a grace period, they are rescheduled when retries remain
    /// and failed otherwise. Replays are safe (idempotent writes, stable keys).
    pub async fn reap_stale(&self, grace_period_seconds: i64) -> Result<u64, AppError> {
        let rescheduled = sqlx::query(
            "UPDATE processing_jobs SET status = $1, retry_count = retry_count + 1, \
             scheduled_at = now(), last_error = 'Worker terminated mid-job', updated_at = now() \
             WHERE status = $2 AND retry_count < max_retries \
             AND started_at + make_interval(secs => (COALESCE(timeout_seconds, 3600) + $3)::double precision) < now()",
        )
        .bind(JobStatus::Scheduled.to_string())
        .bind(JobStatus::Running.to_string())
        .bind(grace_period_seconds as f64)
        .execute(&self.pool)
        .await?
        .rows_affected();

        let failed = sqlx::query(
            "UPDATE processing_jobs SET status = $1, completed_at = now(), \
             last_error = 'Worker terminated mid-job', updated_at = now() \
             WHERE status = $2 AND retry_count >= max_retries \
             AND started_at + make_interval(secs => (COALESCE(timeout_seconds, 3600) + $3)::double precision) < now()",
        )
        .bind(JobStatus::Failed.to_string())
        .bind(JobStatus::Running.to_string())
        .bind(grace_period_seconds as f64)
        .execute(&self.pool)
        .await?
        .rows_affected();

        let reaped = rescheduled + failed;
        if reaped > 0 {
            tracing::warn!(rescheduled, failed, "Reaped stale running jobs");
        }
        Ok(reaped)
    }
}
