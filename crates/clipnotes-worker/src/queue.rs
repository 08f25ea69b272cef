//! Job queue: worker pool, polling claim loop, retry, and dispatch.
//!
//! Shutdown: [`JobQueue::shutdown`] signals the pool to stop; it does not wait
//! for in-flight jobs. Jobs stranded by a terminated worker are recovered by
//! the stale-job reaper on the next scan.

use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use clipnotes_core::models::ProcessingJob;
use clipnotes_core::AppError;
use clipnotes_db::JobRepository;

use crate::context::JobContext;

/// Maximum delay in seconds before retrying a failed job. Caps exponential
/// backoff so that high retry counts do not produce excessively long delays.
pub const MAX_RETRY_BACKOFF_SECS: u64 = 300;

/// Computes backoff in seconds for a given retry count (exponential with cap).
#[inline]
pub(crate) fn compute_retry_backoff_seconds(retry_count: i32) -> u64 {
    (2_u64.saturating_pow(retry_count.max(0) as u32)).min(MAX_RETRY_BACKOFF_SECS)
}

#[derive(Clone)]
pub struct JobQueueConfig {
    pub max_workers: usize,
    pub poll_interval_ms: u64,
    pub default_timeout_seconds: i32,
    pub max_retries: i32,
    /// Interval in seconds between runs of the stale job reaper. 0 = disabled.
    pub stale_reap_interval_secs: u64,
    /// Grace period in seconds added to job timeout before reaping stale
    /// running jobs.
    pub stale_grace_period_secs: i64,
}

impl Default for JobQueueConfig {
    fn default() -> Self {
        Self {
            max_workers: 1,
            poll_interval_ms: 1000,
            default_timeout_seconds: 3600,
            max_retries: 3,
            stale_reap_interval_secs: 60,
            stale_grace_period_secs: 300,
        }
    }
}

#[derive(Clone)]
pub struct JobQueue {
    repository: JobRepository,
    config: JobQueueConfig,
    shutdown: CancellationToken,
}

impl JobQueue {
    /// Create a queue with a weak reference to the dispatch context and spawn
    /// its worker pool.
    pub fn new(
        repository: JobRepository,
        config: JobQueueConfig,
        context: Weak<dyn JobContext>,
    ) -> Self {
        let shutdown = CancellationToken::new();

        let repo_clone = repository.clone();
        let config_clone = config.clone();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            Self::worker_pool(repo_clone, config_clone, context, shutdown_clone).await;
        });

        Self {
            repository,
            config,
            shutdown,
        }
    }

    /// Hand a job to the queue; returns once the job row is durably accepted.
    #[tracing::instrument(skip(self))]
    pub async fn submit(&self, owner_id: Uuid, video_id: Uuid) -> Result<Uuid, AppError> {
        let job = self
            .repository
            .create(
                video_id,
                owner_id,
                self.config.max_retries,
                self.config.default_timeout_seconds,
            )
            .await?;

        tracing::info!(job_id = %job.id, video_id = %video_id, "Job submitted to queue");
        Ok(job.id)
    }

    async fn worker_pool(
        repository: JobRepository,
        config: JobQueueConfig,
        context: Weak<dyn JobContext>,
        shutdown: CancellationToken,
    ) {
        tracing::info!(
            max_workers = config.max_workers,
            poll_interval_ms = config.poll_interval_ms,
            "Job queue worker pool started"
        );

        let semaphore = Arc::new(Semaphore::new(config.max_workers.max(1)));
        let poll_interval = Duration::from_millis(config.poll_interval_ms);

        // Stale job reaper (if interval > 0); stops with the pool.
        if config.stale_reap_interval_secs > 0 {
            let repo_for_reaper = repository.clone();
            let reap_interval = Duration::from_secs(config.stale_reap_interval_secs);
            let grace_period = config.stale_grace_period_secs;
            let reaper_shutdown = shutdown.child_token();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(reap_interval);
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            if let Err(e) = repo_for_reaper.reap_stale(grace_period).await {
                                tracing::error!(error = %e, "Stale job reaper failed");
                            }
                        }
                        _ = reaper_shutdown.cancelled() => break,
                    }
                }
            });
        }

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Job queue worker pool shutting down");
                    break;
                }
                _ = sleep(poll_interval) => {
                    Self::claim_and_dispatch_one(&repository, &semaphore, &context).await;
                }
            }
        }

        tracing::info!("Job queue worker pool stopped");
    }

    async fn claim_and_dispatch_one(
        repository: &JobRepository,
        semaphore: &Arc<Semaphore>,
        context: &Weak<dyn JobContext>,
    ) {
        let permit = match semaphore.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::debug!("No workers available, skipping claim");
                return;
            }
        };

        match repository.claim_next().await {
            Ok(Some(job)) => {
                let repo = repository.clone();
                let ctx = context.clone();

                tokio::spawn(async move {
                    let _permit = permit;
                    if let Err(e) = Self::process_job(job, repo, ctx).await {
                        tracing::error!(error = %e, "Job processing failed after retries");
                    }
                });
            }
            Ok(None) => {
                drop(permit);
                tracing::trace!("No jobs available in queue");
            }
            Err(e) => {
                drop(permit);
                tracing::error!(error = %e, "Failed to claim job from queue");
            }
        }
    }

    #[tracing::instrument(skip(repository, context), fields(job.id = %job.id, video.id = %job.video_id))]
    async fn process_job(
        job: ProcessingJob,
        repository: JobRepository,
        context: Weak<dyn JobContext>,
    ) -> anyhow::Result<()> {
        let ctx = context
            .upgrade()
            .ok_or_else(|| anyhow::anyhow!("JobContext was dropped, cannot process job"))?;

        let timeout_duration = job
            .timeout_seconds
            .map(|s| Duration::from_secs(s as u64))
            .unwrap_or(Duration::from_secs(3600));

        let result =
            tokio::time::timeout(timeout_duration, ctx.run_job(job.owner_id, job.video_id)).await;

        match result {
            Ok(Ok(())) => {
                repository.mark_completed(job.id).await?;
                tracing::info!(job_id = %job.id, "Job completed successfully");
                Ok(())
            }
            Ok(Err(e)) => {
                tracing::error!(
                    job_id = %job.id,
                    error = %e,
                    retry_count = job.retry_count,
                    max_retries = job.max_retries,
                    "Job execution failed"
                );

                if job.can_retry() {
                    let backoff_seconds = compute_retry_backoff_seconds(job.retry_count);
                    tracing::info!(
                        job_id = %job.id,
                        retry_count = job.retry_count + 1,
                        backoff_seconds,
                        "Scheduling job retry"
                    );
                    repository
                        .reschedule_retry(job.id, &e.to_string(), backoff_seconds as i64)
                        .await?;
                    Ok(())
                } else {
                    repository.mark_failed(job.id, &e.to_string()).await?;
                    tracing::error!(job_id = %job.id, "Job failed after max retries");
                    Err(e)
                }
            }
            Err(_) => {
                tracing::error!(
                    job_id = %job.id,
                    timeout_seconds = ?job.timeout_seconds,
                    "Job execution timed out"
                );
                if job.can_retry() {
                    let backoff_seconds = compute_retry_backoff_seconds(job.retry_count);
                    repository
                        .reschedule_retry(job.id, "Job execution timed out", backoff_seconds as i64)
                        .await?;
                    Ok(())
                } else {
                    repository
                        .mark_failed(job.id, "Job execution timed out")
                        .await?;
                    Err(anyhow::anyhow!("Job execution timed out"))
                }
            }
        }
    }

    /// Signals the worker pool (and its reaper) to stop claiming new jobs and
    /// exit. Returns immediately; in-flight jobs run to completion or are
    /// recovered by the reaper after a restart.
    pub fn shutdown(&self) {
        tracing::info!("Initiating job queue shutdown");
        self.shutdown.cancel();
    }
}

/// Enqueue semantics for the ingest path.
///
/// `Queued` writes a durable job row picked up by the worker pool. `Inline`
/// is the local-development fallback: it runs the job in a background task of
/// the ingest process without blocking the ingest response.
#[derive(Clone)]
pub enum JobDispatcher {
    Queued(JobQueue),
    Inline(Weak<dyn JobContext>),
}

impl JobDispatcher {
    pub async fn enqueue(&self, owner_id: Uuid, video_id: Uuid) -> Result<(), AppError> {
        match self {
            JobDispatcher::Queued(queue) => {
                queue.submit(owner_id, video_id).await?;
                Ok(())
            }
            JobDispatcher::Inline(context) => {
                let ctx = context.upgrade().ok_or_else(|| {
                    AppError::Internal("Job context unavailable for inline dispatch".to_string())
                })?;
                tokio::spawn(async move {
                    if let Err(e) = ctx.run_job(owner_id, video_id).await {
                        tracing::error!(
                            video_id = %video_id,
                            error = %e,
                            "Inline job execution failed"
                        );
                    }
                });
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_backoff_exponential_then_capped() {
        assert_eq!(compute_retry_backoff_seconds(0), 1);
        assert_eq!(compute_retry_backoff_seconds(1), 2);
        assert_eq!(compute_retry_backoff_seconds(2), 4);
        assert_eq!(compute_retry_backoff_seconds(8), 256);
        assert_eq!(compute_retry_backoff_seconds(9), MAX_RETRY_BACKOFF_SECS);
        assert_eq!(compute_retry_backoff_seconds(30), MAX_RETRY_BACKOFF_SECS);
    }

    #[test]
    fn test_retry_backoff_handles_negative_count() {
        assert_eq!(compute_retry_backoff_seconds(-1), 1);
    }

    #[test]
    fn test_queue_config_defaults() {
        let config = JobQueueConfig::default();
        assert_eq!(config.max_workers, 1);
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.default_timeout_seconds, 3600);
        assert_eq!(config.max_retries, 3);
    }
}
