//! Shared application state.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use clipnotes_core::Config;
use clipnotes_db::{
    CollectionRepository, JobRepository, TranscriptionRepository, VideoRepository,
};
use clipnotes_services::{NotesClient, SpeechClient};
use clipnotes_storage::Storage;
use clipnotes_worker::{JobContext, JobDispatcher, JobQueue, JobQueueConfig, JobRunner};

pub struct AppState {
    pub config: Config,
    pub videos: VideoRepository,
    pub transcriptions: TranscriptionRepository,
    pub collections: CollectionRepository,
    pub jobs: JobRepository,
    pub storage: Arc<dyn Storage>,
    pub dispatcher: JobDispatcher,
    runner: JobRunner<SpeechClient>,
}

impl AppState {
    /// Build the application state. The dispatcher holds a weak reference
    /// back to this state (it implements [`JobContext`]), so construction
    /// goes through `Arc::new_cyclic`.
    pub fn build(config: Config, pool: PgPool, storage: Arc<dyn Storage>) -> Arc<Self> {
        let videos = VideoRepository::new(pool.clone());
        let transcriptions = TranscriptionRepository::new(pool.clone());
        let collections = CollectionRepository::new(pool.clone());
        let jobs = JobRepository::new(pool);

        let call_timeout = Duration::from_secs(config.call_timeout_seconds);
        let speech = Arc::new(SpeechClient::new(config.speech.clone(), call_timeout));
        let notes = NotesClient::new(config.notes.clone(), call_timeout);

        let runner = JobRunner::new(
            videos.clone(),
            transcriptions.clone(),
            storage.clone(),
            speech,
            notes,
            config.clone(),
        );

        Arc::new_cyclic(|weak: &std::sync::Weak<AppState>| {
            let context: std::sync::Weak<dyn JobContext> = weak.clone();
            let dispatcher = if config.job_queue_enabled {
                let queue_config = JobQueueConfig {
                    max_workers: config.job_queue_max_workers,
                    poll_interval_ms: config.job_queue_poll_interval_ms,
                    default_timeout_seconds: config.job_timeout_seconds as i32,
                    max_retries: config.job_queue_max_retries,
                    stale_reap_interval_secs: config.stale_job_reap_interval_secs,
                    stale_grace_period_secs: config.stale_job_grace_period_secs,
                };
                JobDispatcher::Queued(JobQueue::new(jobs.clone(), queue_config, context))
            } else {
                tracing::info!("Job queue disabled, using in-process dispatch");
                JobDispatcher::Inline(context)
            };

            AppState {
                config,
                videos,
                transcriptions,
                collections,
                jobs,
                storage,
                dispatcher,
                runner,
            }
        })
    }

    pub fn presigned_ttl(&self) -> Duration {
        Duration::from_secs(self.config.presigned_url_ttl_secs)
    }
}

#[async_trait]
impl JobContext for AppState {
    async fn run_job(self: Arc<Self>, owner_id: Uuid, video_id: Uuid) -> Result<()> {
        self.runner.process_video(owner_id, video_id).await
    }
}
