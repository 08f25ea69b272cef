//! Per-video pipeline: download → compress → extract audio → chunk →
//! transcribe → notes → persist, driving the video state machine.

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use uuid::Uuid;

use clipnotes_core::models::Video;
use clipnotes_core::Config;
use clipnotes_db::{NewTranscription, TranscriptionRepository, VideoRepository};
use clipnotes_media as media;
use clipnotes_services::{NotesClient, RetryPolicy, Transcribe, TranscriptionEngine};
use clipnotes_storage::{keys, Storage, StorageError};

pub struct JobRunner<T: Transcribe + 'static> {
    videos: VideoRepository,
    transcriptions: TranscriptionRepository,
    storage: Arc<dyn Storage>,
    engine: TranscriptionEngine<T>,
    notes: NotesClient,
    config: Config,
    storage_retry: RetryPolicy,
}

impl<T: Transcribe + 'static> JobRunner<T> {
    pub fn new(
        videos: VideoRepository,
        transcriptions: TranscriptionRepository,
        storage: Arc<dyn Storage>,
        transcriber: Arc<T>,
        notes: NotesClient,
        config: Config,
    ) -> Self {
        let engine = TranscriptionEngine::new(transcriber, config.max_concurrent_transcriptions);
        Self {
            videos,
            transcriptions,
            storage,
            engine,
            notes,
            config,
            storage_retry: RetryPolicy::default(),
        }
    }

    /// Run the full pipeline for one video. Scratch files live in a per-job
    /// temp directory released on every exit path, including the deadline
    /// breach.
    #[tracing::instrument(skip(self), fields(video_id = %video_id))]
    pub async fn process_video(&self, owner_id: Uuid, video_id: Uuid) -> Result<()> {
        let video = self
            .videos
            .get(owner_id, video_id)
            .await
            .map_err(|e| anyhow!("{}", e))
            .context("Failed to load video")?
            .ok_or_else(|| anyhow!("Video {} not found", video_id))?;

        // Conditional claim serializes concurrent attempts on the same video.
        let claimed = self
            .videos
            .begin_processing(video_id)
            .await
            .map_err(|e| anyhow!("{}", e))
            .context("Failed to transition video to processing")?;
        if !claimed {
            tracing::warn!(
                video_id = %video_id,
                status = %video.status,
                "Video not claimable, another processing attempt is active"
            );
            return Ok(());
        }

        tracing::info!(video_id = %video_id, "Starting video processing");
        let started = Instant::now();
        let scratch = TempDir::new().context("Failed to create scratch directory")?;
        let deadline = Duration::from_secs(self.config.job_timeout_seconds);

        let result = tokio::time::timeout(
            deadline,
            self.run_pipeline(&video, scratch.path(), started),
        )
        .await;

        match result {
            Ok(Ok(())) => {
                tracing::info!(
                    video_id = %video_id,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Video processing completed"
                );
                Ok(())
            }
            Ok(Err(e)) => {
                let message = format!("{:#}", e);
                tracing::error!(video_id = %video_id, error = %message, "Video processing failed");
                if let Err(db_err) = self.videos.mark_failed(video_id, &message).await {
                    tracing::error!(error = %db_err, "Failed to persist failure status");
                }
                Err(e)
            }
            Err(_) => {
                let message = "Processing exceeded the job deadline".to_string();
                tracing::error!(video_id = %video_id, "Video processing deadline exceeded");
                if let Err(db_err) = self.videos.mark_failed(video_id, &message).await {
                    tracing::error!(error = %db_err, "Failed to persist failure status");
                }
                Err(anyhow!(message))
            }
        }
        // scratch drops here: chunks, audio and downloads are removed on all
        // exit paths.
    }

    async fn run_pipeline(&self, video: &Video, scratch: &Path, started: Instant) -> Result<()> {
        let video_id = video.id;

        // Download the source object.
        let extension = keys::extension_of(&video.storage_key).unwrap_or_else(|| "mp4".to_string());
        let source_path = scratch.join(format!("source.{}", extension));
        self.download_with_retry(&video.storage_key, &source_path)
            .await
            .context("Failed to download source object")?;

        // Probe.
        let info = media::probe(&self.config.ffprobe_path, &source_path)
            .await
            .context("Source file is not decodable")?;
        if !info.audio_present {
            return Err(anyhow!("Source file has no audio track"));
        }

        // Compress and swap the stored object for the fast-start artifact.
        let working_path = self.compress_and_replace(video, &source_path, &info, scratch).await?;

        // Extract audio.
        let (audio_path, _audio_bytes) = media::extract_audio(
            &self.config.ffmpeg_path,
            &working_path,
            scratch,
            self.config.audio_extract_bitrate_kbps,
        )
        .await
        .context("Failed to extract audio")?;

        // Chunk.
        let chunk_dir = scratch.join("chunks");
        tokio::fs::create_dir_all(&chunk_dir)
            .await
            .context("Failed to create chunk directory")?;
        let chunks = media::chunk_audio(
            &self.config.ffmpeg_path,
            &audio_path,
            &chunk_dir,
            info.duration_s,
            self.config.audio_chunk_threshold_bytes,
        )
        .await
        .context("Failed to chunk audio")?;

        // Transcribe (bounded fan-out, fail fast).
        let merged = self
            .engine
            .transcribe_chunks(&chunks)
            .await
            .context("Transcription failed")?;

        // Persist the transcript, replacing any previous run atomically.
        self.transcriptions
            .upsert(
                video_id,
                NewTranscription {
                    transcript_text: merged.full_text.clone(),
                    transcript_segments: merged.segments.clone(),
                    model_used: merged.model_used,
                    processing_duration_ms: started.elapsed().as_millis() as i64,
                    audio_size_bytes: merged.audio_size_bytes as i64,
                },
            )
            .await
            .map_err(|e| anyhow!("{}", e))
            .context("Failed to persist transcription")?;

        // Notes are a value-add, not a correctness requirement: failure is
        // logged and the video still completes with notes = null.
        match self
            .notes
            .generate(&merged.full_text, &merged.segments)
            .await
        {
            Ok(outcome) => {
                if let Err(e) = self
                    .transcriptions
                    .set_notes(video_id, &outcome.notes, &outcome.model_used, outcome.duration_ms)
                    .await
                {
                    tracing::warn!(video_id = %video_id, error = %e, "Failed to persist notes");
                }
            }
            Err(e) => {
                tracing::warn!(
                    video_id = %video_id,
                    error = %e,
                    "Notes generation failed, continuing without notes"
                );
            }
        }

        self.videos
            .mark_completed(video_id, Some(info.duration_s))
            .await
            .map_err(|e| anyhow!("{}", e))
            .context("Failed to mark video completed")?;

        Ok(())
    }

    /// Step 3: transcode, upload the compressed artifact under its own key,
    /// delete the pre-compression object, and record the swap. An upload
    /// failure retains the original and the pipeline continues with it.
    async fn compress_and_replace(
        &self,
        video: &Video,
        source_path: &Path,
        info: &media::MediaInfo,
        scratch: &Path,
    ) -> Result<std::path::PathBuf> {
        let outcome = media::compress(
            &self.config.ffmpeg_path,
            source_path,
            scratch,
            info,
            &self.config.compression,
        )
        .await
        .context("Failed to compress video")?;

        if outcome.skipped {
            // Over the hard cap: the original object stays authoritative and
            // is served for playback as-is.
            self.videos
                .set_compressed_artifact(
                    video.id,
                    &video.storage_key,
                    info.size_bytes as i64,
                    &video.storage_key,
                )
                .await
                .map_err(|e| anyhow!("{}", e))
                .context("Failed to record playback artifact")?;
            return Ok(outcome.path);
        }

        let compressed_key = keys::compressed_key(video.owner_id, video.id);
        match self
            .upload_with_retry(&outcome.path, &compressed_key, "video/mp4")
            .await
        {
            Ok(bytes) => {
                // The old source is only removed once the replacement exists.
                // On a re-run the source key already is the compressed key.
                if video.storage_key != compressed_key {
                    if let Err(e) = self.storage.delete(&video.storage_key).await {
                        tracing::warn!(
                            key = %video.storage_key,
                            error = %e,
                            "Failed to delete pre-compression object"
                        );
                    }
                }
                self.videos
                    .set_compressed_artifact(
                        video.id,
                        &compressed_key,
                        bytes as i64,
                        &compressed_key,
                    )
                    .await
                    .map_err(|e| anyhow!("{}", e))
                    .context("Failed to record compressed artifact")?;
            }
            Err(e) => {
                tracing::warn!(
                    video_id = %video.id,
                    error = %e,
                    "Compressed artifact upload failed, retaining original object"
                );
            }
        }

        Ok(outcome.path)
    }

    fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.config.call_timeout_seconds)
    }

    async fn download_once(&self, key: &str, dest: &Path) -> Result<u64, StorageError> {
        match tokio::time::timeout(self.call_timeout(), self.storage.get_to_file(key, dest)).await
        {
            Ok(result) => result,
            Err(_) => Err(StorageError::BackendError(
                "Download deadline exceeded".to_string(),
            )),
        }
    }

    async fn upload_once(
        &self,
        path: &Path,
        key: &str,
        content_type: &str,
    ) -> Result<u64, StorageError> {
        match tokio::time::timeout(
            self.call_timeout(),
            self.storage.put_file(path, key, content_type),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(StorageError::BackendError(
                "Upload deadline exceeded".to_string(),
            )),
        }
    }

    async fn download_with_retry(&self, key: &str, dest: &Path) -> Result<u64> {
        self.storage_retry
            .run(
                || self.download_once(key, dest),
                |e| !matches!(e, StorageError::NotFound(_)),
            )
            .await
            .map_err(|e| anyhow!("{}", e))
    }

    async fn upload_with_retry(&self, path: &Path, key: &str, content_type: &str) -> Result<u64> {
        self.storage_retry
            .run(|| self.upload_once(path, key, content_type), |_| true)
            .await
            .map_err(|e| anyhow!("{}", e))
    }
}
