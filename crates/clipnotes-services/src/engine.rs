//! Transcription engine: bounded-parallel fan-out over audio chunks and
//! timestamp-correct merging.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use clipnotes_core::models::TranscriptSegment;
use clipnotes_media::AudioChunk;

use crate::speech::{SpeechError, Transcribe};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Transcription failed: {0}")]
    ChunkFailed(#[from] SpeechError),

    #[error("Transcription task aborted: {0}")]
    Join(String),
}

/// Merged output across all chunks.
#[derive(Debug)]
pub struct MergedTranscript {
    pub full_text: String,
    pub segments: Vec<TranscriptSegment>,
    /// The weakest model actually used: if any chunk fell back to the
    /// secondary model, that model is reported so callers do not over-trust
    /// quality.
    pub model_used: String,
    pub audio_size_bytes: u64,
}

struct ChunkResult {
    index: usize,
    text: String,
    segments: Vec<TranscriptSegment>,
    model_used: String,
    used_fallback: bool,
}

pub struct TranscriptionEngine<T: Transcribe + 'static> {
    transcriber: Arc<T>,
    max_concurrent: usize,
}

impl<T: Transcribe + 'static> TranscriptionEngine<T> {
    pub fn new(transcriber: Arc<T>, max_concurrent: usize) -> Self {
        Self {
            transcriber,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Transcribe all chunks with at most `max_concurrent` in flight, shift
    /// each chunk's segment times by its start offset, and merge in chunk
    /// order. The first chunk failure aborts pending siblings.
    #[tracing::instrument(skip(self, chunks), fields(chunk_count = chunks.len()))]
    pub async fn transcribe_chunks(
        &self,
        chunks: &[AudioChunk],
    ) -> Result<MergedTranscript, EngineError> {
        let mut audio_size_bytes = 0u64;
        for chunk in chunks {
            if let Ok(meta) = tokio::fs::metadata(&chunk.path).await {
                audio_size_bytes += meta.len();
            }
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut join_set: JoinSet<Result<ChunkResult, SpeechError>> = JoinSet::new();

        for (index, chunk) in chunks.iter().enumerate() {
            let transcriber = self.transcriber.clone();
            let semaphore = semaphore.clone();
            let path = chunk.path.clone();
            let offset = chunk.start_offset_s;

            join_set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| SpeechError::Transient("semaphore closed".to_string()))?;

                let transcript = transcriber.transcribe(&path).await?;

                let segments = transcript
                    .segments
                    .iter()
                    .map(|s| s.shifted(offset))
                    .collect();

                Ok(ChunkResult {
                    index,
                    text: transcript.text,
                    segments,
                    model_used: transcript.model_used,
                    used_fallback: transcript.used_fallback,
                })
            });
        }

        let mut results: Vec<Option<ChunkResult>> = (0..chunks.len()).map(|_| None).collect();

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(Ok(result)) => {
                    let index = result.index;
                    results[index] = Some(result);
                }
                Ok(Err(err)) => {
                    // Fail fast: cancel pending siblings before surfacing.
                    join_set.abort_all();
                    tracing::error!(error = %err, "Chunk transcription failed, cancelling siblings");
                    return Err(EngineError::ChunkFailed(err));
                }
                Err(join_err) if join_err.is_cancelled() => continue,
                Err(join_err) => {
                    join_set.abort_all();
                    return Err(EngineError::Join(join_err.to_string()));
                }
            }
        }

        let mut full_text = String::new();
        let mut segments = Vec::new();
        let mut model_used = String::new();
        let mut fallback_model: Option<String> = None;

        for result in results.into_iter().flatten() {
            if !full_text.is_empty() && !result.text.is_empty() {
                full_text.push(' ');
            }
            full_text.push_str(result.text.trim());
            segments.extend(result.segments);
            if result.used_fallback {
                fallback_model = Some(result.model_used.clone());
            } else if model_used.is_empty() {
                model_used = result.model_used.clone();
            }
        }

        if let Some(fallback) = fallback_model {
            model_used = fallback;
        }

        tracing::info!(
            segment_count = segments.len(),
            model_used = %model_used,
            audio_size_bytes,
            "Chunk transcripts merged"
        );

        Ok(MergedTranscript {
            full_text,
            segments,
            model_used,
            audio_size_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use clipnotes_core::models::segments_are_monotonic;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::speech::ChunkTranscript;

    struct MockTranscriber {
        /// Chunk file names that should fail fatally.
        fail_on: Vec<String>,
        /// File names that should be answered by the fallback model.
        fallback_on: Vec<String>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        delay: Duration,
    }

    impl MockTranscriber {
        fn new() -> Self {
            Self {
                fail_on: Vec::new(),
                fallback_on: Vec::new(),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                delay: Duration::from_millis(20),
            }
        }
    }

    #[async_trait]
    impl Transcribe for MockTranscriber {
        async fn transcribe(&self, chunk_path: &Path) -> Result<ChunkTranscript, SpeechError> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);

            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let name = chunk_path
                .file_name()
                .unwrap()
                .to_string_lossy()
                .to_string();

            if self.fail_on.contains(&name) {
                return Err(SpeechError::Fatal(format!("cannot decode {}", name)));
            }

            let used_fallback = self.fallback_on.contains(&name);
            Ok(ChunkTranscript {
                text: format!("text of {}", name),
                // Chunk-relative times: each chunk produces two segments
                // within its own [0, 10) window.
                segments: vec![
                    clipnotes_core::models::TranscriptSegment {
                        start_s: 0.0,
                        end_s: 4.0,
                        text: format!("{} part one", name),
                    },
                    clipnotes_core::models::TranscriptSegment {
                        start_s: 4.0,
                        end_s: 9.5,
                        text: format!("{} part two", name),
                    },
                ],
                model_used: if used_fallback {
                    "fallback-model".to_string()
                } else {
                    "primary-model".to_string()
                },
                used_fallback,
            })
        }
    }

    fn chunks(count: usize, segment_time: f64) -> Vec<AudioChunk> {
        (0..count)
            .map(|i| AudioChunk {
                path: PathBuf::from(format!("chunk_{:03}.mp3", i)),
                start_offset_s: i as f64 * segment_time,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_merge_shifts_offsets_and_stays_monotonic() {
        let engine = TranscriptionEngine::new(Arc::new(MockTranscriber::new()), 3);
        let merged = engine.transcribe_chunks(&chunks(4, 10.0)).await.unwrap();

        assert_eq!(merged.segments.len(), 8);
        assert!(segments_are_monotonic(&merged.segments));

        // Chunk k's segments land in [k * 10, (k + 1) * 10).
        for (i, segment) in merged.segments.iter().enumerate() {
            let chunk_index = (i / 2) as f64;
            assert!(segment.start_s >= chunk_index * 10.0);
            assert!(segment.start_s < (chunk_index + 1.0) * 10.0);
        }

        assert_eq!(merged.segments[2].start_s, 10.0);
        assert_eq!(merged.segments[7].end_s, 39.5);
    }

    #[tokio::test]
    async fn test_full_text_joins_chunks_in_order() {
        let engine = TranscriptionEngine::new(Arc::new(MockTranscriber::new()), 2);
        let merged = engine.transcribe_chunks(&chunks(3, 10.0)).await.unwrap();
        assert_eq!(
            merged.full_text,
            "text of chunk_000.mp3 text of chunk_001.mp3 text of chunk_002.mp3"
        );
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_cap() {
        let mock = Arc::new(MockTranscriber::new());
        let engine = TranscriptionEngine::new(mock.clone(), 3);
        engine.transcribe_chunks(&chunks(10, 5.0)).await.unwrap();
        assert!(mock.max_in_flight.load(Ordering::SeqCst) <= 3);
        assert!(mock.max_in_flight.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_chunk_failure_fails_the_job() {
        let mut mock = MockTranscriber::new();
        mock.fail_on.push("chunk_001.mp3".to_string());
        let engine = TranscriptionEngine::new(Arc::new(mock), 3);

        let err = engine.transcribe_chunks(&chunks(4, 10.0)).await.unwrap_err();
        match err {
            EngineError::ChunkFailed(cause) => {
                assert!(cause.to_string().contains("chunk_001"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_weakest_model_reported() {
        let mut mock = MockTranscriber::new();
        mock.fallback_on.push("chunk_002.mp3".to_string());
        let engine = TranscriptionEngine::new(Arc::new(mock), 3);

        let merged = engine.transcribe_chunks(&chunks(4, 10.0)).await.unwrap();
        assert_eq!(merged.model_used, "fallback-model");
    }

    #[tokio::test]
    async fn test_primary_model_reported_without_fallback() {
        let engine = TranscriptionEngine::new(Arc::new(MockTranscriber::new()), 3);
        let merged = engine.transcribe_chunks(&chunks(2, 10.0)).await.unwrap();
        assert_eq!(merged.model_used, "primary-model");
    }

    #[tokio::test]
    async fn test_empty_chunk_list() {
        let engine = TranscriptionEngine::new(Arc::new(MockTranscriber::new()), 3);
        let merged = engine.transcribe_chunks(&[]).await.unwrap();
        assert!(merged.full_text.is_empty());
        assert!(merged.segments.is_empty());
    }
}
