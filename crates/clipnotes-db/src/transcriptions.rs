//! Transcription repository (one row per video).

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use clipnotes_core::models::{StructuredNotes, TranscriptSegment, Transcription};
use clipnotes_core::AppError;

/// Fields written by the pipeline when a transcription run succeeds.
#[derive(Debug, Clone)]
pub struct NewTranscription {
    pub transcript_text: String,
    pub transcript_segments: Vec<TranscriptSegment>,
    pub model_used: String,
    pub processing_duration_ms: i64,
    pub audio_size_bytes: i64,
}

fn transcription_from_row(row: &PgRow) -> Result<Transcription, sqlx::Error> {
    let segments: serde_json::Value = row.get("transcript_segments");
    let transcript_segments: Vec<TranscriptSegment> = serde_json::from_value(segments)
        .map_err(|e| sqlx::Error::Decode(format!("Failed to parse segments: {}", e).into()))?;

    let notes: Option<serde_json::Value> = row.get("notes");
    let notes: Option<StructuredNotes> = notes
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| sqlx::Error::Decode(format!("Failed to parse notes: {}", e).into()))?;

    Ok(Transcription {
        id: row.get("id"),
        video_id: row.get("video_id"),
        transcript_text: row.get("transcript_text"),
        transcript_segments,
        model_used: row.get("model_used"),
        processing_duration_ms: row.get("processing_duration_ms"),
        audio_size_bytes: row.get("audio_size_bytes"),
        notes,
        notes_model_used: row.get("notes_model_used"),
        notes_duration_ms: row.get("notes_duration_ms"),
        created_at: row.get("created_at"),
    })
}

#[derive(Clone)]
pub struct TranscriptionRepository {
    pool: PgPool,
}

impl TranscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Write or atomically replace the transcription for a video. A re-run
    /// resets the notes columns; they are filled again by `set_notes`.
    pub async fn upsert(
        &self,
        video_id: Uuid,
        new: NewTranscription,
    ) -> Result<Transcription, AppError> {
        let segments = serde_json::to_value(&new.transcript_segments)?;

        let row = sqlx::query(
            "INSERT INTO transcriptions \
             (id, video_id, transcript_text, transcript_segments, model_used, \
              processing_duration_ms, audio_size_bytes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (video_id) DO UPDATE SET \
               transcript_text = EXCLUDED.transcript_text, \
               transcript_segments = EXCLUDED.transcript_segments, \
               model_used = EXCLUDED.model_used, \
               processing_duration_ms = EXCLUDED.processing_duration_ms, \
               audio_size_bytes = EXCLUDED.audio_size_bytes, \
               notes = NULL, \
               notes_model_used = NULL, \
               notes_duration_ms = NULL, \
               created_at = now() \
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(video_id)
        .bind(&new.transcript_text)
        .bind(segments)
        .bind(&new.model_used)
        .bind(new.processing_duration_ms)
        .bind(new.audio_size_bytes)
        .fetch_one(&self.pool)
        .await?;

        Ok(transcription_from_row(&row)?)
    }

    pub async fn get_by_video(&self, video_id: Uuid) -> Result<Option<Transcription>, AppError> {
        let row = sqlx::query("SELECT * FROM transcriptions WHERE video_id = $1")
            .bind(video_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| transcription_from_row(&r))
            .transpose()
            .map_err(Into::into)
    }

    /// Attach the generated notes document and its metadata.
    pub async fn set_notes(
        &self,
        video_id: Uuid,
        notes: &StructuredNotes,
        notes_model_used: &str,
        notes_duration_ms: i64,
    ) -> Result<(), AppError> {
        let notes_json = serde_json::to_value(notes)?;

        sqlx::query(
            "UPDATE transcriptions SET notes = $2, notes_model_used = $3, notes_duration_ms = $4 \
             WHERE video_id = $1",
        )
        .bind(video_id)
        .bind(notes_json)
        .bind(notes_model_used)
        .bind(notes_duration_ms)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
