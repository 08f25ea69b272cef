//! Video repository.
//!
//! Every read carries an `owner_id` filter; the job runner is handed the
//! owner id by the queue and goes through the same filtered paths. The
//! status mutations are keyed by id alone but guarded by conditional
//! `WHERE status` clauses, so they only ever advance a row the runner has
//! already claimed.

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use clipnotes_core::models::{StreamableStatus, Video, VideoSource, VideoStatus};
use clipnotes_core::AppError;

fn video_from_row(row: &PgRow) -> Result<Video, sqlx::Error> {
    let source_type: String = row.get("source_type");
    let source = match source_type.as_str() {
        "upload" => VideoSource::Upload {
            filename: row
                .get::<Option<String>, _>("original_filename")
                .unwrap_or_default(),
            content_type: row
                .get::<Option<String>, _>("content_type")
                .unwrap_or_default(),
        },
        "url" => VideoSource::Url {
            origin_url: row.get::<Option<String>, _>("origin_url").unwrap_or_default(),
        },
        other => {
            return Err(sqlx::Error::Decode(
                format!("Unknown source_type: {}", other).into(),
            ))
        }
    };

    let status = row
        .get::<String, _>("status")
        .parse::<VideoStatus>()
        .map_err(|e| sqlx::Error::Decode(format!("Failed to parse status: {}", e).into()))?;
    let streamable_status = row
        .get::<String, _>("streamable_status")
        .parse::<StreamableStatus>()
        .map_err(|e| {
            sqlx::Error::Decode(format!("Failed to parse streamable_status: {}", e).into())
        })?;

    Ok(Video {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        source,
        storage_key: row.get("storage_key"),
        file_size: row.get("file_size"),
        duration_seconds: row.get("duration_seconds"),
        status,
        error_message: row.get("error_message"),
        title: row.get("title"),
        collection_id: row.get("collection_id"),
        streamable_status,
        streamable_key: row.get("streamable_key"),
        created_at: row.get("created_at"),
        uploaded_at: row.get("uploaded_at"),
        processed_at: row.get("processed_at"),
        updated_at: row.get("updated_at"),
    })
}

const VIDEO_COLUMNS: &str = "id, owner_id, source_type, original_filename, content_type, \
     origin_url, storage_key, file_size, duration_seconds, status, error_message, title, \
     collection_id, streamable_status, streamable_key, created_at, uploaded_at, processed_at, \
     updated_at";

#[derive(Clone)]
pub struct VideoRepository {
    pool: PgPool,
}

impl VideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a video in `Uploading` with its storage key reserved.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_upload(
        &self,
        owner_id: Uuid,
        video_id: Uuid,
        filename: &str,
        content_type: &str,
        storage_key: &str,
        file_size: i64,
        title: &str,
    ) -> Result<Video, AppError> {
        let row = sqlx::query(&format!(
            "INSERT INTO videos (id, owner_id, source_type, original_filename, content_type, \
             storage_key, file_size, status, title) \
             VALUES ($1, $2, 'upload', $3, $4, $5, $6, $7, $8) \
             RETURNING {VIDEO_COLUMNS}"
        ))
        .bind(video_id)
        .bind(owner_id)
        .bind(filename)
        .bind(content_type)
        .bind(storage_key)
        .bind(file_size)
        .bind(VideoStatus::Uploading.to_string())
        .bind(title)
        .fetch_one(&self.pool)
        .await?;

        Ok(video_from_row(&row)?)
    }

    /// Create a URL-sourced video directly in `Uploaded`.
    pub async fn create_from_url(
        &self,
        owner_id: Uuid,
        video_id: Uuid,
        origin_url: &str,
        storage_key: &str,
        title: &str,
    ) -> Result<Video, AppError> {
        let row = sqlx::query(&format!(
            "INSERT INTO videos (id, owner_id, source_type, origin_url, storage_key, status, \
             title, uploaded_at) \
             VALUES ($1, $2, 'url', $3, $4, $5, $6, now()) \
             RETURNING {VIDEO_COLUMNS}"
        ))
        .bind(video_id)
        .bind(owner_id)
        .bind(origin_url)
        .bind(storage_key)
        .bind(VideoStatus::Uploaded.to_string())
        .bind(title)
        .fetch_one(&self.pool)
        .await?;

        Ok(video_from_row(&row)?)
    }

    pub async fn get(&self, owner_id: Uuid, video_id: Uuid) -> Result<Option<Video>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE id = $1 AND owner_id = $2"
        ))
        .bind(video_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| video_from_row(&r)).transpose().map_err(Into::into)
    }

    /// Owner's videos, reverse chronological.
    pub async fn list(&self, owner_id: Uuid) -> Result<Vec<Video>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE owner_id = $1 ORDER BY created_at DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| video_from_row(r).map_err(Into::into))
            .collect()
    }

    /// Conditional `Uploading -> Uploaded`. Returns `None` when the video is
    /// not in `Uploading` (double completion, or unknown/cross-owner id).
    pub async fn mark_uploaded(
        &self,
        owner_id: Uuid,
        video_id: Uuid,
    ) -> Result<Option<Video>, AppError> {
        let row = sqlx::query(&format!(
            "UPDATE videos SET status = $3, uploaded_at = now(), updated_at = now() \
             WHERE id = $1 AND owner_id = $2 AND status = $4 \
             RETURNING {VIDEO_COLUMNS}"
        ))
        .bind(video_id)
        .bind(owner_id)
        .bind(VideoStatus::Uploaded.to_string())
        .bind(VideoStatus::Uploading.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| video_from_row(&r)).transpose().map_err(Into::into)
    }

    /// `Uploading -> Failed` when upload verification finds no object.
    pub async fn mark_upload_failed(
        &self,
        owner_id: Uuid,
        video_id: Uuid,
        message: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE videos SET status = $3, error_message = $4, updated_at = now() \
             WHERE id = $1 AND owner_id = $2 AND status = $5",
        )
        .bind(video_id)
        .bind(owner_id)
        .bind(VideoStatus::Failed.to_string())
        .bind(message)
        .bind(VideoStatus::Uploading.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Conditional `{Uploaded, Failed} -> Processing`. Returns `false` when
    /// the video was not claimable, which serializes concurrent attempts.
    pub async fn begin_processing(&self, video_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE videos SET status = $2, error_message = NULL, updated_at = now() \
             WHERE id = $1 AND status IN ($3, $4)",
        )
        .bind(video_id)
        .bind(VideoStatus::Processing.to_string())
        .bind(VideoStatus::Uploaded.to_string())
        .bind(VideoStatus::Failed.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Record the compressed artifact written during processing.
    pub async fn set_compressed_artifact(
        &self,
        video_id: Uuid,
        storage_key: &str,
        file_size: i64,
        streamable_key: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE videos SET storage_key = $2, file_size = $3, streamable_status = $4, \
             streamable_key = $5, updated_at = now() WHERE id = $1",
        )
        .bind(video_id)
        .bind(storage_key)
        .bind(file_size)
        .bind(StreamableStatus::Ready.to_string())
        .bind(streamable_key)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// `Processing -> Completed`; stamps `processed_at` and fills the
    /// duration when it was still unknown.
    pub async fn mark_completed(
        &self,
        video_id: Uuid,
        duration_seconds: Option<f64>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE videos SET status = $2, processed_at = now(), updated_at = now(), \
             duration_seconds = COALESCE(duration_seconds, $3) \
             WHERE id = $1 AND status = $4",
        )
        .bind(video_id)
        .bind(VideoStatus::Completed.to_string())
        .bind(duration_seconds)
        .bind(VideoStatus::Processing.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// `Processing -> Failed` with a human-readable message.
    pub async fn mark_failed(&self, video_id: Uuid, message: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE videos SET status = $2, error_message = $3, updated_at = now() \
             WHERE id = $1 AND status = $4",
        )
        .bind(video_id)
        .bind(VideoStatus::Failed.to_string())
        .bind(message)
        .bind(VideoStatus::Processing.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Limited-field edit (title, collection).
    pub async fn update_fields(
        &self,
        owner_id: Uuid,
        video_id: Uuid,
        title: Option<&str>,
        collection_id: Option<Option<Uuid>>,
    ) -> Result<Option<Video>, AppError> {
        let row = sqlx::query(&format!(
            "UPDATE videos SET \
             title = COALESCE($3, title), \
             collection_id = CASE WHEN $4 THEN $5 ELSE collection_id END, \
             updated_at = now() \
             WHERE id = $1 AND owner_id = $2 \
             RETURNING {VIDEO_COLUMNS}"
        ))
        .bind(video_id)
        .bind(owner_id)
        .bind(title)
        .bind(collection_id.is_some())
        .bind(collection_id.flatten())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| video_from_row(&r)).transpose().map_err(Into::into)
    }

    /// Delete the row (transcription and jobs cascade). Returns the deleted
    /// video so the caller can remove its storage objects.
    pub async fn delete(&self, owner_id: Uuid, video_id: Uuid) -> Result<Option<Video>, AppError> {
        let row = sqlx::query(&format!(
            "DELETE FROM videos WHERE id = $1 AND owner_id = $2 RETURNING {VIDEO_COLUMNS}"
        ))
        .bind(video_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| video_from_row(&r)).transpose().map_err(Into::into)
    }
}
