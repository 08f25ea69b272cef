//! Two-phase direct-to-object-store upload.
//!
//! Phase one reserves a video record and issues a presigned PUT; phase two
//! verifies the object landed, flips the record to `Uploaded`, and enqueues
//! the processing job.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use clipnotes_core::models::VideoStatus;
use clipnotes_core::AppError;
use clipnotes_media::validate_upload;
use clipnotes_storage::keys;

use crate::auth::OwnerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PresignedUploadRequest {
    #[validate(length(min = 1, max = 255))]
    pub filename: String,
    #[validate(range(min = 1))]
    pub file_size: u64,
    #[validate(length(min = 1, max = 255))]
    pub content_type: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PresignedUploadResponse {
    pub video_id: Uuid,
    pub upload_url: String,
    pub object_key: String,
    pub expires_in: u64,
    pub status_url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CompleteUploadResponse {
    pub video_id: Uuid,
    pub status: VideoStatus,
    pub status_url: String,
}

pub fn status_url(video_id: Uuid) -> String {
    format!("/api/videos/{}/status", video_id)
}

/// Request a presigned upload URL
#[utoipa::path(
    post,
    path = "/api/videos/upload/presigned",
    tag = "videos",
    request_body = PresignedUploadRequest,
    responses(
        (status = 201, description = "Upload URL issued", body = PresignedUploadResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 502, description = "Storage unavailable", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(owner_id = %owner.owner_id, filename = %request.filename)
)]
pub async fn request_presigned_upload(
    owner: OwnerContext,
    State(state): State<Arc<AppState>>,
    Json(request): Json<PresignedUploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate().map_err(AppError::from)?;
    validate_upload(
        &request.filename,
        request.file_size,
        &request.content_type,
        state.config.max_upload_bytes,
        &state.config.allowed_extensions,
        &state.config.allowed_content_types,
    )?;

    let video_id = Uuid::new_v4();
    let extension = keys::extension_of(&request.filename)
        .ok_or_else(|| AppError::InvalidInput("Filename has no extension".to_string()))?;
    let object_key = keys::source_key(owner.owner_id, video_id, &extension);

    let upload_url = state
        .storage
        .presigned_put_url(&object_key, &request.content_type, state.presigned_ttl())
        .await?;

    state
        .videos
        .create_upload(
            owner.owner_id,
            video_id,
            &request.filename,
            &request.content_type,
            &object_key,
            request.file_size as i64,
            &request.filename,
        )
        .await?;

    tracing::info!(video_id = %video_id, key = %object_key, "Presigned upload issued");

    Ok((
        StatusCode::CREATED,
        Json(PresignedUploadResponse {
            video_id,
            upload_url,
            object_key,
            expires_in: state.config.presigned_url_ttl_secs,
            status_url: status_url(video_id),
        }),
    ))
}

/// Complete a direct upload after the client PUT the bytes
#[utoipa::path(
    post,
    path = "/api/videos/{id}/upload/complete",
    tag = "videos",
    params(("id" = Uuid, Path, description = "Video id")),
    responses(
        (status = 200, description = "Upload verified, processing enqueued", body = CompleteUploadResponse),
        (status = 400, description = "Uploaded object missing", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse),
        (status = 409, description = "Upload already completed", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(owner_id = %owner.owner_id, video_id = %video_id))]
pub async fn complete_upload(
    owner: OwnerContext,
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let video = state
        .videos
        .get(owner.owner_id, video_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video {} not found", video_id)))?;

    if video.status != VideoStatus::Uploading {
        return Err(HttpAppError(AppError::Conflict(format!(
            "Upload already completed (status: {})",
            video.status
        ))));
    }

    let exists = state.storage.exists(&video.storage_key).await?;
    if !exists {
        state
            .videos
            .mark_upload_failed(
                owner.owner_id,
                video_id,
                "Upload verification failed: object not found in storage",
            )
            .await?;
        return Err(HttpAppError(AppError::InvalidInput(
            "Uploaded object not found in storage; the upload may have failed or expired"
                .to_string(),
        )));
    }

    // Conditional transition; a concurrent completion loses the race here and
    // must not enqueue a second job.
    let video = state
        .videos
        .mark_uploaded(owner.owner_id, video_id)
        .await?
        .ok_or_else(|| {
            AppError::Conflict("Upload completion already in progress".to_string())
        })?;

    state
        .dispatcher
        .enqueue(owner.owner_id, video_id)
        .await?;

    tracing::info!(video_id = %video_id, "Upload completed, processing job enqueued");

    Ok(Json(CompleteUploadResponse {
        video_id,
        status: video.status,
        status_url: status_url(video_id),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_url_shape() {
        let id = Uuid::new_v4();
        assert_eq!(status_url(id), format!("/api/videos/{}/status", id));
    }

    #[test]
    fn test_presigned_request_constraints() {
        let request = PresignedUploadRequest {
            filename: "clip.mp4".to_string(),
            file_size: 1024,
            content_type: "video/mp4".to_string(),
        };
        assert!(request.validate().is_ok());

        let request = PresignedUploadRequest {
            filename: String::new(),
            file_size: 1024,
            content_type: "video/mp4".to_string(),
        };
        assert!(request.validate().is_err());

        let request = PresignedUploadRequest {
            filename: "clip.mp4".to_string(),
            file_size: 0,
            content_type: "video/mp4".to_string(),
        };
        assert!(request.validate().is_err());
    }
}
