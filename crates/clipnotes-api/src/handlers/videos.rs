//! Video read and management endpoints.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use clipnotes_core::models::{VideoResponse, VideoStatus, VideoStatusResponse};
use clipnotes_core::AppError;

use crate::auth::OwnerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::upload::status_url;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct VideoListResponse {
    pub videos: Vec<VideoResponse>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateVideoRequest {
    #[validate(length(min = 1, max = 300))]
    pub title: Option<String>,
    /// Present-and-null clears the collection; absent leaves it unchanged.
    #[serde(default, with = "double_option")]
    pub collection_id: Option<Option<Uuid>>,
}

/// Distinguishes an absent JSON field from an explicit null.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<Option<Option<uuid::Uuid>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<uuid::Uuid>::deserialize(deserializer).map(Some)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RetryResponse {
    pub video_id: Uuid,
    pub status: VideoStatus,
    pub status_url: String,
}

/// List the owner's videos, reverse chronological
#[utoipa::path(
    get,
    path = "/api/videos",
    tag = "videos",
    responses((status = 200, description = "Videos", body = VideoListResponse))
)]
#[tracing::instrument(skip(state), fields(owner_id = %owner.owner_id))]
pub async fn list_videos(
    owner: OwnerContext,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let videos = state.videos.list(owner.owner_id).await?;
    Ok(Json(VideoListResponse {
        videos: videos.into_iter().map(VideoResponse::from).collect(),
    }))
}

/// Fetch one video
#[utoipa::path(
    get,
    path = "/api/videos/{id}",
    tag = "videos",
    params(("id" = Uuid, Path, description = "Video id")),
    responses(
        (status = 200, description = "Video", body = VideoResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(owner_id = %owner.owner_id, video_id = %video_id))]
pub async fn get_video(
    owner: OwnerContext,
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let video = state
        .videos
        .get(owner.owner_id, video_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video {} not found", video_id)))?;
    Ok(Json(VideoResponse::from(video)))
}

/// Poll processing status
#[utoipa::path(
    get,
    path = "/api/videos/{id}/status",
    tag = "videos",
    params(("id" = Uuid, Path, description = "Video id")),
    responses(
        (status = 200, description = "Status", body = VideoStatusResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(owner_id = %owner.owner_id, video_id = %video_id))]
pub async fn get_video_status(
    owner: OwnerContext,
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let video = state
        .videos
        .get(owner.owner_id, video_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video {} not found", video_id)))?;
    Ok(Json(VideoStatusResponse::from(&video)))
}

/// Edit limited fields (title, collection)
#[utoipa::path(
    patch,
    path = "/api/videos/{id}",
    tag = "videos",
    params(("id" = Uuid, Path, description = "Video id")),
    request_body = UpdateVideoRequest,
    responses(
        (status = 200, description = "Updated", body = VideoResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(owner_id = %owner.owner_id, video_id = %video_id))]
pub async fn update_video(
    owner: OwnerContext,
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<Uuid>,
    Json(request): Json<UpdateVideoRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate().map_err(AppError::from)?;
    if request.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(HttpAppError(AppError::InvalidInput(
            "Title must not be blank".to_string(),
        )));
    }

    // Collection assignment must reference a collection the owner can see.
    if let Some(Some(collection_id)) = request.collection_id {
        state
            .collections
            .get(owner.owner_id, collection_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Collection {} not found", collection_id))
            })?;
    }

    let video = state
        .videos
        .update_fields(
            owner.owner_id,
            video_id,
            request.title.as_deref().map(str::trim),
            request.collection_id,
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video {} not found", video_id)))?;

    Ok(Json(VideoResponse::from(video)))
}

/// Delete a video, its transcription, and its storage objects
#[utoipa::path(
    delete,
    path = "/api/videos/{id}",
    tag = "videos",
    params(("id" = Uuid, Path, description = "Video id")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(owner_id = %owner.owner_id, video_id = %video_id))]
pub async fn delete_video(
    owner: OwnerContext,
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let video = state
        .videos
        .delete(owner.owner_id, video_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video {} not found", video_id)))?;

    // Object deletes are idempotent; a missing object is success.
    state.storage.delete(&video.storage_key).await?;
    if let Some(ref streamable_key) = video.streamable_key {
        if streamable_key != &video.storage_key {
            state.storage.delete(streamable_key).await?;
        }
    }

    tracing::info!(video_id = %video_id, "Video deleted");
    Ok(Json(serde_json::json!({ "deleted": true, "video_id": video_id })))
}

/// Re-enqueue a failed video
#[utoipa::path(
    post,
    path = "/api/videos/{id}/retry",
    tag = "videos",
    params(("id" = Uuid, Path, description = "Video id")),
    responses(
        (status = 200, description = "Retry enqueued", body = RetryResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "Video is not in a retryable state", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(owner_id = %owner.owner_id, video_id = %video_id))]
pub async fn retry_video(
    owner: OwnerContext,
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let video = state
        .videos
        .get(owner.owner_id, video_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video {} not found", video_id)))?;

    if video.status != VideoStatus::Failed {
        return Err(HttpAppError(AppError::Conflict(format!(
            "Only failed videos can be retried (status: {})",
            video.status
        ))));
    }

    state.dispatcher.enqueue(owner.owner_id, video_id).await?;

    tracing::info!(video_id = %video_id, "Retry enqueued");
    Ok(Json(RetryResponse {
        video_id,
        status: video.status,
        status_url: status_url(video_id),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_title_constraints() {
        let request = UpdateVideoRequest {
            title: Some("New title".to_string()),
            collection_id: None,
        };
        assert!(request.validate().is_ok());

        let request = UpdateVideoRequest {
            title: Some(String::new()),
            collection_id: None,
        };
        assert!(request.validate().is_err());

        let request = UpdateVideoRequest {
            title: Some("x".repeat(301)),
            collection_id: None,
        };
        assert!(request.validate().is_err());

        // Absent title is fine; validation only applies when present.
        let request = UpdateVideoRequest {
            title: None,
            collection_id: Some(None),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_update_request_distinguishes_absent_and_null_collection() {
        let absent: UpdateVideoRequest = serde_json::from_str(r#"{"title": "t"}"#).unwrap();
        assert_eq!(absent.collection_id, None);

        let cleared: UpdateVideoRequest =
            serde_json::from_str(r#"{"collection_id": null}"#).unwrap();
        assert_eq!(cleared.collection_id, Some(None));
    }
}
