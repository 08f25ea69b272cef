//! Transcript + notes retrieval.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use clipnotes_core::models::{TranscriptionResponse, VideoStatus};
use clipnotes_core::AppError;

use crate::auth::OwnerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

/// Fetch the transcript, segments and notes for a completed video
#[utoipa::path(
    get,
    path = "/api/videos/{id}/transcription",
    tag = "videos",
    params(("id" = Uuid, Path, description = "Video id")),
    responses(
        (status = 200, description = "Transcription", body = TranscriptionResponse),
        (status = 404, description = "Not found or not completed", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(owner_id = %owner.owner_id, video_id = %video_id))]
pub async fn get_transcription(
    owner: OwnerContext,
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let video = state
        .videos
        .get(owner.owner_id, video_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video {} not found", video_id)))?;

    if video.status != VideoStatus::Completed {
        return Err(HttpAppError(AppError::NotFound(format!(
            "Transcription not available (status: {})",
            video.status
        ))));
    }

    let transcription = state
        .transcriptions
        .get_by_video(video_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Transcription for video {} not found", video_id))
        })?;

    Ok(Json(TranscriptionResponse::from(transcription)))
}
