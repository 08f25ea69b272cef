//! Playback descriptor endpoint.
//!
//! The compressed fast-start artifact written during processing is the
//! streamable variant; this endpoint reports `generating` until processing
//! finishes and then hands out a presigned GET.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use clipnotes_core::models::{Video, VideoSource, VideoStatus};
use clipnotes_core::AppError;

use crate::auth::OwnerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::ingest_url::youtube_video_id;
use crate::state::AppState;

const GENERATING_RETRY_AFTER_S: u32 = 10;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    Ready,
    Generating,
    Failed,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StreamResponse {
    pub status: StreamState,
    pub source_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playback_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_video_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u32>,
}

/// Pure descriptor state from the video record; the presigned URL is filled
/// in afterwards for the ready case.
pub fn stream_state(video: &Video) -> (StreamState, Option<u32>) {
    match video.status {
        VideoStatus::Completed => (StreamState::Ready, None),
        VideoStatus::Failed => (StreamState::Failed, None),
        VideoStatus::Uploading | VideoStatus::Uploaded | VideoStatus::Processing => {
            (StreamState::Generating, Some(GENERATING_RETRY_AFTER_S))
        }
    }
}

/// Fetch the playback descriptor
#[utoipa::path(
    get,
    path = "/api/videos/{id}/stream",
    tag = "videos",
    params(("id" = Uuid, Path, description = "Video id")),
    responses(
        (status = 200, description = "Playback descriptor", body = StreamResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(owner_id = %owner.owner_id, video_id = %video_id))]
pub async fn get_stream(
    owner: OwnerContext,
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let video = state
        .videos
        .get(owner.owner_id, video_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video {} not found", video_id)))?;

    let (status, retry_after) = stream_state(&video);

    let origin_video_id = match video.source {
        VideoSource::Url { ref origin_url } => youtube_video_id(origin_url),
        VideoSource::Upload { .. } => None,
    };

    let playback_url = if status == StreamState::Ready {
        Some(
            state
                .storage
                .presigned_get_url(video.playback_key(), state.presigned_ttl())
                .await?,
        )
    } else {
        None
    };

    Ok(Json(StreamResponse {
        status,
        source_type: video.source.type_str().to_string(),
        playback_url,
        origin_video_id,
        retry_after,
    }))
}
