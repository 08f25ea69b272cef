//! URL ingest endpoint.
//!
//! Accepts a public video URL, creates the record in `Uploaded`, and enqueues
//! processing. The actual fetch into the reserved storage key is performed by
//! an external fetcher service; the job's retry backoff covers the window
//! until the object is present.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use clipnotes_core::models::VideoStatus;
use clipnotes_core::AppError;
use clipnotes_storage::keys;

use crate::auth::OwnerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::upload::status_url;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UrlIngestRequest {
    pub url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UrlIngestResponse {
    pub video_id: Uuid,
    pub status: VideoStatus,
    pub status_url: String,
}

/// Accepts http(s) URLs with a host. The YouTube watch id, when present, is
/// used for a friendlier default title.
pub fn validate_video_url(url: &str) -> Result<(), String> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| "URL must use http or https".to_string())?;

    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() || !host.contains('.') {
        return Err("URL has no valid host".to_string());
    }
    Ok(())
}

/// Extracts a YouTube video id from watch/short/embed URL shapes.
pub fn youtube_video_id(url: &str) -> Option<String> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let (host, path) = rest.split_once('/')?;
    let host = host.strip_prefix("www.").unwrap_or(host);

    let id = match host {
        "youtu.be" => path.split(['?', '#']).next()?.to_string(),
        "youtube.com" | "m.youtube.com" => {
            if let Some(query) = path.strip_prefix("watch?") {
                query
                    .split('&')
                    .find_map(|pair| pair.strip_prefix("v="))?
                    .to_string()
            } else if let Some(id) = path.strip_prefix("embed/").or_else(|| path.strip_prefix("shorts/")) {
                id.split(['?', '#']).next()?.to_string()
            } else {
                return None;
            }
        }
        _ => return None,
    };

    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

fn default_title(url: &str) -> String {
    match youtube_video_id(url) {
        Some(id) => format!("YouTube video {}", id),
        None => url
            .split(['?', '#'])
            .next()
            .unwrap_or(url)
            .rsplit('/')
            .find(|part| !part.is_empty())
            .unwrap_or("Video from URL")
            .to_string(),
    }
}

/// Ingest a public video URL
#[utoipa::path(
    post,
    path = "/api/videos/youtube",
    tag = "videos",
    request_body = UrlIngestRequest,
    responses(
        (status = 201, description = "URL accepted, processing enqueued", body = UrlIngestResponse),
        (status = 400, description = "Invalid URL", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(owner_id = %owner.owner_id))]
pub async fn ingest_url(
    owner: OwnerContext,
    State(state): State<Arc<AppState>>,
    Json(request): Json<UrlIngestRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    validate_video_url(&request.url).map_err(AppError::InvalidInput)?;

    let video_id = Uuid::new_v4();
    let object_key = keys::source_key(owner.owner_id, video_id, "mp4");
    let title = default_title(&request.url);

    let video = state
        .videos
        .create_from_url(owner.owner_id, video_id, &request.url, &object_key, &title)
        .await?;

    state.dispatcher.enqueue(owner.owner_id, video_id).await?;

    tracing::info!(video_id = %video_id, url = %request.url, "URL ingest accepted");

    Ok((
        StatusCode::CREATED,
        Json(UrlIngestResponse {
            video_id,
            status: video.status,
            status_url: status_url(video_id),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_video_url_accepts_https() {
        assert!(validate_video_url("https://www.youtube.com/watch?v=abc123").is_ok());
        assert!(validate_video_url("http://example.com/video.mp4").is_ok());
    }

    #[test]
    fn test_validate_video_url_rejects_other_schemes() {
        assert!(validate_video_url("ftp://example.com/video.mp4").is_err());
        assert!(validate_video_url("file:///etc/passwd").is_err());
        assert!(validate_video_url("youtube.com/watch?v=abc").is_err());
    }

    #[test]
    fn test_validate_video_url_rejects_missing_host() {
        assert!(validate_video_url("https:///path").is_err());
        assert!(validate_video_url("https://localhost/x").is_err());
    }

    #[test]
    fn test_youtube_video_id_watch() {
        assert_eq!(
            youtube_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            youtube_video_id("https://youtube.com/watch?list=PL1&v=abc123"),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn test_youtube_video_id_short_and_embed() {
        assert_eq!(
            youtube_video_id("https://youtu.be/dQw4w9WgXcQ?t=10"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            youtube_video_id("https://www.youtube.com/embed/xyz789"),
            Some("xyz789".to_string())
        );
        assert_eq!(
            youtube_video_id("https://www.youtube.com/shorts/short01"),
            Some("short01".to_string())
        );
    }

    #[test]
    fn test_youtube_video_id_none_for_other_hosts() {
        assert_eq!(youtube_video_id("https://vimeo.com/12345"), None);
        assert_eq!(youtube_video_id("https://example.com/watch?v=abc"), None);
    }

    #[test]
    fn test_default_title() {
        assert_eq!(
            default_title("https://www.youtube.com/watch?v=abc123"),
            "YouTube video abc123"
        );
        assert_eq!(
            default_title("https://example.com/talks/keynote.mp4"),
            "keynote.mp4"
        );
    }
}
