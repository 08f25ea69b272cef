use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle state of a video. Transitions are monotone along
/// `Uploading → Uploaded → Processing → {Completed, Failed}`; a retry may
/// re-enter `Processing` from `Failed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Uploading,
    Uploaded,
    Processing,
    Completed,
    Failed,
}

impl VideoStatus {
    /// Whether a transition from `self` to `next` is permitted.
    pub fn can_transition_to(self, next: VideoStatus) -> bool {
        use VideoStatus::*;
        matches!(
            (self, next),
            (Uploading, Uploaded)
                | (Uploading, Failed)
                | (Uploaded, Processing)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Failed, Processing)
        )
    }
}

impl Display for VideoStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            VideoStatus::Uploading => write!(f, "uploading"),
            VideoStatus::Uploaded => write!(f, "uploaded"),
            VideoStatus::Processing => write!(f, "processing"),
            VideoStatus::Completed => write!(f, "completed"),
            VideoStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for VideoStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploading" => Ok(VideoStatus::Uploading),
            "uploaded" => Ok(VideoStatus::Uploaded),
            "processing" => Ok(VideoStatus::Processing),
            "completed" => Ok(VideoStatus::Completed),
            "failed" => Ok(VideoStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid video status: {}", s)),
        }
    }
}

/// Where the video came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "source_type", rename_all = "lowercase")]
pub enum VideoSource {
    Upload {
        filename: String,
        content_type: String,
    },
    Url {
        origin_url: String,
    },
}

impl VideoSource {
    pub fn type_str(&self) -> &'static str {
        match self {
            VideoSource::Upload { .. } => "upload",
            VideoSource::Url { .. } => "url",
        }
    }
}

/// State of the progressive-playback artifact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StreamableStatus {
    None,
    Ready,
    Failed,
}

impl Display for StreamableStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StreamableStatus::None => write!(f, "none"),
            StreamableStatus::Ready => write!(f, "ready"),
            StreamableStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for StreamableStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(StreamableStatus::None),
            "ready" => Ok(StreamableStatus::Ready),
            "failed" => Ok(StreamableStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid streamable status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub source: VideoSource,
    pub storage_key: String,
    pub file_size: i64,
    pub duration_seconds: Option<f64>,
    pub status: VideoStatus,
    pub error_message: Option<String>,
    pub title: String,
    pub collection_id: Option<Uuid>,
    pub streamable_status: StreamableStatus,
    pub streamable_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Video {
    /// The key clients should play from: the streamable artifact when ready,
    /// else the source object.
    pub fn playback_key(&self) -> &str {
        match (&self.streamable_status, &self.streamable_key) {
            (StreamableStatus::Ready, Some(key)) => key,
            _ => &self.storage_key,
        }
    }
}

/// Summary row for list responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct VideoResponse {
    pub id: Uuid,
    pub title: String,
    pub source_type: String,
    pub status: VideoStatus,
    pub file_size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<Video> for VideoResponse {
    fn from(video: Video) -> Self {
        VideoResponse {
            id: video.id,
            title: video.title,
            source_type: video.source.type_str().to_string(),
            status: video.status,
            file_size: video.file_size,
            duration_seconds: video.duration_seconds,
            created_at: video.created_at,
            uploaded_at: video.uploaded_at,
            processed_at: video.processed_at,
            collection_id: video.collection_id,
            error_message: video.error_message,
        }
    }
}

/// Poll-friendly status payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct VideoStatusResponse {
    pub status: VideoStatus,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<&Video> for VideoStatusResponse {
    fn from(video: &Video) -> Self {
        VideoStatusResponse {
            status: video.status,
            title: video.title.clone(),
            uploaded_at: video.uploaded_at,
            duration_seconds: video.duration_seconds,
            error_message: video.error_message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_roundtrip() {
        for status in [
            VideoStatus::Uploading,
            VideoStatus::Uploaded,
            VideoStatus::Processing,
            VideoStatus::Completed,
            VideoStatus::Failed,
        ] {
            assert_eq!(status.to_string().parse::<VideoStatus>().unwrap(), status);
        }
        assert!("bogus".parse::<VideoStatus>().is_err());
    }

    #[test]
    fn test_status_transitions_forward_path() {
        assert!(VideoStatus::Uploading.can_transition_to(VideoStatus::Uploaded));
        assert!(VideoStatus::Uploaded.can_transition_to(VideoStatus::Processing));
        assert!(VideoStatus::Processing.can_transition_to(VideoStatus::Completed));
        assert!(VideoStatus::Processing.can_transition_to(VideoStatus::Failed));
    }

    #[test]
    fn test_status_transitions_retry_from_failed() {
        assert!(VideoStatus::Failed.can_transition_to(VideoStatus::Processing));
    }

    #[test]
    fn test_status_transitions_forbid_skips() {
        // Jumping over Processing is forbidden, except Uploading -> Failed
        // (orphaned upload verification).
        assert!(!VideoStatus::Uploading.can_transition_to(VideoStatus::Processing));
        assert!(!VideoStatus::Uploaded.can_transition_to(VideoStatus::Completed));
        assert!(!VideoStatus::Uploaded.can_transition_to(VideoStatus::Failed));
        assert!(!VideoStatus::Completed.can_transition_to(VideoStatus::Processing));
        assert!(!VideoStatus::Completed.can_transition_to(VideoStatus::Failed));
        assert!(VideoStatus::Uploading.can_transition_to(VideoStatus::Failed));
    }

    #[test]
    fn test_source_type_str() {
        let upload = VideoSource::Upload {
            filename: "clip.mp4".to_string(),
            content_type: "video/mp4".to_string(),
        };
        assert_eq!(upload.type_str(), "upload");

        let url = VideoSource::Url {
            origin_url: "https://www.youtube.com/watch?v=abc".to_string(),
        };
        assert_eq!(url.type_str(), "url");
    }

    fn sample_video(streamable: StreamableStatus, streamable_key: Option<&str>) -> Video {
        Video {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            source: VideoSource::Upload {
                filename: "clip.mp4".to_string(),
                content_type: "video/mp4".to_string(),
            },
            storage_key: "videos/o/v.mp4".to_string(),
            file_size: 1024,
            duration_seconds: Some(12.0),
            status: VideoStatus::Completed,
            error_message: None,
            title: "clip.mp4".to_string(),
            collection_id: None,
            streamable_status: streamable,
            streamable_key: streamable_key.map(String::from),
            created_at: Utc::now(),
            uploaded_at: Some(Utc::now()),
            processed_at: Some(Utc::now()),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_playback_key_prefers_streamable() {
        let video = sample_video(StreamableStatus::Ready, Some("videos/o/v_compressed.mp4"));
        assert_eq!(video.playback_key(), "videos/o/v_compressed.mp4");
    }

    #[test]
    fn test_playback_key_falls_back_to_source() {
        let video = sample_video(StreamableStatus::None, None);
        assert_eq!(video.playback_key(), "videos/o/v.mp4");
        // Ready without a key should not panic, just fall back.
        let video = sample_video(StreamableStatus::Ready, None);
        assert_eq!(video.playback_key(), "videos/o/v.mp4");
    }
}
