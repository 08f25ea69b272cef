//! OpenAPI document.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "clipnotes API",
        description = "Video ingestion, transcription and structured-notes pipeline"
    ),
    paths(
        crate::handlers::upload::request_presigned_upload,
        crate::handlers::upload::complete_upload,
        crate::handlers::ingest_url::ingest_url,
        crate::handlers::videos::list_videos,
        crate::handlers::videos::get_video,
        crate::handlers::videos::get_video_status,
        crate::handlers::videos::update_video,
        crate::handlers::videos::delete_video,
        crate::handlers::videos::retry_video,
        crate::handlers::transcription::get_transcription,
        crate::handlers::stream::get_stream,
        crate::handlers::collections::list_collections,
        crate::handlers::collections::create_collection,
    ),
    components(schemas(
        crate::handlers::upload::PresignedUploadRequest,
        crate::handlers::upload::PresignedUploadResponse,
        crate::handlers::upload::CompleteUploadResponse,
        crate::handlers::ingest_url::UrlIngestRequest,
        crate::handlers::ingest_url::UrlIngestResponse,
        crate::handlers::videos::VideoListResponse,
        crate::handlers::videos::UpdateVideoRequest,
        crate::handlers::videos::RetryResponse,
        crate::handlers::stream::StreamResponse,
        crate::handlers::stream::StreamState,
        crate::handlers::collections::CreateCollectionRequest,
        crate::handlers::collections::CollectionListResponse,
        crate::error::ErrorResponse,
        clipnotes_core::models::VideoResponse,
        clipnotes_core::models::VideoStatusResponse,
        clipnotes_core::models::VideoStatus,
        clipnotes_core::models::StreamableStatus,
        clipnotes_core::models::TranscriptionResponse,
        clipnotes_core::models::TranscriptSegment,
        clipnotes_core::models::StructuredNotes,
        clipnotes_core::models::TimestampedItem,
        clipnotes_core::models::Chapter,
        clipnotes_core::models::Theme,
        clipnotes_core::models::Sentiment,
        clipnotes_core::models::SentimentPoint,
        clipnotes_core::models::CollectionResponse,
    ))
)]
pub struct ApiDoc;
