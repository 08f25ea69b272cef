use thiserror::Error;

/// Media processing failures. Non-retryable within a job: a file that does not
/// decode will not decode on the next attempt either.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Probe failed: {0}")]
    ProbeFailed(String),

    #[error("Transcode failed: {0}")]
    TranscodeFailed(String),

    #[error("Audio extraction failed: {0}")]
    AudioExtractionFailed(String),

    #[error("Audio chunking failed: {0}")]
    ChunkingFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type MediaResult<T> = Result<T, MediaError>;
