//! Error types module
//!
//! This module provides the core error types used throughout the application.
//! All errors are unified under the `AppError` enum which can represent
//! database, storage, media, and external-service errors.

use std::io;

use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented.
/// This trait allows errors to self-describe their HTTP response characteristics.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "STORAGE_UNAVAILABLE")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Speech service error: {0}")]
    Speech(String),

    #[error("Notes generation error: {0}")]
    Notes(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::StorageUnavailable(_) => "StorageUnavailable",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::Conflict(_) => "Conflict",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Forbidden(_) => "Forbidden",
            AppError::Media(_) => "Media",
            AppError::Speech(_) => "Speech",
            AppError::Notes(_) => "Notes",
            AppError::TranscriptionFailed(_) => "TranscriptionFailed",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        match self {
            AppError::Database(_) => 500,
            AppError::StorageUnavailable(_) => 502,
            AppError::InvalidInput(_) => 400,
            AppError::NotFound(_) => 404,
            AppError::Conflict(_) => 409,
            AppError::PayloadTooLarge(_) => 413,
            AppError::Unauthorized(_) => 401,
            AppError::Forbidden(_) => 403,
            AppError::Media(_) => 422,
            AppError::Speech(_) => 502,
            AppError::Notes(_) => 502,
            AppError::TranscriptionFailed(_) => 502,
            AppError::Internal(_) => 500,
            AppError::InternalWithSource { .. } => 500,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::Media(_) => "MEDIA_ERROR",
            AppError::Speech(_) => "SPEECH_ERROR",
            AppError::Notes(_) => "NOTES_ERROR",
            AppError::TranscriptionFailed(_) => "TRANSCRIPTION_FAILED",
            AppError::Internal(_) => "INTERNAL_ERROR",
            AppError::InternalWithSource { .. } => "INTERNAL_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            AppError::Database(_) => true,
            AppError::StorageUnavailable(_) => true,
            AppError::InvalidInput(_) => false,
            AppError::NotFound(_) => false,
            AppError::Conflict(_) => false,
            AppError::PayloadTooLarge(_) => false,
            AppError::Unauthorized(_) => false,
            AppError::Forbidden(_) => false,
            AppError::Media(_) => false,
            AppError::Speech(_) => true,
            AppError::Notes(_) => true,
            AppError::TranscriptionFailed(_) => true,
            AppError::Internal(_) => true,
            AppError::InternalWithSource { .. } => true,
        }
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::StorageUnavailable(_) => "Storage is temporarily unavailable".to_string(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Conflict(ref msg) => msg.clone(),
            AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::Forbidden(ref msg) => msg.clone(),
            AppError::Media(ref msg) => msg.clone(),
            AppError::Speech(_) => "Transcription service error".to_string(),
            AppError::Notes(_) => "Notes generation error".to_string(),
            AppError::TranscriptionFailed(ref msg) => msg.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }

    fn is_sensitive(&self) -> bool {
        match self {
            AppError::Database(_) => true,
            AppError::StorageUnavailable(_) => true,
            AppError::InvalidInput(_) => false,
            AppError::NotFound(_) => false,
            AppError::Conflict(_) => false,
            AppError::PayloadTooLarge(_) => false,
            AppError::Unauthorized(_) => false,
            AppError::Forbidden(_) => false,
            AppError::Media(_) => false,
            AppError::Speech(_) => true,
            AppError::Notes(_) => true,
            AppError::TranscriptionFailed(_) => false,
            AppError::Internal(_) => true,
            AppError::InternalWithSource { .. } => true,
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            AppError::Database(_) => LogLevel::Error,
            AppError::StorageUnavailable(_) => LogLevel::Error,
            AppError::InvalidInput(_) => LogLevel::Debug,
            AppError::NotFound(_) => LogLevel::Debug,
            AppError::Conflict(_) => LogLevel::Debug,
            AppError::PayloadTooLarge(_) => LogLevel::Debug,
            AppError::Unauthorized(_) => LogLevel::Debug,
            AppError::Forbidden(_) => LogLevel::Debug,
            AppError::Media(_) => LogLevel::Warn,
            AppError::Speech(_) => LogLevel::Error,
            AppError::Notes(_) => LogLevel::Warn,
            AppError::TranscriptionFailed(_) => LogLevel::Error,
            AppError::Internal(_) => LogLevel::Error,
            AppError::InternalWithSource { .. } => LogLevel::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_not_found() {
        let err = AppError::NotFound("Video not found".to_string());
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "Video not found");
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_conflict() {
        let err = AppError::Conflict("Upload already completed".to_string());
        assert_eq!(err.http_status_code(), 409);
        assert_eq!(err.error_code(), "CONFLICT");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_error_metadata_storage_unavailable() {
        let err = AppError::StorageUnavailable("endpoint unreachable".to_string());
        assert_eq!(err.http_status_code(), 502);
        assert_eq!(err.error_code(), "STORAGE_UNAVAILABLE");
        assert!(err.is_recoverable());
        assert!(err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_notes_error_is_recoverable_and_hidden() {
        let err = AppError::Notes("schema mismatch".to_string());
        assert!(err.is_recoverable());
        assert!(err.is_sensitive());
        assert_eq!(err.client_message(), "Notes generation error");
    }

    #[test]
    fn test_validation_errors_map_to_invalid_input() {
        let mut errors = validator::ValidationErrors::new();
        errors.add("title", validator::ValidationError::new("length"));
        let err = AppError::from(errors);
        assert_eq!(err.http_status_code(), 400);
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_detailed_message_includes_chain() {
        let source = anyhow::anyhow!("connection refused").context("presign failed");
        let err = AppError::InternalWithSource {
            message: "presign failed".to_string(),
            source,
        };
        let details = err.detailed_message();
        assert!(details.contains("Caused by"));
    }
}
