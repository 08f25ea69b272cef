//! Upload validation: extension allow-list, content type, and size limits.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes exceeds max {max} bytes")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Invalid extension '{extension}', allowed: {allowed:?}")]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Invalid content type '{content_type}', allowed: {allowed:?}")]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Missing file extension (filename: {0})")]
    MissingExtension(String),

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("File is empty")]
    EmptyFile,
}

/// Validate an announced upload before reserving a storage key.
pub fn validate_upload(
    filename: &str,
    file_size: u64,
    content_type: &str,
    max_bytes: u64,
    allowed_extensions: &[String],
    allowed_content_types: &[String],
) -> Result<(), ValidationError> {
    if filename.is_empty() || filename.contains('/') || filename.contains('\\') {
        return Err(ValidationError::InvalidFilename(filename.to_string()));
    }

    if file_size == 0 {
        return Err(ValidationError::EmptyFile);
    }

    if file_size > max_bytes {
        return Err(ValidationError::FileTooLarge {
            size: file_size,
            max: max_bytes,
        });
    }

    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
        .ok_or_else(|| ValidationError::MissingExtension(filename.to_string()))?;

    if !allowed_extensions.iter().any(|e| e == &extension) {
        return Err(ValidationError::InvalidExtension {
            extension,
            allowed: allowed_extensions.to_vec(),
        });
    }

    let content_type = content_type.to_lowercase();
    if !allowed_content_types.iter().any(|c| c == &content_type) {
        return Err(ValidationError::InvalidContentType {
            content_type,
            allowed: allowed_content_types.to_vec(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extensions() -> Vec<String> {
        vec!["mp4", "mov", "avi", "mkv"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn content_types() -> Vec<String> {
        vec!["video/mp4", "video/quicktime"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_accepts_valid_upload() {
        assert!(validate_upload(
            "clip.mp4",
            12 * 1024 * 1024,
            "video/mp4",
            500 * 1024 * 1024,
            &extensions(),
            &content_types(),
        )
        .is_ok());
    }

    #[test]
    fn test_extension_check_is_case_insensitive() {
        assert!(validate_upload(
            "CLIP.MP4",
            1024,
            "video/mp4",
            1 << 30,
            &extensions(),
            &content_types(),
        )
        .is_ok());
    }

    #[test]
    fn test_rejects_oversized_file() {
        let err = validate_upload(
            "clip.mp4",
            600 * 1024 * 1024,
            "video/mp4",
            500 * 1024 * 1024,
            &extensions(),
            &content_types(),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::FileTooLarge { .. }));
    }

    #[test]
    fn test_rejects_disallowed_extension() {
        let err = validate_upload(
            "malware.exe",
            1024,
            "video/mp4",
            1 << 30,
            &extensions(),
            &content_types(),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidExtension { .. }));
    }

    #[test]
    fn test_rejects_wrong_content_type() {
        let err = validate_upload(
            "clip.mp4",
            1024,
            "application/octet-stream",
            1 << 30,
            &extensions(),
            &content_types(),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidContentType { .. }));
    }

    #[test]
    fn test_rejects_missing_extension_and_empty_file() {
        assert!(matches!(
            validate_upload("noext", 1, "video/mp4", 1 << 30, &extensions(), &content_types()),
            Err(ValidationError::MissingExtension(_))
        ));
        assert!(matches!(
            validate_upload("a.mp4", 0, "video/mp4", 1 << 30, &extensions(), &content_types()),
            Err(ValidationError::EmptyFile)
        ));
    }

    #[test]
    fn test_rejects_path_like_filenames() {
        assert!(matches!(
            validate_upload(
                "../../etc/passwd.mp4",
                1,
                "video/mp4",
                1 << 30,
                &extensions(),
                &content_types()
            ),
            Err(ValidationError::InvalidFilename(_))
        ));
    }
}
