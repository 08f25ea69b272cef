//! Shared key generation for storage backends.
//!
//! Key format: `videos/{owner_id}/{video_id}{suffix}`. The owner prefix
//! guarantees keyspace isolation; the suffix distinguishes the original and
//! compressed artifacts.

use uuid::Uuid;

/// Key for the source object of a video.
pub fn source_key(owner_id: Uuid, video_id: Uuid, extension: &str) -> String {
    format!("videos/{}/{}.{}", owner_id, video_id, extension)
}

/// Key for the compressed, fast-start artifact that replaces the source after
/// processing. Always MP4.
pub fn compressed_key(owner_id: Uuid, video_id: Uuid) -> String {
    format!("videos/{}/{}_compressed.mp4", owner_id, video_id)
}

/// Lowercased extension of a filename, if any.
pub fn extension_of(filename: &str) -> Option<String> {
    let ext = filename.rsplit_once('.')?.1;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_key_owner_prefixed() {
        let owner = Uuid::new_v4();
        let video = Uuid::new_v4();
        let key = source_key(owner, video, "mp4");
        assert_eq!(key, format!("videos/{}/{}.mp4", owner, video));
        assert!(key.starts_with(&format!("videos/{}/", owner)));
    }

    #[test]
    fn test_compressed_key_suffix() {
        let owner = Uuid::new_v4();
        let video = Uuid::new_v4();
        let key = compressed_key(owner, video);
        assert!(key.ends_with("_compressed.mp4"));
        assert_ne!(key, source_key(owner, video, "mp4"));
    }

    #[test]
    fn test_keys_stable_across_calls() {
        let owner = Uuid::new_v4();
        let video = Uuid::new_v4();
        assert_eq!(compressed_key(owner, video), compressed_key(owner, video));
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("clip.mp4"), Some("mp4".to_string()));
        assert_eq!(extension_of("CLIP.MOV"), Some("mov".to_string()));
        assert_eq!(extension_of("archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(extension_of("noext"), None);
        assert_eq!(extension_of("trailing."), None);
    }
}
