use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::notes::StructuredNotes;

/// A short span of transcribed speech with absolute timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct TranscriptSegment {
    pub start_s: f64,
    pub end_s: f64,
    pub text: String,
}

impl TranscriptSegment {
    /// Returns a copy shifted by `offset_s` (used when merging chunked audio).
    pub fn shifted(&self, offset_s: f64) -> TranscriptSegment {
        TranscriptSegment {
            start_s: self.start_s + offset_s,
            end_s: self.end_s + offset_s,
            text: self.text.clone(),
        }
    }
}

/// Checks the segment ordering invariant: every segment has `start_s <= end_s`
/// and start times are non-decreasing across the list.
pub fn segments_are_monotonic(segments: &[TranscriptSegment]) -> bool {
    segments.windows(2).all(|w| w[0].start_s <= w[1].start_s)
        && segments.iter().all(|s| s.start_s <= s.end_s)
}

/// One-to-one with a completed video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcription {
    pub id: Uuid,
    pub video_id: Uuid,
    pub transcript_text: String,
    pub transcript_segments: Vec<TranscriptSegment>,
    pub model_used: String,
    pub processing_duration_ms: i64,
    pub audio_size_bytes: i64,
    pub notes: Option<StructuredNotes>,
    pub notes_model_used: Option<String>,
    pub notes_duration_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Payload for `GET /videos/{id}/transcription`.
#[derive(Debug, Serialize, ToSchema)]
pub struct TranscriptionResponse {
    pub video_id: Uuid,
    pub transcript_text: String,
    pub transcript_segments: Vec<TranscriptSegment>,
    pub model_used: String,
    pub processing_duration_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<StructuredNotes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes_model_used: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Transcription> for TranscriptionResponse {
    fn from(t: Transcription) -> Self {
        TranscriptionResponse {
            video_id: t.video_id,
            transcript_text: t.transcript_text,
            transcript_segments: t.transcript_segments,
            model_used: t.model_used,
            processing_duration_ms: t.processing_duration_ms,
            notes: t.notes,
            notes_model_used: t.notes_model_used,
            created_at: t.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f64, end: f64) -> TranscriptSegment {
        TranscriptSegment {
            start_s: start,
            end_s: end,
            text: "hello".to_string(),
        }
    }

    #[test]
    fn test_segment_shift() {
        let shifted = seg(1.0, 2.5).shifted(10.0);
        assert_eq!(shifted.start_s, 11.0);
        assert_eq!(shifted.end_s, 12.5);
        assert_eq!(shifted.text, "hello");
    }

    #[test]
    fn test_monotonic_accepts_ordered() {
        let segments = vec![seg(0.0, 1.0), seg(1.0, 2.0), seg(2.0, 3.5)];
        assert!(segments_are_monotonic(&segments));
    }

    #[test]
    fn test_monotonic_accepts_equal_starts() {
        let segments = vec![seg(0.0, 1.0), seg(0.0, 0.5)];
        assert!(segments_are_monotonic(&segments));
    }

    #[test]
    fn test_monotonic_rejects_decreasing_starts() {
        let segments = vec![seg(2.0, 3.0), seg(1.0, 2.0)];
        assert!(!segments_are_monotonic(&segments));
    }

    #[test]
    fn test_monotonic_rejects_inverted_segment() {
        let segments = vec![seg(2.0, 1.0)];
        assert!(!segments_are_monotonic(&segments));
    }

    #[test]
    fn test_monotonic_accepts_empty() {
        assert!(segments_are_monotonic(&[]));
    }

    #[test]
    fn test_segment_serde_shape() {
        let json = serde_json::to_value(seg(0.5, 1.5)).unwrap();
        assert_eq!(json["start_s"], 0.5);
        assert_eq!(json["end_s"], 1.5);
        assert_eq!(json["text"], "hello");
    }
}
