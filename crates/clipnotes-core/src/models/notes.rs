//! Structured notes document derived from a transcript.
//!
//! Legacy note documents may carry bare strings where a timestamped item is
//! expected. [`TimestampedItem`] accepts either form on read and always emits
//! the timed form on write.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;

/// A note entry optionally anchored to a moment in the video.
#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
pub struct TimestampedItem {
    pub content: String,
    pub timestamp_s: Option<f64>,
}

impl TimestampedItem {
    pub fn plain(content: impl Into<String>) -> Self {
        TimestampedItem {
            content: content.into(),
            timestamp_s: None,
        }
    }

    pub fn timed(content: impl Into<String>, timestamp_s: f64) -> Self {
        TimestampedItem {
            content: content.into(),
            timestamp_s: Some(timestamp_s),
        }
    }
}

impl<'de> Deserialize<'de> for TimestampedItem {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Plain(String),
            Timed {
                content: String,
                #[serde(default)]
                timestamp_s: Option<f64>,
            },
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Plain(content) => TimestampedItem {
                content,
                timestamp_s: None,
            },
            Repr::Timed {
                content,
                timestamp_s,
            } => TimestampedItem {
                content,
                timestamp_s,
            },
        })
    }
}

/// A navigable chapter; chapters are non-overlapping when sorted and
/// collectively cover the video from 0 to roughly its duration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Chapter {
    pub title: String,
    pub start_s: f64,
    pub end_s: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Theme {
    pub theme: String,
    pub frequency: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_moments: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Display for Sentiment {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Sentiment::Positive => write!(f, "positive"),
            Sentiment::Negative => write!(f, "negative"),
            Sentiment::Neutral => write!(f, "neutral"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct SentimentPoint {
    pub timestamp_s: f64,
    pub sentiment: Sentiment,
    /// Signed intensity in [-100, 100].
    pub intensity: i32,
    pub description: String,
}

/// Schema-validated notes document produced by the notes model.
/// Unknown fields in model output are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct StructuredNotes {
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<TimestampedItem>,
    #[serde(default)]
    pub detailed_notes: String,
    #[serde(default)]
    pub takeaways: Vec<TimestampedItem>,
    #[serde(default)]
    pub quotes: Vec<TimestampedItem>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<String>>,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub themes: Option<Vec<Theme>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_timeline: Option<Vec<SentimentPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actionable_insights: Option<Vec<String>>,
}

impl StructuredNotes {
    /// Structural validation of model output beyond what serde enforces.
    pub fn validate(&self) -> Result<(), String> {
        for chapter in &self.chapters {
            if chapter.start_s >= chapter.end_s {
                return Err(format!(
                    "chapter '{}' has start_s {} >= end_s {}",
                    chapter.title, chapter.start_s, chapter.end_s
                ));
            }
            if chapter.start_s < 0.0 {
                return Err(format!("chapter '{}' has negative start_s", chapter.title));
            }
        }

        let mut sorted: Vec<&Chapter> = self.chapters.iter().collect();
        sorted.sort_by(|a, b| a.start_s.total_cmp(&b.start_s));
        for pair in sorted.windows(2) {
            if pair[0].end_s > pair[1].start_s {
                return Err(format!(
                    "chapters '{}' and '{}' overlap",
                    pair[0].title, pair[1].title
                ));
            }
        }

        if let Some(ref timeline) = self.sentiment_timeline {
            for point in timeline {
                if !(-100..=100).contains(&point.intensity) {
                    return Err(format!(
                        "sentiment intensity {} out of [-100, 100]",
                        point.intensity
                    ));
                }
            }
        }

        if let Some(ref themes) = self.themes {
            for theme in themes {
                if theme.frequency < 1 {
                    return Err(format!("theme '{}' has frequency < 1", theme.theme));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_timestamped_item_accepts_bare_string() {
        let item: TimestampedItem = serde_json::from_value(json!("just a point")).unwrap();
        assert_eq!(item.content, "just a point");
        assert_eq!(item.timestamp_s, None);
    }

    #[test]
    fn test_timestamped_item_accepts_timed_object() {
        let item: TimestampedItem =
            serde_json::from_value(json!({"content": "a point", "timestamp_s": 42.5})).unwrap();
        assert_eq!(item.content, "a point");
        assert_eq!(item.timestamp_s, Some(42.5));
    }

    #[test]
    fn test_timestamped_item_accepts_object_without_timestamp() {
        let item: TimestampedItem = serde_json::from_value(json!({"content": "a point"})).unwrap();
        assert_eq!(item.timestamp_s, None);
    }

    #[test]
    fn test_timestamped_item_always_serializes_timed_form() {
        let json = serde_json::to_value(TimestampedItem::plain("p")).unwrap();
        assert_eq!(json, json!({"content": "p", "timestamp_s": null}));

        let json = serde_json::to_value(TimestampedItem::timed("p", 3.0)).unwrap();
        assert_eq!(json, json!({"content": "p", "timestamp_s": 3.0}));
    }

    fn minimal_notes() -> serde_json::Value {
        json!({
            "summary": "A talk about birds.",
            "key_points": ["birds fly", {"content": "some swim", "timestamp_s": 12.0}],
            "detailed_notes": "Lots of detail.",
            "takeaways": ["watch birds"],
            "quotes": [{"content": "birds are real", "timestamp_s": 80.2}],
            "tags": ["nature"],
            "chapters": [
                {"title": "Intro", "start_s": 0.0, "end_s": 60.0},
                {"title": "Body", "start_s": 60.0, "end_s": 300.0, "description": "the middle"}
            ]
        })
    }

    #[test]
    fn test_notes_decode_with_mixed_legacy_items() {
        let notes: StructuredNotes = serde_json::from_value(minimal_notes()).unwrap();
        assert_eq!(notes.key_points.len(), 2);
        assert_eq!(notes.key_points[0].timestamp_s, None);
        assert_eq!(notes.key_points[1].timestamp_s, Some(12.0));
        assert!(notes.themes.is_none());
        assert!(notes.validate().is_ok());
    }

    #[test]
    fn test_notes_ignores_unknown_fields() {
        let mut doc = minimal_notes();
        doc["mystery_field"] = json!({"x": 1});
        let notes: StructuredNotes = serde_json::from_value(doc).unwrap();
        assert_eq!(notes.summary, "A talk about birds.");
    }

    #[test]
    fn test_validate_rejects_inverted_chapter() {
        let mut doc = minimal_notes();
        doc["chapters"] = json!([{"title": "Bad", "start_s": 10.0, "end_s": 5.0}]);
        let notes: StructuredNotes = serde_json::from_value(doc).unwrap();
        assert!(notes.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_overlapping_chapters() {
        let mut doc = minimal_notes();
        doc["chapters"] = json!([
            {"title": "A", "start_s": 0.0, "end_s": 100.0},
            {"title": "B", "start_s": 50.0, "end_s": 150.0}
        ]);
        let notes: StructuredNotes = serde_json::from_value(doc).unwrap();
        assert!(notes.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_intensity() {
        let mut doc = minimal_notes();
        doc["sentiment_timeline"] = json!([
            {"timestamp_s": 5.0, "sentiment": "positive", "intensity": 130, "description": "too much"}
        ]);
        let notes: StructuredNotes = serde_json::from_value(doc).unwrap();
        assert!(notes.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_unsorted_but_disjoint_chapters() {
        let mut doc = minimal_notes();
        doc["chapters"] = json!([
            {"title": "B", "start_s": 60.0, "end_s": 120.0},
            {"title": "A", "start_s": 0.0, "end_s": 60.0}
        ]);
        let notes: StructuredNotes = serde_json::from_value(doc).unwrap();
        assert!(notes.validate().is_ok());
    }

    #[test]
    fn test_sentiment_display() {
        assert_eq!(Sentiment::Positive.to_string(), "positive");
        assert_eq!(Sentiment::Neutral.to_string(), "neutral");
        assert_eq!(Sentiment::Negative.to_string(), "negative");
    }
}
