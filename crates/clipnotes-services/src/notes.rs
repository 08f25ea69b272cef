//! Structured-notes generation client.
//!
//! One chat-completion request per transcript: the system prompt pins the
//! JSON schema, the user message carries the transcript with inline
//! `[start - end]` markers so the model can attribute timestamps. The
//! response is schema-validated; reasoning tokens are disabled to stabilize
//! cost.

use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use clipnotes_core::models::{StructuredNotes, TranscriptSegment};
use clipnotes_core::NotesSettings;

use crate::retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum NotesError {
    #[error("Notes request failed: {0}")]
    Request(String),

    #[error("Notes service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Notes response invalid: {0}")]
    InvalidResponse(String),
}

impl NotesError {
    fn is_transient(&self) -> bool {
        match self {
            NotesError::Request(_) => true,
            NotesError::Status { status, .. } => {
                *status == 429 || (500..600).contains(status)
            }
            NotesError::InvalidResponse(_) => false,
        }
    }
}

/// Generated notes plus call metadata for persistence.
#[derive(Debug)]
pub struct NotesOutcome {
    pub notes: StructuredNotes,
    pub model_used: String,
    pub duration_ms: i64,
}

const SYSTEM_PROMPT: &str = "\
You are a note-taking assistant. You receive a video transcript where each \
segment is prefixed with its time range in seconds, like [12.0 - 15.5]. \
Respond with a single JSON object and nothing else, using this schema: \
{\"summary\": string, \
\"key_points\": [{\"content\": string, \"timestamp_s\": number|null}], \
\"detailed_notes\": string, \
\"takeaways\": [{\"content\": string, \"timestamp_s\": number|null}], \
\"quotes\": [{\"content\": string, \"timestamp_s\": number|null}], \
\"tags\": [string], \
\"questions\": [string], \
\"chapters\": [{\"title\": string, \"start_s\": number, \"end_s\": number, \"description\": string}], \
\"themes\": [{\"theme\": string, \"frequency\": number, \"key_moments\": [string]}], \
\"sentiment_timeline\": [{\"timestamp_s\": number, \"sentiment\": \"positive\"|\"negative\"|\"neutral\", \"intensity\": number, \"description\": string}], \
\"actionable_insights\": [string]}. \
Chapters must not overlap and must cover the video from 0 to its duration. \
Sentiment intensity is an integer in [-100, 100]. \
Use timestamps from the segment markers; use null when no moment applies.";

/// Renders the transcript with inline time markers before each segment.
pub fn render_timestamped_transcript(segments: &[TranscriptSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        out.push_str(&format!(
            "[{:.1} - {:.1}] {}\n",
            segment.start_s, segment.end_s, segment.text
        ));
    }
    out
}

/// Model responses sometimes wrap JSON in markdown fences; strip them.
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn parse_notes_content(content: &str) -> Result<StructuredNotes, NotesError> {
    let payload = strip_code_fences(content);
    let notes: StructuredNotes = serde_json::from_str(payload)
        .map_err(|e| NotesError::InvalidResponse(format!("not valid notes JSON: {}", e)))?;
    notes
        .validate()
        .map_err(NotesError::InvalidResponse)?;
    Ok(notes)
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: String,
}

pub struct NotesClient {
    http: reqwest::Client,
    settings: NotesSettings,
    retry: RetryPolicy,
}

impl NotesClient {
    pub fn new(settings: NotesSettings, call_timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(call_timeout)
            .build()
            .expect("reqwest client");
        Self {
            http,
            settings,
            retry: RetryPolicy::default(),
        }
    }

    fn build_request_body(&self, transcript: &str) -> serde_json::Value {
        let mut body = json!({
            "model": self.settings.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": transcript},
            ],
            "response_format": {"type": "json_object"},
            "temperature": 0.2,
        });
        if self.settings.disable_reasoning {
            body["reasoning_effort"] = json!("none");
        }
        body
    }

    async fn call_once(&self, transcript: &str) -> Result<StructuredNotes, NotesError> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.settings.api_url))
            .bearer_auth(&self.settings.api_key)
            .json(&self.build_request_body(transcript))
            .send()
            .await
            .map_err(|e| NotesError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| NotesError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(NotesError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion: CompletionResponse = serde_json::from_str(&body)
            .map_err(|e| NotesError::InvalidResponse(format!("bad completion shape: {}", e)))?;
        let content = completion
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| NotesError::InvalidResponse("no choices in response".to_string()))?;

        parse_notes_content(content)
    }

    /// Generate a notes document from a merged transcript.
    #[tracing::instrument(skip(self, transcript_text, segments), fields(model = %self.settings.model))]
    pub async fn generate(
        &self,
        transcript_text: &str,
        segments: &[TranscriptSegment],
    ) -> Result<NotesOutcome, NotesError> {
        let transcript = if segments.is_empty() {
            transcript_text.to_string()
        } else {
            render_timestamped_transcript(segments)
        };

        let start = std::time::Instant::now();
        let notes = self
            .retry
            .run(|| self.call_once(&transcript), NotesError::is_transient)
            .await?;
        let duration_ms = start.elapsed().as_millis() as i64;

        tracing::info!(duration_ms, "Notes generated");

        Ok(NotesOutcome {
            notes,
            model_used: self.settings.model.clone(),
            duration_ms,
        })
    }
}
