//! Speech-to-text client.
//!
//! Single-chunk transcription against an OpenAI-compatible
//! `/audio/transcriptions` endpoint with verbose segment timing. Transient
//! failures are retried with backoff; when the primary model's budget is
//! exhausted the client falls back once to the secondary model.

use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use clipnotes_core::models::TranscriptSegment;
use clipnotes_core::SpeechSettings;

use crate::retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum SpeechError {
    /// Timeouts, 429, 5xx. Worth retrying.
    #[error("Transient speech service error: {0}")]
    Transient(String),

    /// Bad request, unsupported media. Retrying will not help.
    #[error("Speech service rejected request: {0}")]
    Fatal(String),
}

impl SpeechError {
    pub fn is_transient(&self) -> bool {
        matches!(self, SpeechError::Transient(_))
    }
}

/// Classify an HTTP status from the speech service.
pub fn transient_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Transcript of one audio chunk, segment times relative to the chunk start.
#[derive(Debug, Clone)]
pub struct ChunkTranscript {
    pub text: String,
    pub segments: Vec<TranscriptSegment>,
    pub model_used: String,
    pub used_fallback: bool,
}

#[derive(Debug, Deserialize)]
struct VerboseTranscriptionResponse {
    text: String,
    #[serde(default)]
    segments: Vec<VerboseSegment>,
    #[allow(dead_code)]
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct VerboseSegment {
    start: f64,
    end: f64,
    text: String,
}

fn parse_response(body: &str) -> Result<(String, Vec<TranscriptSegment>), SpeechError> {
    let response: VerboseTranscriptionResponse = serde_json::from_str(body)
        .map_err(|e| SpeechError::Fatal(format!("Unparseable transcription response: {}", e)))?;

    let segments = response
        .segments
        .into_iter()
        .map(|s| TranscriptSegment {
            start_s: s.start,
            end_s: s.end,
            text: s.text.trim().to_string(),
        })
        .collect();

    Ok((response.text, segments))
}

/// Seam for the transcription engine; mocked in tests.
#[async_trait]
pub trait Transcribe: Send + Sync {
    async fn transcribe(&self, chunk_path: &Path) -> Result<ChunkTranscript, SpeechError>;
}

pub struct SpeechClient {
    http: reqwest::Client,
    settings: SpeechSettings,
    retry: RetryPolicy,
}

impl SpeechClient {
    pub fn new(settings: SpeechSettings, call_timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(call_timeout)
            .build()
            .expect("reqwest client");
        let retry = RetryPolicy::with_max_attempts(settings.max_retries.max(1));
        Self {
            http,
            settings,
            retry,
        }
    }

    async fn call_model(&self, model: &str, chunk_path: &Path) -> Result<ChunkTranscript, SpeechError> {
        let bytes = tokio::fs::read(chunk_path)
            .await
            .map_err(|e| SpeechError::Fatal(format!("Failed to read audio chunk: {}", e)))?;

        let filename = chunk_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let file_part = multipart::Part::bytes(bytes)
            .file_name(filename)
            .mime_str("audio/mpeg")
            .map_err(|e| SpeechError::Fatal(format!("Invalid mime type: {}", e)))?;

        let mut form = multipart::Form::new()
            .part("file", file_part)
            .text("model", model.to_string())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment");

        if let Some(ref language) = self.settings.language {
            form = form.text("language", language.clone());
        }

        let response = self
            .http
            .post(format!("{}/audio/transcriptions", self.settings.api_url))
            .bearer_auth(&self.settings.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SpeechError::Transient(format!("Speech request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SpeechError::Transient(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            let message = format!("Speech service returned {}: {}", status, body);
            return if transient_status(status.as_u16()) {
                Err(SpeechError::Transient(message))
            } else {
                Err(SpeechError::Fatal(message))
            };
        }

        let (text, segments) = parse_response(&body)?;
        Ok(ChunkTranscript {
            text,
            segments,
            model_used: model.to_string(),
            used_fallback: false,
        })
    }

    async fn call_with_retries(
        &self,
        model: &str,
        chunk_path: &Path,
    ) -> Result<ChunkTranscript, SpeechError> {
        self.retry
            .run(
                || self.call_model(model, chunk_path),
                SpeechError::is_transient,
            )
            .await
    }
}

#[async_trait]
impl Transcribe for SpeechClient {
    async fn transcribe(&self, chunk_path: &Path) -> Result<ChunkTranscript, SpeechError> {
        match self.call_with_retries(&self.settings.primary_model, chunk_path).await {
            Ok(transcript) => Ok(transcript),
            // Fatal errors surface immediately; no fallback will change them.
            Err(err @ SpeechError::Fatal(_)) => Err(err),
            Err(primary_err) => {
                tracing::warn!(
                    error = %primary_err,
                    primary = %self.settings.primary_model,
                    fallback = %self.settings.fallback_model,
                    "Primary speech model exhausted retries, trying fallback"
                );
                let mut transcript = self
                    .call_with_retries(&self.settings.fallback_model, chunk_path)
                    .await?;
                transcript.used_fallback = true;
                Ok(transcript)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_status_classification() {
        assert!(transient_status(429));
        assert!(transient_status(500));
        assert!(transient_status(503));
        assert!(!transient_status(400));
        assert!(!transient_status(404));
        assert!(!transient_status(422));
        assert!(!transient_status(200));
    }

    #[test]
    fn test_parse_verbose_response() {
        let body = r#"{
            "text": "hello world again",
            "segments": [
                {"id": 0, "start": 0.0, "end": 1.2, "text": " hello world"},
                {"id": 1, "start": 1.2, "end": 2.4, "text": " again"}
            ],
            "duration": 2.4,
            "language": "en"
        }"#;
        let (text, segments) = parse_response(body).unwrap();
        assert_eq!(text, "hello world again");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start_s, 0.0);
        assert_eq!(segments[0].end_s, 1.2);
        assert_eq!(segments[0].text, "hello world");
        assert_eq!(segments[1].text, "again");
    }

    #[test]
    fn test_parse_response_without_segments() {
        let body = r#"{"text": "short clip"}"#;
        let (text, segments) = parse_response(body).unwrap();
        assert_eq!(text, "short clip");
        assert!(segments.is_empty());
    }

    #[test]
    fn test_parse_response_rejects_garbage() {
        assert!(matches!(
            parse_response("<html>bad gateway</html>"),
            Err(SpeechError::Fatal(_))
        ));
    }

    #[test]
    fn test_error_transience() {
        assert!(SpeechError::Transient("x".into()).is_transient());
        assert!(!SpeechError::Fatal("x".into()).is_transient());
    }
}
