//! Media probing via ffprobe.

use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};

/// What a probe learns about a media file.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub duration_s: f64,
    pub size_bytes: u64,
    pub video_present: bool,
    pub audio_present: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
}

/// Parses an ffprobe `avg_frame_rate` fraction like "30000/1001".
fn parse_frame_rate(raw: &str) -> Option<f64> {
    let (num, den) = raw.split_once('/')?;
    let num: f64 = num.parse().ok()?;
    let den: f64 = den.parse().ok()?;
    if den == 0.0 {
        return None;
    }
    Some(num / den)
}

/// Parses ffprobe `-print_format json` output into [`MediaInfo`].
fn parse_probe_output(json: &str) -> MediaResult<MediaInfo> {
    let output: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| MediaError::ProbeFailed(format!("Unparseable ffprobe output: {}", e)))?;

    let format = output
        .format
        .ok_or_else(|| MediaError::ProbeFailed("ffprobe output missing format".to_string()))?;

    let duration_s = format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| MediaError::ProbeFailed("ffprobe output missing duration".to_string()))?;

    let size_bytes = format
        .size
        .as_deref()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    let mut video_present = false;
    let mut audio_present = false;
    let mut width = None;
    let mut height = None;
    let mut fps = None;

    for stream in &output.streams {
        match stream.codec_type.as_deref() {
            Some("video") => {
                video_present = true;
                width = width.or(stream.width);
                height = height.or(stream.height);
                fps = fps.or_else(|| stream.avg_frame_rate.as_deref().and_then(parse_frame_rate));
            }
            Some("audio") => audio_present = true,
            _ => {}
        }
    }

    Ok(MediaInfo {
        duration_s,
        size_bytes,
        video_present,
        audio_present,
        width,
        height,
        fps,
    })
}

/// Probe a local media file. Fails with `ProbeFailed` when the file is not
/// decodable.
pub async fn probe(ffprobe_path: &str, path: &Path) -> MediaResult<MediaInfo> {
    let output = Command::new(ffprobe_path)
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| MediaError::ProbeFailed(format!("Failed to execute ffprobe: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MediaError::ProbeFailed(stderr.trim().to_string()));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut info = parse_probe_output(&stdout)?;

    // ffprobe's reported size can disagree with the filesystem for some
    // containers; the filesystem wins.
    if let Ok(meta) = tokio::fs::metadata(path).await {
        info.size_bytes = meta.len();
    }

    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {
                "codec_type": "video",
                "codec_name": "h264",
                "width": 1920,
                "height": 1080,
                "avg_frame_rate": "30000/1001"
            },
            {
                "codec_type": "audio",
                "codec_name": "aac",
                "avg_frame_rate": "0/0"
            }
        ],
        "format": {
            "duration": "734.567000",
            "size": "12582912",
            "format_name": "mov,mp4,m4a,3gp,3g2,mj2"
        }
    }"#;

    #[test]
    fn test_parse_probe_output_full() {
        let info = parse_probe_output(SAMPLE).unwrap();
        assert!((info.duration_s - 734.567).abs() < 1e-6);
        assert_eq!(info.size_bytes, 12582912);
        assert!(info.video_present);
        assert!(info.audio_present);
        assert_eq!(info.width, Some(1920));
        assert_eq!(info.height, Some(1080));
        assert!((info.fps.unwrap() - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_parse_probe_output_audio_only() {
        let json = r#"{
            "streams": [{"codec_type": "audio"}],
            "format": {"duration": "60.0", "size": "100"}
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert!(!info.video_present);
        assert!(info.audio_present);
        assert_eq!(info.width, None);
    }

    #[test]
    fn test_parse_probe_output_missing_duration_fails() {
        let json = r#"{"streams": [], "format": {"size": "100"}}"#;
        assert!(matches!(
            parse_probe_output(json),
            Err(MediaError::ProbeFailed(_))
        ));
    }

    #[test]
    fn test_parse_probe_output_garbage_fails() {
        assert!(matches!(
            parse_probe_output("not json"),
            Err(MediaError::ProbeFailed(_))
        ));
    }

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("garbage"), None);
    }
}
