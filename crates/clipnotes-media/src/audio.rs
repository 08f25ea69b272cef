//! Audio extraction and size-bounded chunking.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};

/// A slice of the extracted audio with its absolute start time in the
/// original recording. The offset is what the transcription engine adds to
/// per-chunk segment timestamps during merging.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub path: PathBuf,
    pub start_offset_s: f64,
}

/// How to split an audio file so each piece stays under the byte threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkPlan {
    pub count: u64,
    pub segment_time_s: f64,
}

/// Plan time-boundary splits for `total_bytes` of roughly constant-bitrate
/// audio. Returns `None` when the file already fits in one chunk.
pub fn chunk_plan(total_bytes: u64, duration_s: f64, max_chunk_bytes: u64) -> Option<ChunkPlan> {
    if total_bytes <= max_chunk_bytes || max_chunk_bytes == 0 || duration_s <= 0.0 {
        return None;
    }
    let count = total_bytes.div_ceil(max_chunk_bytes);
    Some(ChunkPlan {
        count,
        segment_time_s: duration_s / count as f64,
    })
}

/// Absolute start offsets for a plan's chunks: `0, t, 2t, ...`.
pub fn chunk_offsets(plan: &ChunkPlan) -> Vec<f64> {
    (0..plan.count)
        .map(|i| i as f64 * plan.segment_time_s)
        .collect()
}

/// Extract the audio track as MP3 at a bitrate suitable for speech
/// recognition (mono, 16 kHz). Returns the output path and its size.
pub async fn extract_audio(
    ffmpeg_path: &str,
    input: &Path,
    output_dir: &Path,
    bitrate_kbps: u32,
) -> MediaResult<(PathBuf, u64)> {
    let output = output_dir.join("audio.mp3");

    let result = Command::new(ffmpeg_path)
        .args([
            "-y",
            "-i",
            &input.to_string_lossy(),
            "-vn",
            "-acodec",
            "libmp3lame",
            "-b:a",
            &format!("{}k", bitrate_kbps),
            "-ac",
            "1",
            "-ar",
            "16000",
            &output.to_string_lossy(),
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| {
            MediaError::AudioExtractionFailed(format!("Failed to execute ffmpeg: {}", e))
        })?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(MediaError::AudioExtractionFailed(stderr.trim().to_string()));
    }

    let size = tokio::fs::metadata(&output).await?.len();
    tracing::info!(size_bytes = size, "Audio track extracted");
    Ok((output, size))
}

/// Split audio into chunks no larger than `max_chunk_bytes`, each annotated
/// with its absolute start offset. Inputs under the threshold come back as a
/// single chunk at offset 0.
pub async fn chunk_audio(
    ffmpeg_path: &str,
    input: &Path,
    output_dir: &Path,
    duration_s: f64,
    max_chunk_bytes: u64,
) -> MediaResult<Vec<AudioChunk>> {
    let total_bytes = tokio::fs::metadata(input).await?.len();

    let Some(plan) = chunk_plan(total_bytes, duration_s, max_chunk_bytes) else {
        return Ok(vec![AudioChunk {
            path: input.to_path_buf(),
            start_offset_s: 0.0,
        }]);
    };

    let pattern = output_dir.join("chunk_%03d.mp3");
    let result = Command::new(ffmpeg_path)
        .args([
            "-y",
            "-i",
            &input.to_string_lossy(),
            "-f",
            "segment",
            "-segment_time",
            &format!("{:.3}", plan.segment_time_s),
            "-c",
            "copy",
            &pattern.to_string_lossy(),
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| MediaError::ChunkingFailed(format!("Failed to execute ffmpeg: {}", e)))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(MediaError::ChunkingFailed(stderr.trim().to_string()));
    }

    let mut chunk_paths = Vec::new();
    let mut entries = tokio::fs::read_dir(output_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_chunk = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("chunk_") && n.ends_with(".mp3"));
        if is_chunk {
            chunk_paths.push(path);
        }
    }
    // Segment numbering is zero-padded, so lexical order is chunk order.
    chunk_paths.sort();

    if chunk_paths.is_empty() {
        return Err(MediaError::ChunkingFailed(
            "ffmpeg produced no segments".to_string(),
        ));
    }

    let chunks: Vec<AudioChunk> = chunk_paths
        .into_iter()
        .enumerate()
        .map(|(i, path)| AudioChunk {
            path,
            start_offset_s: i as f64 * plan.segment_time_s,
        })
        .collect();

    tracing::info!(
        chunk_count = chunks.len(),
        segment_time_s = plan.segment_time_s,
        "Audio chunked for transcription"
    );

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn test_chunk_plan_under_threshold_is_single() {
        assert_eq!(chunk_plan(10 * MIB, 600.0, 25 * MIB), None);
        assert_eq!(chunk_plan(25 * MIB, 600.0, 25 * MIB), None);
    }

    #[test]
    fn test_chunk_plan_ninety_minute_audio() {
        // 90 minutes, ~80 MiB, 25 MiB threshold -> 4 chunks of 22.5 minutes.
        let plan = chunk_plan(80 * MIB, 5400.0, 25 * MIB).unwrap();
        assert_eq!(plan.count, 4);
        assert!((plan.segment_time_s - 1350.0).abs() < 1e-9);

        let offsets = chunk_offsets(&plan);
        assert_eq!(offsets.len(), 4);
        assert_eq!(offsets[0], 0.0);
        assert!((offsets[1] - 1350.0).abs() < 1e-9);
        assert!((offsets[2] - 2700.0).abs() < 1e-9);
        assert!((offsets[3] - 4050.0).abs() < 1e-9);
    }

    #[test]
    fn test_chunk_plan_offsets_monotonic() {
        let plan = chunk_plan(101 * MIB, 7200.0, 25 * MIB).unwrap();
        assert_eq!(plan.count, 5);
        let offsets = chunk_offsets(&plan);
        assert!(offsets.windows(2).all(|w| w[0] < w[1]));
        // Last chunk still starts within the recording.
        assert!(*offsets.last().unwrap() < 7200.0);
    }

    #[test]
    fn test_chunk_plan_each_chunk_fits() {
        // Every chunk's share of bytes must be <= the threshold.
        for (bytes, max) in [(80 * MIB, 25 * MIB), (26 * MIB, 25 * MIB), (250 * MIB, 25 * MIB)] {
            let plan = chunk_plan(bytes, 1000.0, max).unwrap();
            let per_chunk = (bytes as f64 / plan.count as f64).ceil() as u64;
            assert!(per_chunk <= max, "{} bytes over {} chunks", bytes, plan.count);
        }
    }

    #[test]
    fn test_chunk_plan_degenerate_inputs() {
        assert_eq!(chunk_plan(100, 0.0, 10), None);
        assert_eq!(chunk_plan(100, 10.0, 0), None);
    }

    #[tokio::test]
    async fn test_chunk_audio_below_threshold_returns_input() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("audio.mp3");
        tokio::fs::write(&input, vec![0u8; 1024]).await.unwrap();

        let chunks = chunk_audio("ffmpeg-does-not-exist", &input, dir.path(), 60.0, MIB)
            .await
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].path, input);
        assert_eq!(chunks[0].start_offset_s, 0.0);
    }
}
