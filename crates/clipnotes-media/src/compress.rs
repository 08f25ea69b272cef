//! H.264/AAC transcoding with a fast-start container layout.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use clipnotes_core::CompressionSettings;

use crate::error::{MediaError, MediaResult};
use crate::probe::MediaInfo;

/// Result of a compression attempt.
#[derive(Debug)]
pub struct CompressOutcome {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// True when the input exceeded the hard cap and was kept unchanged.
    pub skipped: bool,
}

/// Builds the ffmpeg argument list for one transcode. The scale filter
/// downsizes only, preserving aspect ratio and keeping dimensions even for
/// the H.264 encoder. The fps cap is applied only when the source exceeds it.
fn build_compress_args(
    input: &Path,
    output: &Path,
    settings: &CompressionSettings,
    source_fps: Option<f64>,
) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-i".to_string(),
        input.to_string_lossy().to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        settings.preset.clone(),
        "-crf".to_string(),
        settings.crf.to_string(),
        "-vf".to_string(),
        format!(
            "scale='min({},iw)':'min({},ih)':force_original_aspect_ratio=decrease:force_divisible_by=2",
            settings.max_width, settings.max_height
        ),
    ];

    if source_fps.is_some_and(|fps| fps > settings.max_fps as f64) {
        args.push("-r".to_string());
        args.push(settings.max_fps.to_string());
    }

    args.extend_from_slice(&[
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        format!("{}k", settings.audio_kbps),
        "-movflags".to_string(),
        "+faststart".to_string(),
        output.to_string_lossy().to_string(),
    ]);

    args
}

/// Transcode a video to a compressed, progressively-playable MP4.
///
/// Files above `settings.skip_above_bytes` are not transcoded: the original
/// path is returned unchanged with `skipped = true` and the pipeline carries
/// on with the source file.
pub async fn compress(
    ffmpeg_path: &str,
    input: &Path,
    output_dir: &Path,
    info: &MediaInfo,
    settings: &CompressionSettings,
) -> MediaResult<CompressOutcome> {
    if info.size_bytes > settings.skip_above_bytes {
        tracing::warn!(
            size_bytes = info.size_bytes,
            cap_bytes = settings.skip_above_bytes,
            "Input above compression cap, keeping original"
        );
        return Ok(CompressOutcome {
            path: input.to_path_buf(),
            size_bytes: info.size_bytes,
            skipped: true,
        });
    }

    let output = output_dir.join("compressed.mp4");
    let args = build_compress_args(input, &output, settings, info.fps);

    let start = std::time::Instant::now();
    let result = Command::new(ffmpeg_path)
        .args(&args)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| MediaError::TranscodeFailed(format!("Failed to execute ffmpeg: {}", e)))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(MediaError::TranscodeFailed(stderr.trim().to_string()));
    }

    let size_bytes = tokio::fs::metadata(&output).await?.len();

    tracing::info!(
        input_bytes = info.size_bytes,
        output_bytes = size_bytes,
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Video compressed"
    );

    Ok(CompressOutcome {
        path: output,
        size_bytes,
        skipped: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> CompressionSettings {
        CompressionSettings {
            crf: 26,
            max_width: 1920,
            max_height: 1080,
            max_fps: 30,
            audio_kbps: 128,
            preset: "medium".to_string(),
            skip_above_bytes: 1024 * 1024 * 1024,
        }
    }

    #[test]
    fn test_args_include_faststart_and_codecs() {
        let args = build_compress_args(
            Path::new("/tmp/in.mp4"),
            Path::new("/tmp/out.mp4"),
            &settings(),
            Some(24.0),
        );
        let joined = args.join(" ");
        assert!(joined.contains("-c:v libx264"));
        assert!(joined.contains("-c:a aac"));
        assert!(joined.contains("-b:a 128k"));
        assert!(joined.contains("-crf 26"));
        assert!(joined.contains("-preset medium"));
        assert!(joined.contains("-movflags +faststart"));
    }

    #[test]
    fn test_scale_filter_preserves_aspect() {
        let args = build_compress_args(
            Path::new("in.mp4"),
            Path::new("out.mp4"),
            &settings(),
            None,
        );
        let vf = args
            .iter()
            .position(|a| a == "-vf")
            .map(|i| args[i + 1].clone())
            .unwrap();
        assert!(vf.contains("min(1920,iw)"));
        assert!(vf.contains("min(1080,ih)"));
        assert!(vf.contains("force_original_aspect_ratio=decrease"));
        assert!(vf.contains("force_divisible_by=2"));
    }

    #[test]
    fn test_fps_cap_applied_only_when_source_exceeds() {
        let capped = build_compress_args(
            Path::new("in.mp4"),
            Path::new("out.mp4"),
            &settings(),
            Some(60.0),
        );
        assert!(capped.windows(2).any(|w| w[0] == "-r" && w[1] == "30"));

        let uncapped = build_compress_args(
            Path::new("in.mp4"),
            Path::new("out.mp4"),
            &settings(),
            Some(24.0),
        );
        assert!(!uncapped.iter().any(|a| a == "-r"));

        let unknown = build_compress_args(
            Path::new("in.mp4"),
            Path::new("out.mp4"),
            &settings(),
            None,
        );
        assert!(!unknown.iter().any(|a| a == "-r"));
    }

    #[tokio::test]
    async fn test_compress_skips_above_cap() {
        let mut s = settings();
        s.skip_above_bytes = 1000;
        let info = MediaInfo {
            duration_s: 10.0,
            size_bytes: 2000,
            video_present: true,
            audio_present: true,
            width: Some(1280),
            height: Some(720),
            fps: Some(30.0),
        };
        let outcome = compress(
            "ffmpeg-does-not-exist",
            Path::new("/tmp/in.mp4"),
            Path::new("/tmp"),
            &info,
            &s,
        )
        .await
        .unwrap();
        assert!(outcome.skipped);
        assert_eq!(outcome.path, PathBuf::from("/tmp/in.mp4"));
        assert_eq!(outcome.size_bytes, 2000);
    }
}
