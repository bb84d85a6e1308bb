use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, warn};
use serde_json::Value;
use tokio::process::Command;

use crate::app_config::ImageOptions;
use crate::errors::FrameExtractionError;

// @module: Still-frame extraction from a video source

/// Timeout for probing the container
const PROBE_TIMEOUT_SECS: u64 = 60;

/// Timeout for decoding a single frame
const EXTRACT_TIMEOUT_SECS: u64 = 60;

/// An opened, probed video container
#[derive(Debug, Clone)]
pub struct VideoSource {
    /// Path of the container
    path: PathBuf,

    /// Container-reported duration; 0 when the container does not report one
    duration_ms: u64,
}

impl VideoSource {
    /// Open a video container and probe its duration.
    ///
    /// Failure here is fatal to the pipeline: a container that cannot be
    /// probed cannot be seeked either.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, FrameExtractionError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(FrameExtractionError::OpenFailed {
                path: path.to_path_buf(),
                message: "file does not exist".to_string(),
            });
        }

        let ffprobe_future = Command::new("ffprobe")
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                path.to_str().unwrap_or_default(),
            ])
            .output();

        let timeout = std::time::Duration::from_secs(PROBE_TIMEOUT_SECS);
        let output = tokio::select! {
            result = ffprobe_future => {
                result.map_err(|e| FrameExtractionError::OpenFailed {
                    path: path.to_path_buf(),
                    message: format!("failed to execute ffprobe: {e}"),
                })?
            },
            _ = tokio::time::sleep(timeout) => {
                return Err(FrameExtractionError::OpenFailed {
                    path: path.to_path_buf(),
                    message: format!("ffprobe timed out after {PROBE_TIMEOUT_SECS} seconds"),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FrameExtractionError::OpenFailed {
                path: path.to_path_buf(),
                message: filter_ffmpeg_stderr(&stderr),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let duration_ms = match parse_duration_ms(&stdout) {
            Some(ms) => ms,
            None => {
                warn!("Container reports no duration, out-of-range timestamps will not be clamped");
                0
            }
        };

        debug!("Opened video source {:?} ({} ms)", path, duration_ms);
        Ok(VideoSource {
            path: path.to_path_buf(),
            duration_ms,
        })
    }

    /// Path of the container
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Container-reported duration in milliseconds, 0 when unknown
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}

/// Parse the duration out of ffprobe `-show_format` JSON output
pub fn parse_duration_ms(ffprobe_json: &str) -> Option<u64> {
    let json: Value = serde_json::from_str(ffprobe_json).ok()?;
    let duration = json.get("format")?.get("duration")?.as_str()?;
    let seconds: f64 = duration.parse().ok()?;
    if seconds.is_finite() && seconds > 0.0 {
        Some((seconds * 1000.0) as u64)
    } else {
        None
    }
}

/// Clamp a requested timestamp into the decodable range.
///
/// Subtitle timestamps occasionally exceed the container-reported duration
/// by rounding; the last decodable instant is the useful answer there, not
/// a failure. A duration of 0 means unknown and disables clamping.
pub fn clamp_timestamp(timestamp_ms: u64, duration_ms: u64) -> u64 {
    if duration_ms == 0 {
        timestamp_ms
    } else {
        timestamp_ms.min(duration_ms.saturating_sub(1))
    }
}

/// An encoded still image pulled from the video
#[derive(Debug, Clone)]
pub struct FrameImage {
    /// Encoded image bytes
    pub data: Vec<u8>,

    /// Encoding of the bytes
    pub format: crate::app_config::ImageFormat,
}

/// Source of still frames for segment building.
///
/// Implementations must stay usable after a failed call: one bad timestamp
/// must not poison extraction for the remaining cues.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Extract a still image for the given timestamp
    async fn extract(&self, timestamp_ms: u64) -> Result<FrameImage, FrameExtractionError>;
}

/// Frame source running one ffmpeg process per extraction.
///
/// The per-call process keeps the container handle isolated, so concurrent
/// extractions need no seek serialization and a decode failure cannot
/// invalidate later calls.
pub struct FfmpegFrameExtractor {
    source: VideoSource,
    options: ImageOptions,
}

impl FfmpegFrameExtractor {
    /// Create an extractor over an opened video source
    pub fn new(source: VideoSource, options: ImageOptions) -> Self {
        FfmpegFrameExtractor { source, options }
    }

    /// The underlying video source
    pub fn source(&self) -> &VideoSource {
        &self.source
    }
}

#[async_trait]
impl FrameSource for FfmpegFrameExtractor {
    async fn extract(&self, timestamp_ms: u64) -> Result<FrameImage, FrameExtractionError> {
        let effective_ms = clamp_timestamp(timestamp_ms, self.source.duration_ms);
        if effective_ms != timestamp_ms {
            debug!(
                "Clamped timestamp {} ms to {} ms (container duration {} ms)",
                timestamp_ms, effective_ms, self.source.duration_ms
            );
        }

        let seek = format!("{:.3}", effective_ms as f64 / 1000.0);
        let mut args: Vec<String> = vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            // Seek before the input for keyframe-fast seeking
            "-ss".to_string(),
            seek,
            "-i".to_string(),
            self.source.path.to_string_lossy().to_string(),
            "-frames:v".to_string(),
            "1".to_string(),
        ];

        if let Some(width) = self.options.width {
            args.push("-vf".to_string());
            args.push(format!("scale={width}:-1"));
        }

        args.extend([
            "-c:v".to_string(),
            self.options.format.codec().to_string(),
            "-f".to_string(),
            "image2pipe".to_string(),
            "pipe:1".to_string(),
        ]);

        let ffmpeg_future = Command::new("ffmpeg").args(&args).output();

        let timeout = std::time::Duration::from_secs(EXTRACT_TIMEOUT_SECS);
        let output = tokio::select! {
            result = ffmpeg_future => {
                result.map_err(|e| FrameExtractionError::SpawnFailed(e.to_string()))?
            },
            _ = tokio::time::sleep(timeout) => {
                return Err(FrameExtractionError::Timeout { timestamp_ms });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FrameExtractionError::DecodeFailed {
                timestamp_ms,
                message: filter_ffmpeg_stderr(&stderr),
            });
        }

        if output.stdout.is_empty() {
            return Err(FrameExtractionError::EmptyFrame { timestamp_ms });
        }

        Ok(FrameImage {
            data: output.stdout,
            format: self.options.format,
        })
    }
}

/// Filter ffmpeg stderr to only show meaningful error lines, stripping the
/// version banner, build configuration, and stream metadata noise.
fn filter_ffmpeg_stderr(stderr: &str) -> String {
    let dominated_prefixes = [
        "ffmpeg version",
        "ffprobe version",
        "  built with",
        "  configuration:",
        "  lib",
        "Input #",
        "  Metadata:",
        "  Duration:",
        "  Stream #",
        "Output #",
        "Stream mapping:",
        "Press [q]",
    ];

    let meaningful: Vec<&str> = stderr
        .lines()
        .filter(|line| {
            let trimmed = line.trim_end();
            if trimmed.trim().is_empty() {
                return false;
            }
            !dominated_prefixes.iter().any(|p| trimmed.starts_with(p))
        })
        .collect();

    if meaningful.is_empty() {
        "unknown ffmpeg error (stderr was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}
