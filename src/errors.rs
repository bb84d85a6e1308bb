/*!
 * Error types for the wwdcdigest application.
 *
 * This module contains custom error types for each stage of the digest
 * pipeline, using the thiserror crate for ergonomic error definitions.
 * The split mirrors the failure policy: fetch/decode/storage/configuration
 * errors are fatal, frame-extraction errors are recoverable per segment,
 * and service errors are fatal only to the enrichment step.
 */

// Allow dead code - error types are for library consumers
#![allow(dead_code)]

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while retrieving the session page, video, or subtitles
#[derive(Error, Debug)]
pub enum FetchError {
    /// The given URL is not a WWDC session page
    #[error("Not a WWDC session URL: {0}")]
    InvalidUrl(String),

    /// The request could not be sent or the transfer broke midway
    #[error("Request to {url} failed: {message}")]
    RequestFailed {
        /// URL the request targeted
        url: String,
        /// Underlying cause
        message: String,
    },

    /// The server answered with a non-success status
    #[error("Server returned {status} for {url}")]
    Status {
        /// URL the request targeted
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The session page does not expose a required asset
    #[error("Session page {url} has no {asset}")]
    MissingAsset {
        /// Page that was scraped
        url: String,
        /// What was looked for (video download, subtitle playlist, ...)
        asset: String,
    },

    /// Writing a downloaded asset to disk failed
    #[error("I/O error while fetching: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while decoding a WebVTT payload into cues
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Payload does not start with the WEBVTT magic
    #[error("Subtitle payload is missing the WEBVTT header")]
    MissingHeader,

    /// A timing line could not be parsed
    #[error("Invalid timestamp '{value}' on line {line}")]
    InvalidTimestamp {
        /// 1-based line number in the payload
        line: usize,
        /// Offending timing text
        value: String,
    },

    /// A valid header but not a single cue
    #[error("Subtitle payload contains no cues")]
    NoCues,

    /// Reading the subtitle file failed
    #[error("I/O error while decoding subtitles: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while extracting a still frame from the video.
///
/// Except for `OpenFailed`, these are recoverable: the offending segment is
/// emitted without a frame and the run continues.
#[derive(Error, Debug)]
pub enum FrameExtractionError {
    /// The video container could not be opened or probed
    #[error("Cannot open video source {path}: {message}")]
    OpenFailed {
        /// Path of the container
        path: PathBuf,
        /// Underlying cause
        message: String,
    },

    /// The extractor process could not be spawned
    #[error("Failed to spawn frame extractor: {0}")]
    SpawnFailed(String),

    /// Decoding a frame at the given timestamp failed
    #[error("Frame decode failed at {timestamp_ms}ms: {message}")]
    DecodeFailed {
        /// Requested timestamp in milliseconds
        timestamp_ms: u64,
        /// Underlying cause
        message: String,
    },

    /// The decoder produced no image data for the timestamp
    #[error("No frame data produced at {timestamp_ms}ms")]
    EmptyFrame {
        /// Requested timestamp in milliseconds
        timestamp_ms: u64,
    },

    /// The extractor process did not finish in time
    #[error("Frame extraction timed out at {timestamp_ms}ms")]
    Timeout {
        /// Requested timestamp in milliseconds
        timestamp_ms: u64,
    },
}

/// Errors raised while persisting frames or the final document.
///
/// Always fatal: if the environment cannot store one file it cannot store
/// any output worth having.
#[derive(Error, Debug)]
pub enum StorageError {
    /// A directory could not be created
    #[error("Cannot create directory {path}: {message}")]
    CreateDir {
        /// Directory that was requested
        path: PathBuf,
        /// Underlying cause
        message: String,
    },

    /// A file could not be written
    #[error("Cannot write {path}: {message}")]
    Write {
        /// Target path of the write
        path: PathBuf,
        /// Underlying cause
        message: String,
    },
}

/// Errors raised by the AI text service
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The API answered without usable content
    #[error("API response contained no content")]
    EmptyResponse,
}

/// Errors raised by configuration validation, before any pipeline work
#[derive(Error, Debug)]
pub enum ConfigurationError {
    /// A non-default output language needs the AI service for translation
    #[error("Language '{language}' requires an OpenAI API key for translation")]
    TranslationRequiresOpenAI {
        /// The requested language code
        language: String,
    },

    /// The language code is not a known ISO 639 code
    #[error("Invalid language code: {0}")]
    InvalidLanguage(String),

    /// The requested output format is not supported
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),
}

/// Pipeline stages, used to attach stage context to fatal errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Fetching,
    Decoding,
    BuildingSegments,
    Enriching,
    Assembling,
    Writing,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::Fetching => "fetching",
            PipelineStage::Decoding => "decoding",
            PipelineStage::BuildingSegments => "building segments",
            PipelineStage::Enriching => "enriching",
            PipelineStage::Assembling => "assembling",
            PipelineStage::Writing => "writing",
        };
        write!(f, "{name}")
    }
}

/// Fatal pipeline error, one variant per failing stage
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Rejected before the pipeline started
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Fetching the page, video, or subtitles failed
    #[error("Fetching failed: {0}")]
    Fetch(#[from] FetchError),

    /// The AI service did not answer the preflight connection check,
    /// run before the downloads start
    #[error("AI service connection check failed: {0}")]
    Preflight(ServiceError),

    /// Decoding the subtitle payload failed
    #[error("Decoding subtitles failed: {0}")]
    Decode(#[from] DecodeError),

    /// The video container could not be opened for frame extraction
    #[error("Opening the video source failed: {0}")]
    VideoOpen(FrameExtractionError),

    /// Persisting a frame failed
    #[error("Storing frames failed: {0}")]
    Storage(#[from] StorageError),

    /// The AI service failed while its result was required
    #[error("Enrichment failed: {0}")]
    Enrichment(#[from] ServiceError),

    /// Writing the rendered document failed
    #[error("Writing the digest failed: {0}")]
    Write(StorageError),
}

impl PipelineError {
    /// Stage at which the pipeline failed.
    ///
    /// `None` for configuration errors, which are raised before the state
    /// machine enters its first stage.
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            PipelineError::Configuration(_) => None,
            PipelineError::Fetch(_) | PipelineError::Preflight(_) => {
                Some(PipelineStage::Fetching)
            }
            PipelineError::Decode(_) => Some(PipelineStage::Decoding),
            PipelineError::VideoOpen(_) | PipelineError::Storage(_) => {
                Some(PipelineStage::BuildingSegments)
            }
            PipelineError::Enrichment(_) => Some(PipelineStage::Enriching),
            PipelineError::Write(_) => Some(PipelineStage::Writing),
        }
    }
}
