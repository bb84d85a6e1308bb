use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::Path;

use crate::errors::ConfigurationError;
use crate::file_utils::FileManager;
use crate::language_utils;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and resolving settings from file, CLI and environment.
/// Language of the subtitle track WWDC publishes
pub const DEFAULT_LANGUAGE: &str = "en";

/// Environment variable consulted when no API key is configured
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable consulted when no endpoint is configured
pub const OPENAI_API_ENDPOINT_ENV: &str = "OPENAI_API_ENDPOINT";

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Delivered digest language code (ISO 639)
    #[serde(default = "default_language")]
    pub language: String,

    /// Output document format
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Frame image options
    #[serde(default)]
    pub image: ImageOptions,

    /// OpenAI-compatible service used for summary, key points and translation
    #[serde(default)]
    pub openai: OpenAIConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Output document format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    // @format: Markdown document with embedded frame images
    #[default]
    Markdown,
}

impl OutputFormat {
    // @returns: Lowercase format identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Markdown => "markdown".to_string(),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            _ => Err(ConfigurationError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Still-frame image encoding
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    // @format: JPEG, the default
    #[default]
    Jpg,
    // @format: PNG, lossless
    Png,
    // @format: WebP
    Webp,
}

impl ImageFormat {
    // @returns: File extension without a dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    // @returns: ffmpeg encoder name for this format
    pub fn codec(&self) -> &'static str {
        match self {
            Self::Jpg => "mjpeg",
            Self::Png => "png",
            Self::Webp => "libwebp",
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl std::str::FromStr for ImageFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::Webp),
            _ => Err(anyhow!("Invalid image format: {}", s)),
        }
    }
}

/// Options applied to every extracted frame
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default)]
pub struct ImageOptions {
    /// Image encoding for saved frames
    #[serde(default)]
    pub format: ImageFormat,

    /// Target width in pixels, keeping aspect ratio; None keeps source size
    #[serde(default)]
    pub width: Option<u32>,
}

/// OpenAI service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OpenAIConfig {
    /// Model name (e.g., "gpt-4.1")
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// API key for the service; empty disables enrichment
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Service endpoint URL (optional, for Azure OpenAI or self-hosted)
    #[serde(default = "default_openai_endpoint")]
    pub endpoint: String,

    /// Maximum number of concurrent requests
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            model: default_openai_model(),
            api_key: String::new(),
            endpoint: default_openai_endpoint(),
            concurrent_requests: default_concurrent_requests(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4.1".to_string()
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = FileManager::read_to_string(&path)?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Fill in OpenAI credentials from the environment when the config
    /// carries none. CLI values are applied before this runs, so the
    /// precedence is CLI > config file > environment.
    pub fn resolve_openai_env(&mut self) {
        if self.openai.api_key.is_empty() {
            if let Ok(key) = std::env::var(OPENAI_API_KEY_ENV) {
                self.openai.api_key = key;
            }
        }
        if let Ok(endpoint) = std::env::var(OPENAI_API_ENDPOINT_ENV) {
            if !endpoint.is_empty() && self.openai.endpoint == default_openai_endpoint() {
                self.openai.endpoint = endpoint;
            }
        }
    }

    /// Whether an AI service is available for summary and translation
    pub fn enrichment_enabled(&self) -> bool {
        !self.openai.api_key.is_empty()
    }

    /// Whether the delivered language differs from the subtitle track
    pub fn wants_translation(&self) -> bool {
        !language_utils::language_codes_match(&self.language, DEFAULT_LANGUAGE)
    }

    /// Validate the configuration for consistency and required values.
    ///
    /// Runs before any network or filesystem activity: a non-default
    /// language without an API key must fail here, not after a download.
    pub fn validate(&self) -> std::result::Result<(), ConfigurationError> {
        language_utils::validate_language_code(&self.language)?;

        if self.wants_translation() && !self.enrichment_enabled() {
            return Err(ConfigurationError::TranslationRequiresOpenAI {
                language: self.language.clone(),
            });
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            language: default_language(),
            output_format: OutputFormat::default(),
            image: ImageOptions::default(),
            openai: OpenAIConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
