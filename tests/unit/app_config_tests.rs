/*!
 * Tests for application configuration functionality
 */

use anyhow::Result;
use wwdcdigest::app_config::{Config, ImageFormat, LogLevel, OutputFormat};
use wwdcdigest::errors::ConfigurationError;
use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.language, "en");
    assert_eq!(config.output_format, OutputFormat::Markdown);
    assert_eq!(config.image.format, ImageFormat::Jpg);
    assert!(config.image.width.is_none());
    assert_eq!(config.log_level, LogLevel::Info);

    // OpenAI defaults: no key, public endpoint, bounded concurrency
    assert!(config.openai.api_key.is_empty());
    assert_eq!(config.openai.model, "gpt-4.1");
    assert_eq!(config.openai.endpoint, "https://api.openai.com/v1");
    assert_eq!(config.openai.concurrent_requests, 4);
    assert_eq!(config.openai.timeout_secs, 60);

    assert!(!config.enrichment_enabled());
    assert!(!config.wants_translation());
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    // Default config is valid
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    // Unknown language code fails
    config.language = "xyz".to_string();
    assert!(matches!(
        config.validate(),
        Err(ConfigurationError::InvalidLanguage(_))
    ));

    // A translated digest without an API key fails before any pipeline work
    config.language = "ja".to_string();
    assert!(matches!(
        config.validate(),
        Err(ConfigurationError::TranslationRequiresOpenAI { ref language }) if language == "ja"
    ));

    // The same language with a key is fine
    config.openai.api_key = "sk-1234567890".to_string();
    assert!(config.validate().is_ok());
    assert!(config.wants_translation());

    // English spelled as a three-letter code needs no translation
    config.openai.api_key = String::new();
    config.language = "eng".to_string();
    assert!(config.validate().is_ok());
    assert!(!config.wants_translation());
}

/// Test loading configuration from a JSON file
#[test]
fn test_config_from_file_withValidJson_shouldLoad() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config_path = common::create_test_file(
        &temp_dir.path().to_path_buf(),
        "conf.json",
        r#"{
            "language": "fr",
            "image": { "format": "png", "width": 640 },
            "openai": { "api_key": "sk-test", "model": "gpt-4o" },
            "log_level": "debug"
        }"#,
    )?;

    let config = Config::from_file(&config_path)?;
    assert_eq!(config.language, "fr");
    assert_eq!(config.image.format, ImageFormat::Png);
    assert_eq!(config.image.width, Some(640));
    assert_eq!(config.openai.api_key, "sk-test");
    assert_eq!(config.openai.model, "gpt-4o");
    // Unspecified fields fall back to defaults
    assert_eq!(config.openai.concurrent_requests, 4);
    assert_eq!(config.log_level, LogLevel::Debug);

    Ok(())
}

/// Test loading configuration from malformed JSON
#[test]
fn test_config_from_file_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config_path = common::create_test_file(
        &temp_dir.path().to_path_buf(),
        "conf.json",
        "{ not json",
    )?;

    assert!(Config::from_file(&config_path).is_err());

    Ok(())
}

/// Test output format parsing
#[test]
fn test_output_format_parsing_withVariousInputs_shouldParseOrReject() {
    assert_eq!("markdown".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
    assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
    assert_eq!("Markdown".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
    assert!(matches!(
        "pdf".parse::<OutputFormat>(),
        Err(ConfigurationError::UnsupportedFormat(_))
    ));
}

/// Test image format parsing and derived values
#[test]
fn test_image_format_parsing_withVariousInputs_shouldParseOrReject() {
    assert_eq!("jpg".parse::<ImageFormat>().unwrap(), ImageFormat::Jpg);
    assert_eq!("jpeg".parse::<ImageFormat>().unwrap(), ImageFormat::Jpg);
    assert_eq!("PNG".parse::<ImageFormat>().unwrap(), ImageFormat::Png);
    assert_eq!("webp".parse::<ImageFormat>().unwrap(), ImageFormat::Webp);
    assert!("bmp".parse::<ImageFormat>().is_err());

    assert_eq!(ImageFormat::Jpg.extension(), "jpg");
    assert_eq!(ImageFormat::Jpg.codec(), "mjpeg");
    assert_eq!(ImageFormat::Png.codec(), "png");
    assert_eq!(ImageFormat::Webp.codec(), "libwebp");
}
