/*!
 * Tests for the configuration gate in front of the pipeline.
 *
 * A digest in a non-default language needs the AI service for translation;
 * that mismatch must be rejected before any network or filesystem work.
 */

use anyhow::Result;
use wwdcdigest::app_config::Config;
use wwdcdigest::app_controller::Controller;
use wwdcdigest::errors::{ConfigurationError, PipelineError};
use crate::common;

/// Test that a translated digest without credentials is rejected up front
#[tokio::test]
async fn test_create_digest_withLanguageButNoKey_shouldFailBeforeAnyWork() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = Config {
        language: "ja".to_string(),
        ..Config::default()
    };

    let controller = Controller::with_config(config);
    let result = controller
        .create_digest(
            "https://developer.apple.com/videos/play/wwdc2023/10187/",
            temp_dir.path(),
        )
        .await;

    match result {
        Err(PipelineError::Configuration(ConfigurationError::TranslationRequiresOpenAI {
            language,
        })) => {
            assert_eq!(language, "ja");
        }
        other => panic!("Expected a configuration error, got {:?}", other),
    }

    // Rejected before the first stage, so no stage context and no output
    let err = controller
        .create_digest(
            "https://developer.apple.com/videos/play/wwdc2023/10187/",
            temp_dir.path(),
        )
        .await
        .unwrap_err();
    assert!(err.stage().is_none());
    assert_eq!(std::fs::read_dir(temp_dir.path())?.count(), 0);

    Ok(())
}

/// Test that an invalid session URL fails in the fetching stage, offline
#[tokio::test]
async fn test_create_digest_withForeignUrl_shouldFailWhileFetching() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = Controller::with_config(Config::default());

    let err = controller
        .create_digest("https://example.com/videos/play/wwdc2023/10187/", temp_dir.path())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Fetch(_)));
    assert_eq!(
        err.stage(),
        Some(wwdcdigest::errors::PipelineStage::Fetching)
    );
    // URL validation happens before any request or directory creation
    assert_eq!(std::fs::read_dir(temp_dir.path())?.count(), 0);

    Ok(())
}

/// Test that an invalid language code is rejected as configuration
#[tokio::test]
async fn test_create_digest_withBadLanguageCode_shouldFailValidation() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = Config {
        language: "xyz".to_string(),
        ..Config::default()
    };

    let controller = Controller::with_config(config);
    let err = controller
        .create_digest(
            "https://developer.apple.com/videos/play/wwdc2023/10187/",
            temp_dir.path(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Configuration(ConfigurationError::InvalidLanguage(_))
    ));

    Ok(())
}
