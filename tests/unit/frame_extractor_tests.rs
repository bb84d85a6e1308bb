/*!
 * Tests for frame extraction helpers
 */

use wwdcdigest::errors::FrameExtractionError;
use wwdcdigest::frame_extractor::{VideoSource, clamp_timestamp, parse_duration_ms};

/// Test timestamp clamping within the container duration
#[test]
fn test_clamp_timestamp_withinDuration_shouldPassThrough() {
    assert_eq!(clamp_timestamp(0, 10000), 0);
    assert_eq!(clamp_timestamp(5000, 10000), 5000);
}

/// Test timestamp clamping beyond the container duration
#[test]
fn test_clamp_timestamp_beyondDuration_shouldClampToLastInstant() {
    assert_eq!(clamp_timestamp(10000, 10000), 9999);
    assert_eq!(clamp_timestamp(99999, 10000), 9999);
}

/// Test that an unknown duration disables clamping
#[test]
fn test_clamp_timestamp_withUnknownDuration_shouldPassThrough() {
    assert_eq!(clamp_timestamp(123456, 0), 123456);
}

/// Test ffprobe duration parsing from valid output
#[test]
fn test_parse_duration_ms_withValidJson_shouldReturnMillis() {
    let json = r#"{"format": {"duration": "123.456", "format_name": "mov,mp4"}}"#;
    assert_eq!(parse_duration_ms(json), Some(123456));
}

/// Test ffprobe duration parsing from degenerate output
#[test]
fn test_parse_duration_ms_withMissingOrBadDuration_shouldReturnNone() {
    assert_eq!(parse_duration_ms(r#"{"format": {}}"#), None);
    assert_eq!(parse_duration_ms(r#"{"format": {"duration": "N/A"}}"#), None);
    assert_eq!(parse_duration_ms(r#"{"format": {"duration": "0.0"}}"#), None);
    assert_eq!(parse_duration_ms("not json"), None);
}

/// Test that opening a missing video file fails before spawning ffprobe
#[tokio::test]
async fn test_video_source_open_withMissingFile_shouldFail() {
    let result = VideoSource::open("/nonexistent/video.mp4").await;
    match result {
        Err(FrameExtractionError::OpenFailed { path, message }) => {
            assert!(path.ends_with("video.mp4"));
            assert!(message.contains("does not exist"));
        }
        other => panic!("Expected OpenFailed, got {:?}", other),
    }
}
