/*!
 * Tests for WebVTT subtitle decoding functionality
 */

use std::fmt::Write;

use anyhow::Result;
use wwdcdigest::errors::{DecodeError, StorageError};
use wwdcdigest::subtitle_processor::{SubtitleCollection, SubtitleCue, format_timestamp};
use crate::common;

/// Test timestamp parsing and formatting
#[test]
fn test_timestamp_parsing_withValidTimestamp_shouldParseAndFormat() {
    let ts = "01:23:45.678";
    let ms = SubtitleCue::parse_timestamp(ts).unwrap();
    assert_eq!(ms, 5025678);

    let formatted = format_timestamp(ms);
    assert_eq!(formatted, ts);
}

/// Test timestamp parsing without an hours component
#[test]
fn test_timestamp_parsing_withoutHours_shouldParse() {
    let ms = SubtitleCue::parse_timestamp("02:03.500").unwrap();
    assert_eq!(ms, 123500);
}

/// Test timestamp parsing with comma millisecond separator
#[test]
fn test_timestamp_parsing_withCommaSeparator_shouldParse() {
    let ms = SubtitleCue::parse_timestamp("00:00:01,250").unwrap();
    assert_eq!(ms, 1250);
}

/// Test timestamp parsing rejects malformed input
#[test]
fn test_timestamp_parsing_withInvalidInput_shouldFail() {
    assert!(SubtitleCue::parse_timestamp("not a timestamp").is_err());
    assert!(SubtitleCue::parse_timestamp("00:99:00.000").is_err());
    assert!(SubtitleCue::parse_timestamp("00:00:00").is_err());
}

/// Test subtitle cue display formatting
#[test]
fn test_subtitle_cue_display_withValidCue_shouldFormatCorrectly() {
    let cue = SubtitleCue::new(1, 5000, 10000, "Test subtitle".to_string());
    let mut output = String::new();
    write!(output, "{}", cue).unwrap();

    assert!(output.contains("1"));
    assert!(output.contains("00:00:05.000 --> 00:00:10.000"));
    assert!(output.contains("Test subtitle"));
}

/// Test basic WebVTT string parsing
#[test]
fn test_parse_webvtt_string_withValidPayload_shouldParseAllCues() {
    let cues = SubtitleCollection::parse_webvtt_string(common::sample_webvtt()).unwrap();

    assert_eq!(cues.len(), 3);
    assert_eq!(cues[0].start_time_ms, 0);
    assert_eq!(cues[0].end_time_ms, 2000);
    assert_eq!(cues[0].text, "Hello");
    assert_eq!(cues[1].start_time_ms, 2000);
    assert_eq!(cues[1].text, "World");
    assert_eq!(cues[2].start_time_ms, 5000);
    assert_eq!(cues[2].text, "Done");

    // Cues are renumbered sequentially
    assert_eq!(cues[0].seq_num, 1);
    assert_eq!(cues[2].seq_num, 3);
}

/// Test that a payload without the WEBVTT magic is rejected
#[test]
fn test_parse_webvtt_string_withoutHeader_shouldFail() {
    let payload = "00:00:00.000 --> 00:00:02.000\nHello\n";
    let result = SubtitleCollection::parse_webvtt_string(payload);
    assert!(matches!(result, Err(DecodeError::MissingHeader)));
}

/// Test that the WEBVTT magic must end at a delimiter, not run into text
#[test]
fn test_parse_webvtt_string_withGarbageAfterMagic_shouldFail() {
    let payload = "WEBVTTgarbage\n\n00:00:00.000 --> 00:00:02.000\nHello\n";
    let result = SubtitleCollection::parse_webvtt_string(payload);
    assert!(matches!(result, Err(DecodeError::MissingHeader)));
}

/// Test that header metadata after the magic is accepted
#[test]
fn test_parse_webvtt_string_withHeaderMetadata_shouldParse() {
    let payload = "WEBVTT - Some session\n\n00:00:00.000 --> 00:00:02.000\nHello\n";
    let cues = SubtitleCollection::parse_webvtt_string(payload).unwrap();
    assert_eq!(cues.len(), 1);

    let payload = "WEBVTT\tkind:captions\n\n00:00:00.000 --> 00:00:02.000\nHello\n";
    let cues = SubtitleCollection::parse_webvtt_string(payload).unwrap();
    assert_eq!(cues.len(), 1);
}

/// Test that a malformed timing line is rejected with its line number
#[test]
fn test_parse_webvtt_string_withBadTimingLine_shouldFailWithLine() {
    let payload = "WEBVTT\n\nbroken --> timing\nHello\n";
    match SubtitleCollection::parse_webvtt_string(payload) {
        Err(DecodeError::InvalidTimestamp { line, value }) => {
            assert_eq!(line, 3);
            assert!(value.contains("-->"));
        }
        other => panic!("Expected InvalidTimestamp, got {:?}", other),
    }
}

/// Test that inline markup and entities are stripped from cue text
#[test]
fn test_parse_webvtt_string_withMarkup_shouldStripTags() {
    let payload = "WEBVTT\n\n00:00:00.000 --> 00:00:02.000\n<v Speaker>Hello &amp; welcome</v>\n";
    let cues = SubtitleCollection::parse_webvtt_string(payload).unwrap();

    assert_eq!(cues.len(), 1);
    assert_eq!(cues[0].text, "Hello & welcome");
}

/// Test that NOTE and STYLE blocks are skipped wholesale
#[test]
fn test_parse_webvtt_string_withNoteAndStyleBlocks_shouldSkipThem() {
    let payload = "WEBVTT\n\nNOTE this is a comment\nspanning two lines\n\nSTYLE\n::cue { color: red }\n\n00:00:01.000 --> 00:00:02.000\nActual cue\n";
    let cues = SubtitleCollection::parse_webvtt_string(payload).unwrap();

    assert_eq!(cues.len(), 1);
    assert_eq!(cues[0].text, "Actual cue");
}

/// Test that cue identifiers before timing lines are ignored
#[test]
fn test_parse_webvtt_string_withCueIdentifiers_shouldIgnoreThem() {
    let payload = "WEBVTT\n\nintro-cue\n00:00:00.000 --> 00:00:02.000\nHello\n";
    let cues = SubtitleCollection::parse_webvtt_string(payload).unwrap();

    assert_eq!(cues.len(), 1);
    assert_eq!(cues[0].text, "Hello");
}

/// Test that out-of-order timing is preserved, not re-sorted
#[test]
fn test_parse_webvtt_string_withOutOfOrderCues_shouldPreserveOrder() {
    let payload = "WEBVTT\n\n00:00:05.000 --> 00:00:08.000\nLater\n\n00:00:01.000 --> 00:00:02.000\nEarlier\n";
    let cues = SubtitleCollection::parse_webvtt_string(payload).unwrap();

    assert_eq!(cues.len(), 2);
    assert_eq!(cues[0].text, "Later");
    assert_eq!(cues[1].text, "Earlier");
    assert!(cues[0].start_time_ms > cues[1].start_time_ms);
}

/// Test that a final cue without a trailing blank line is kept
#[test]
fn test_parse_webvtt_string_withoutTrailingBlankLine_shouldKeepLastCue() {
    let payload = "WEBVTT\n\n00:00:00.000 --> 00:00:02.000\nOnly cue";
    let cues = SubtitleCollection::parse_webvtt_string(payload).unwrap();

    assert_eq!(cues.len(), 1);
    assert_eq!(cues[0].text, "Only cue");
}

/// Test that multi-line cue text is joined with newlines
#[test]
fn test_parse_webvtt_string_withMultilineCue_shouldJoinLines() {
    let payload = "WEBVTT\n\n00:00:00.000 --> 00:00:02.000\nFirst line\nSecond line\n";
    let cues = SubtitleCollection::parse_webvtt_string(payload).unwrap();

    assert_eq!(cues[0].text, "First line\nSecond line");
}

/// Test deduplication of repeated (start, text) captions
#[test]
fn test_dedupe_cues_withRepeatedCaptions_shouldDropDuplicates() {
    let cues = vec![
        SubtitleCue::new(1, 0, 2000, "Hello".to_string()),
        SubtitleCue::new(2, 0, 2000, "Hello".to_string()),
        SubtitleCue::new(3, 2000, 4000, "World".to_string()),
    ];

    let deduped = SubtitleCollection::dedupe_cues(cues);
    assert_eq!(deduped.len(), 2);
    assert_eq!(deduped[0].text, "Hello");
    assert_eq!(deduped[1].text, "World");
    assert_eq!(deduped[1].seq_num, 2);
}

/// Test deduplication of rolling captions contained in their successor
#[test]
fn test_dedupe_cues_withRollingCaptions_shouldKeepFullCaption() {
    let cues = vec![
        SubtitleCue::new(1, 0, 1000, "Hello".to_string()),
        SubtitleCue::new(2, 1000, 3000, "Hello and welcome".to_string()),
        SubtitleCue::new(3, 3000, 5000, "Next line".to_string()),
    ];

    let deduped = SubtitleCollection::dedupe_cues(cues);
    assert_eq!(deduped.len(), 2);
    assert_eq!(deduped[0].text, "Hello and welcome");
    assert_eq!(deduped[1].text, "Next line");
}

/// Test that identical timing does not trigger the rolling-caption drop
#[test]
fn test_dedupe_cues_withSameTimingContainment_shouldKeepBoth() {
    let cues = vec![
        SubtitleCue::new(1, 0, 2000, "Hi".to_string()),
        SubtitleCue::new(2, 0, 2000, "Hi there".to_string()),
    ];

    let deduped = SubtitleCollection::dedupe_cues(cues);
    assert_eq!(deduped.len(), 2);
}

/// Test combining HLS sequence payloads into one document
#[test]
fn test_combine_sequences_withMultiplePayloads_shouldStripLaterHeaders() {
    let payloads = vec![
        "WEBVTT\nX-TIMESTAMP-MAP=MPEGTS:0,LOCAL:00:00:00.000\n\n00:00:00.000 --> 00:00:02.000\nHello\n".to_string(),
        "WEBVTT\n\n00:00:02.000 --> 00:00:04.000\nWorld\n".to_string(),
    ];

    let combined = SubtitleCollection::combine_sequences(&payloads);

    // Exactly one WEBVTT magic survives
    assert_eq!(combined.matches("WEBVTT").count(), 1);
    assert!(combined.contains("Hello"));
    assert!(combined.contains("World"));

    // And the result parses as a single document
    let cues = SubtitleCollection::parse_webvtt_string(&combined).unwrap();
    assert_eq!(cues.len(), 2);
}

/// Test canonical WebVTT serialization
#[test]
fn test_to_webvtt_string_withCues_shouldRenderCanonicalDocument() {
    let mut collection = SubtitleCollection::new("test.webvtt".into(), "en".to_string());
    collection.cues.push(SubtitleCue::new(1, 0, 2000, "Hello".to_string()));
    collection.cues.push(SubtitleCue::new(2, 2000, 5000, "World".to_string()));

    let output = collection.to_webvtt_string();
    assert!(output.starts_with("WEBVTT\n\n"));
    assert!(output.contains("00:00:00.000 --> 00:00:02.000"));
    assert!(output.contains("00:00:02.000 --> 00:00:05.000"));

    // Round-trips through the parser
    let cues = SubtitleCollection::parse_webvtt_string(&output).unwrap();
    assert_eq!(cues.len(), 2);
}

/// Test decoding a WebVTT file from disk
#[test]
fn test_parse_webvtt_file_withValidFile_shouldDecode() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_webvtt(&temp_dir.path().to_path_buf(), "session.webvtt")?;

    let collection = SubtitleCollection::parse_webvtt_file(&path, "en")?;
    assert_eq!(collection.cues.len(), 3);
    assert_eq!(collection.language, "en");
    assert_eq!(collection.source_file, path);

    Ok(())
}

/// Test that a header-only file is rejected as cue-less
#[test]
fn test_parse_webvtt_file_withNoCues_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        &temp_dir.path().to_path_buf(),
        "empty.webvtt",
        "WEBVTT\n\n",
    )?;

    let result = SubtitleCollection::parse_webvtt_file(&path, "en");
    assert!(matches!(result, Err(DecodeError::NoCues)));

    Ok(())
}

/// Test writing the collection back to disk
#[test]
fn test_write_to_webvtt_withValidPath_shouldRoundTrip() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("out").join("session.webvtt");

    let mut collection = SubtitleCollection::new(path.clone(), "en".to_string());
    collection.cues.push(SubtitleCue::new(1, 0, 2000, "Hello".to_string()));
    collection.write_to_webvtt(&path)?;

    let reread = SubtitleCollection::parse_webvtt_file(&path, "en")?;
    assert_eq!(reread.cues.len(), 1);
    assert_eq!(reread.cues[0].text, "Hello");

    Ok(())
}

/// Test that a failed subtitle write reports as a storage problem
#[test]
fn test_write_to_webvtt_withBlockedParent_shouldReturnStorageError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    // A file where the parent directory should go
    let blocker = common::create_test_file(&temp_dir.path().to_path_buf(), "out", "in the way")?;
    let path = blocker.join("session.webvtt");

    let mut collection = SubtitleCollection::new(path.clone(), "en".to_string());
    collection.cues.push(SubtitleCue::new(1, 0, 2000, "Hello".to_string()));

    let result = collection.write_to_webvtt(&path);
    assert!(matches!(result, Err(StorageError::CreateDir { .. })));

    Ok(())
}

/// Test transcript extraction for summarization
#[test]
fn test_transcript_withCues_shouldJoinTexts() {
    let mut collection = SubtitleCollection::new("test.webvtt".into(), "en".to_string());
    collection.cues.push(SubtitleCue::new(1, 0, 2000, "Hello".to_string()));
    collection.cues.push(SubtitleCue::new(2, 2000, 5000, "World".to_string()));

    assert_eq!(collection.transcript(), "Hello\nWorld");
}
