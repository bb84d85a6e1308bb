use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{DecodeError, StorageError};

// @module: WebVTT subtitle decoding and combining

// @const: WebVTT timing line regex, hours optional, dot or comma millis
static TIMING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(\d{1,4}):)?(\d{2}):(\d{2})[.,](\d{3})\s+-->\s+(?:(\d{1,4}):)?(\d{2}):(\d{2})[.,](\d{3})",
    )
    .unwrap()
});

// @const: Inline markup tags (<v Speaker>, <c>, timestamps)
static MARKUP_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

// @struct: Single subtitle cue
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleCue {
    // @field: Sequence number
    pub seq_num: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Cue text
    pub text: String,
}

impl SubtitleCue {
    /// Creates a new subtitle cue.
    ///
    /// Zero-duration cues and regressing start times are valid input here;
    /// the decoder hands cues through in file order without re-validation.
    pub fn new(seq_num: usize, start_time_ms: u64, end_time_ms: u64, text: String) -> Self {
        SubtitleCue {
            seq_num,
            start_time_ms,
            end_time_ms,
            text,
        }
    }

    /// Parse a WebVTT timestamp (`HH:MM:SS.mmm` or `MM:SS.mmm`) to milliseconds
    pub fn parse_timestamp(timestamp: &str) -> Result<u64> {
        let trimmed = timestamp.trim();
        let parts: Vec<&str> = trimmed.split(':').collect();

        let (hours, minutes, seconds_part): (u64, u64, &str) = match parts.as_slice() {
            [h, m, s] => (
                h.parse().context("Failed to parse hours")?,
                m.parse().context("Failed to parse minutes")?,
                s,
            ),
            [m, s] => (0, m.parse().context("Failed to parse minutes")?, s),
            _ => return Err(anyhow!("Invalid timestamp format: {}", timestamp)),
        };

        let (seconds, millis) = seconds_part
            .split_once(['.', ','])
            .ok_or_else(|| anyhow!("Missing milliseconds in timestamp: {}", timestamp))?;
        let seconds: u64 = seconds.parse().context("Failed to parse seconds")?;
        let millis: u64 = millis.parse().context("Failed to parse milliseconds")?;

        if minutes >= 60 || seconds >= 60 || millis >= 1000 {
            return Err(anyhow!(
                "Invalid time components in timestamp: {}",
                timestamp
            ));
        }

        Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
    }

    /// Convert start time to a formatted WebVTT timestamp
    pub fn format_start_time(&self) -> String {
        format_timestamp(self.start_time_ms)
    }

    /// Convert end time to a formatted WebVTT timestamp
    pub fn format_end_time(&self) -> String {
        format_timestamp(self.end_time_ms)
    }
}

/// Format a timestamp in milliseconds to WebVTT format (HH:MM:SS.mmm)
pub fn format_timestamp(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;

    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

impl fmt::Display for SubtitleCue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.seq_num)?;
        writeln!(f, "{} --> {}", self.format_start_time(), self.format_end_time())?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Collection of subtitle cues with metadata
#[derive(Debug)]
pub struct SubtitleCollection {
    /// Source filename
    pub source_file: PathBuf,

    /// List of subtitle cues, in decoded order
    pub cues: Vec<SubtitleCue>,

    /// Track language
    pub language: String,
}

impl SubtitleCollection {
    /// Create a new subtitle collection
    pub fn new(source_file: PathBuf, language: String) -> Self {
        SubtitleCollection {
            source_file,
            cues: Vec::new(),
            language,
        }
    }

    /// Decode a WebVTT file into a collection.
    ///
    /// Parses, then removes the duplicate captions that HLS sequence files
    /// repeat across boundaries. Cue order is the file order throughout.
    pub fn parse_webvtt_file<P: AsRef<Path>>(path: P, language: &str) -> Result<Self, DecodeError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let cues = Self::parse_webvtt_string(&content)?;
        let cues = Self::dedupe_cues(cues);
        if cues.is_empty() {
            return Err(DecodeError::NoCues);
        }

        Ok(SubtitleCollection {
            source_file: path.to_path_buf(),
            cues,
            language: language.to_string(),
        })
    }

    /// Parse WebVTT content into subtitle cues.
    ///
    /// Tolerant of NOTE/STYLE/REGION blocks, cue identifiers, inline markup,
    /// and missing blank lines between cues. The cue order of the payload is
    /// preserved exactly; entries are renumbered but never re-sorted, even if
    /// the file carries out-of-order timing.
    pub fn parse_webvtt_string(content: &str) -> Result<Vec<SubtitleCue>, DecodeError> {
        let content = content.trim_start_matches('\u{feff}');
        let mut lines = content.lines();

        // Header block: the WEBVTT magic plus metadata until a blank line.
        // The magic must be followed by end-of-line, space, or tab;
        // "WEBVTTanything" is not a valid signature.
        let header_ok = lines.next().is_some_and(|first| {
            first
                .trim_start()
                .strip_prefix("WEBVTT")
                .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', '\t']))
        });
        if !header_ok {
            return Err(DecodeError::MissingHeader);
        }

        let mut cues = Vec::new();

        // State variables for parsing
        let mut current_start_ms: Option<u64> = None;
        let mut current_end_ms: Option<u64> = None;
        let mut current_text = String::new();
        let mut skipping_block = false;
        let mut line_count = 1;

        let mut finalize =
            |start: &mut Option<u64>, end: &mut Option<u64>, text: &mut String, cues: &mut Vec<SubtitleCue>| {
                if let (Some(start_ms), Some(end_ms)) = (start.take(), end.take()) {
                    let cleaned = text.trim();
                    if cleaned.is_empty() {
                        debug!("Skipping cue with empty text at {}", format_timestamp(start_ms));
                    } else {
                        cues.push(SubtitleCue::new(0, start_ms, end_ms, cleaned.to_string()));
                    }
                }
                text.clear();
            };

        for line in lines {
            line_count += 1;
            let trimmed = line.trim();

            if trimmed.is_empty() {
                finalize(&mut current_start_ms, &mut current_end_ms, &mut current_text, &mut cues);
                skipping_block = false;
                continue;
            }

            if skipping_block {
                continue;
            }

            if trimmed.contains("-->") {
                if current_start_ms.is_some() {
                    // Cue left open by a missing blank separator
                    warn!("Missing blank line before timing line {line_count}");
                }
                finalize(&mut current_start_ms, &mut current_end_ms, &mut current_text, &mut cues);

                match TIMING_REGEX.captures(trimmed) {
                    Some(caps) => {
                        current_start_ms = Some(Self::capture_to_ms(&caps, 1));
                        current_end_ms = Some(Self::capture_to_ms(&caps, 5));
                    }
                    None => {
                        return Err(DecodeError::InvalidTimestamp {
                            line: line_count,
                            value: trimmed.to_string(),
                        });
                    }
                }
                continue;
            }

            if current_start_ms.is_some() {
                // Payload line of the open cue
                let cleaned = Self::strip_markup(trimmed);
                if !current_text.is_empty() {
                    current_text.push('\n');
                }
                current_text.push_str(&cleaned);
                continue;
            }

            // Block-level keywords start a region we ignore wholesale
            if trimmed.starts_with("NOTE")
                || trimmed.starts_with("STYLE")
                || trimmed.starts_with("REGION")
            {
                skipping_block = true;
                continue;
            }

            // Anything else before a timing line is a cue identifier or
            // header metadata (X-TIMESTAMP-MAP, stray WEBVTT magic from
            // naive file concatenation); none of it carries cue content
            debug!("Ignoring non-cue line {}: {}", line_count, trimmed);
        }

        // Add the last cue if the file does not end with a blank line
        finalize(&mut current_start_ms, &mut current_end_ms, &mut current_text, &mut cues);

        // Renumber to sequential order
        for (i, cue) in cues.iter_mut().enumerate() {
            cue.seq_num = i + 1;
        }

        Ok(cues)
    }

    /// Remove the caption repetition HLS subtitle sequences introduce.
    ///
    /// Two artifacts are dropped: captions repeating an already-seen
    /// (start, text) pair, and rolling captions whose text is wholly
    /// contained in the immediately following caption with different timing.
    /// Everything else keeps its relative order; survivors are renumbered.
    pub fn dedupe_cues(cues: Vec<SubtitleCue>) -> Vec<SubtitleCue> {
        let total = cues.len();
        let mut seen: HashSet<(u64, String)> = HashSet::new();
        let mut unique: Vec<SubtitleCue> = Vec::with_capacity(total);

        for cue in cues {
            if seen.insert((cue.start_time_ms, cue.text.clone())) {
                unique.push(cue);
            }
        }

        let mut result: Vec<SubtitleCue> = Vec::with_capacity(unique.len());
        for i in 0..unique.len() {
            if i + 1 < unique.len() {
                let current = &unique[i];
                let next = &unique[i + 1];
                let timing_differs = current.start_time_ms != next.start_time_ms
                    || current.end_time_ms != next.end_time_ms;
                if timing_differs && next.text.contains(current.text.as_str()) {
                    debug!(
                        "Dropping rolling caption at {}: contained in successor",
                        current.format_start_time()
                    );
                    continue;
                }
            }
            result.push(unique[i].clone());
        }

        if result.len() != total {
            debug!("Deduplicated cues: {} -> {}", total, result.len());
        }

        for (i, cue) in result.iter_mut().enumerate() {
            cue.seq_num = i + 1;
        }

        result
    }

    /// Stitch HLS subtitle sequence payloads into one WebVTT document.
    ///
    /// Keeps the first payload's header block and strips the header block of
    /// every following payload, so the result parses as a single file.
    /// Duplicate captions across sequence boundaries are left in; the decode
    /// step removes them.
    pub fn combine_sequences(payloads: &[String]) -> String {
        let mut combined = String::new();

        for (i, payload) in payloads.iter().enumerate() {
            let payload = payload.trim_start_matches('\u{feff}');
            if i == 0 {
                combined.push_str(payload.trim_end());
            } else {
                // Everything up to the first blank line is header
                let body = match payload.split_once("\n\n") {
                    Some((_, body)) => body,
                    None => payload,
                };
                let body = body.trim_end();
                if !body.is_empty() {
                    combined.push_str("\n\n");
                    combined.push_str(body);
                }
            }
        }

        combined.push('\n');
        combined
    }

    /// Render the collection to a canonical WebVTT document
    pub fn to_webvtt_string(&self) -> String {
        let mut output = String::from("WEBVTT\n\n");
        for cue in &self.cues {
            output.push_str(&cue.to_string());
        }
        output
    }

    /// Write the collection to a WebVTT file.
    ///
    /// A failure here is a storage problem, not a decode problem: the cues
    /// were already decoded, only persisting them went wrong.
    pub fn write_to_webvtt<P: AsRef<Path>>(&self, path: P) -> Result<(), StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::CreateDir {
                path: parent.to_path_buf(),
                message: e.to_string(),
            })?;
        }

        fs::write(path, self.to_webvtt_string()).map_err(|e| StorageError::Write {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(())
    }

    /// Full transcript text, one line per cue, for summarization
    pub fn transcript(&self) -> String {
        self.cues
            .iter()
            .map(|cue| cue.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Parse timestamp capture groups to milliseconds, hours group optional
    fn capture_to_ms(caps: &regex::Captures, start_idx: usize) -> u64 {
        let hours: u64 = caps
            .get(start_idx)
            .map_or(0, |m| m.as_str().parse().unwrap_or(0));
        let minutes: u64 = caps
            .get(start_idx + 1)
            .map_or(0, |m| m.as_str().parse().unwrap_or(0));
        let seconds: u64 = caps
            .get(start_idx + 2)
            .map_or(0, |m| m.as_str().parse().unwrap_or(0));
        let millis: u64 = caps
            .get(start_idx + 3)
            .map_or(0, |m| m.as_str().parse().unwrap_or(0));

        (hours * 3600 + minutes * 60 + seconds) * 1000 + millis
    }

    /// Strip inline markup and decode the entities WebVTT payload text carries
    fn strip_markup(line: &str) -> String {
        let without_tags = MARKUP_REGEX.replace_all(line, "");
        without_tags
            .replace("&nbsp;", " ")
            .replace("&lrm;", "")
            .replace("&rlm;", "")
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .trim()
            .to_string()
    }
}

impl fmt::Display for SubtitleCollection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Subtitle Collection")?;
        writeln!(f, "Source: {:?}", self.source_file)?;
        writeln!(f, "Language: {}", self.language)?;
        writeln!(f, "Cues: {}", self.cues.len())?;
        Ok(())
    }
}
