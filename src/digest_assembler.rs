/*!
 * Digest assembly and markdown rendering.
 *
 * Both operations are pure: `assemble` combines already-computed parts into
 * the final document model and `render` formats it, leaving every byte of
 * I/O to the orchestrator. Translation is applied here, at assembly time,
 * so the segments built earlier stay immutable.
 */

use std::path::{Path, PathBuf};

use crate::file_utils::FileManager;
use crate::segment_builder::FrameSegment;

/// Optional AI-generated content for a digest.
///
/// A tagged variant instead of loose nullable fields: the assembler
/// consumes both shapes uniformly and no call site needs ad hoc null
/// checks.
#[derive(Debug, Clone)]
pub enum Enrichment {
    /// No AI service configured, digest ships transcript-only
    None,

    /// Summary and key points, plus translated texts when the delivered
    /// language differs from the subtitle track
    Enriched {
        /// One-paragraph summary, in the delivered language
        summary: String,

        /// Main session takeaways, in the delivered language
        key_points: Vec<String>,

        /// Replacement texts when translation was requested
        translation: Option<DigestTranslation>,
    },
}

/// Translated replacements applied during assembly
#[derive(Debug, Clone)]
pub struct DigestTranslation {
    /// Language the texts are written in
    pub language: String,

    /// Translated session title
    pub title: String,

    /// Translated segment texts, same order and length as the segments
    pub segment_texts: Vec<String>,
}

/// Output tree locations recorded on the digest
#[derive(Debug, Clone)]
pub struct DigestPaths {
    /// Rendered markdown document
    pub markdown: PathBuf,

    /// Downloaded session video
    pub video: PathBuf,

    /// Combined subtitle track
    pub subtitles: PathBuf,
}

/// The assembled digest, the single externally-visible result object.
///
/// Only ever constructed from a fully-built segment sequence; immutable
/// after construction.
#[derive(Debug, Clone)]
pub struct SessionDigest {
    /// WWDC session identifier
    pub session_id: String,

    /// Session title, translated when translation was requested
    pub title: String,

    /// AI summary; None renders no Summary section
    pub summary: Option<String>,

    /// AI key points; None or empty renders no Key Points section
    pub key_points: Option<Vec<String>>,

    /// One segment per subtitle cue, in cue order
    pub segments: Vec<FrameSegment>,

    /// Rendered markdown document location
    pub markdown_path: PathBuf,

    /// Downloaded video location
    pub video_path: PathBuf,

    /// Combined subtitle track location
    pub subtitle_path: PathBuf,

    /// Language the digest is delivered in
    pub language: String,
}

/// Pure construction and rendering of digests
pub struct DigestAssembler;

impl DigestAssembler {
    /// Assemble the digest model from its finished parts.
    ///
    /// When the enrichment carries a translation, the title and segment
    /// texts are replaced here; timestamps and frame references always come
    /// from the built segments unchanged.
    pub fn assemble(
        session_id: &str,
        title: &str,
        segments: Vec<FrameSegment>,
        enrichment: Enrichment,
        paths: DigestPaths,
        language: &str,
    ) -> SessionDigest {
        let (title, summary, key_points, segments, language) = match enrichment {
            Enrichment::None => (
                title.to_string(),
                None,
                None,
                segments,
                language.to_string(),
            ),
            Enrichment::Enriched {
                summary,
                key_points,
                translation,
            } => {
                let summary = Some(summary).filter(|s| !s.trim().is_empty());
                let key_points = Some(key_points).filter(|points| !points.is_empty());

                match translation {
                    Some(translation) => {
                        debug_assert_eq!(translation.segment_texts.len(), segments.len());
                        let translated = segments
                            .into_iter()
                            .enumerate()
                            .map(|(i, segment)| FrameSegment {
                                text: translation
                                    .segment_texts
                                    .get(i)
                                    .cloned()
                                    .unwrap_or(segment.text),
                                ..segment
                            })
                            .collect();
                        (
                            translation.title,
                            summary,
                            key_points,
                            translated,
                            translation.language,
                        )
                    }
                    None => (
                        title.to_string(),
                        summary,
                        key_points,
                        segments,
                        language.to_string(),
                    ),
                }
            }
        };

        SessionDigest {
            session_id: session_id.to_string(),
            title,
            summary,
            key_points,
            segments,
            markdown_path: paths.markdown,
            video_path: paths.video,
            subtitle_path: paths.subtitles,
            language,
        }
    }

    /// Render a digest to markdown text.
    ///
    /// Sections without content are omitted entirely, never rendered as
    /// empty headings. Frame references are relative to the markdown file
    /// so the output tree can be moved as a whole.
    pub fn render(digest: &SessionDigest) -> String {
        let mut output = String::new();

        output.push_str(&format!("# {}\n\n", digest.title));
        output.push_str(&format!("WWDC Session: {}\n\n", digest.session_id));

        if let Some(summary) = &digest.summary {
            output.push_str("## Summary\n\n");
            output.push_str(summary);
            output.push_str("\n\n");
        }

        if let Some(key_points) = &digest.key_points {
            if !key_points.is_empty() {
                output.push_str("## Key Points\n\n");
                for point in key_points {
                    output.push_str(&format!("- {point}\n"));
                }
                output.push('\n');
            }
        }

        output.push_str("## Transcript with Video Frames\n\n");

        let base = digest.markdown_path.parent().unwrap_or_else(|| Path::new(""));
        let blocks: Vec<String> = digest
            .segments
            .iter()
            .map(|segment| Self::render_segment(segment, base))
            .collect();
        output.push_str(&blocks.join("---\n\n"));

        output
    }

    /// Render one segment block: timestamp heading, text, optional image
    fn render_segment(segment: &FrameSegment, base: &Path) -> String {
        let timestamp = segment.format_timestamp();
        let mut block = String::new();

        block.push_str(&format!("### {timestamp}\n\n"));
        block.push_str(&format!("{}\n\n", segment.text));

        if let Some(frame_path) = &segment.frame_path {
            let relative = FileManager::relative_to(frame_path, base);
            block.push_str(&format!(
                "![Frame at {timestamp}]({})\n\n",
                relative.display()
            ));
        }

        block
    }
}
