/*!
 * Segment building: pairing every subtitle cue with a still frame.
 *
 * This is the heart of the pipeline. Cues go in, exactly one segment per
 * cue comes out, in cue order. A failed frame extraction downgrades its
 * segment to frame-less instead of dropping it; a failed frame save aborts
 * the whole build, since storage trouble means no output can be produced
 * at all.
 */

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, warn};

use crate::errors::StorageError;
use crate::frame_extractor::FrameSource;
use crate::frame_store::FrameStore;
use crate::subtitle_processor::{SubtitleCue, format_timestamp};

/// Default bound on concurrent frame extractions
const DEFAULT_CONCURRENT_EXTRACTIONS: usize = 4;

/// A subtitle cue paired with its extracted video frame.
///
/// `frame_path` is `None` only when extraction for this cue's timestamp
/// failed; the segment itself is never dropped, so the transcript stays
/// complete.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSegment {
    /// Timestamp of the cue's start, which the frame depicts
    pub timestamp_ms: u64,

    /// Transcript text of the cue
    pub text: String,

    /// Saved frame location, None when extraction failed
    pub frame_path: Option<PathBuf>,
}

impl FrameSegment {
    /// Timestamp formatted as HH:MM:SS.mmm, as rendered in headings
    pub fn format_timestamp(&self) -> String {
        format_timestamp(self.timestamp_ms)
    }
}

/// Builds the ordered segment sequence for a cue list
pub struct SegmentBuilder {
    /// Store receiving every extracted frame
    store: FrameStore,

    /// Bound on concurrent extractions
    concurrent_extractions: usize,
}

impl SegmentBuilder {
    /// Create a builder writing frames into the given store
    pub fn new(store: FrameStore) -> Self {
        SegmentBuilder {
            store,
            concurrent_extractions: DEFAULT_CONCURRENT_EXTRACTIONS,
        }
    }

    /// Override the extraction concurrency bound
    pub fn with_concurrency(mut self, concurrent_extractions: usize) -> Self {
        self.concurrent_extractions = concurrent_extractions.max(1);
        self
    }

    /// The store frames are written to
    pub fn store(&self) -> &FrameStore {
        &self.store
    }

    /// Build segments for all cues, in cue order
    pub async fn build<S: FrameSource>(
        &self,
        cues: &[SubtitleCue],
        source: &S,
    ) -> Result<Vec<FrameSegment>, StorageError> {
        self.build_with_progress(cues, source, |_, _| {}).await
    }

    /// Build segments, reporting (done, total) after each cue.
    ///
    /// The representative timestamp per cue is its start time: the frame
    /// must show the moment the line begins, matching the rendered heading.
    /// Extraction runs concurrently up to the configured bound; results are
    /// reassembled strictly by index, never by completion order. The first
    /// `StorageError` aborts the build immediately.
    pub async fn build_with_progress<S: FrameSource>(
        &self,
        cues: &[SubtitleCue],
        source: &S,
        progress_callback: impl Fn(usize, usize) + Clone + Send + 'static,
    ) -> Result<Vec<FrameSegment>, StorageError> {
        if cues.is_empty() {
            return Ok(Vec::new());
        }

        let total = cues.len();
        let processed = AtomicUsize::new(0);

        let mut indexed: Vec<(usize, FrameSegment)> = stream::iter(cues.iter().enumerate())
            .map(|(idx, cue)| {
                let store = &self.store;
                let processed = &processed;
                let progress_callback = progress_callback.clone();

                async move {
                    // 1-based position, also the frame index on disk
                    let position = idx + 1;

                    let frame_path = match source.extract(cue.start_time_ms).await {
                        Ok(image) => Some(store.save(&image, position)?),
                        Err(e) => {
                            warn!(
                                "Frame extraction failed for cue {} at {}: {}",
                                position,
                                format_timestamp(cue.start_time_ms),
                                e
                            );
                            None
                        }
                    };

                    let current = processed.fetch_add(1, Ordering::SeqCst) + 1;
                    progress_callback(current, total);

                    Ok::<(usize, FrameSegment), StorageError>((
                        idx,
                        FrameSegment {
                            timestamp_ms: cue.start_time_ms,
                            text: cue.text.clone(),
                            frame_path,
                        },
                    ))
                }
            })
            .buffer_unordered(self.concurrent_extractions)
            .try_collect()
            .await?;

        // Reassemble in cue order
        indexed.sort_by_key(|(idx, _)| *idx);
        let segments: Vec<FrameSegment> = indexed.into_iter().map(|(_, segment)| segment).collect();

        let frameless = segments.iter().filter(|s| s.frame_path.is_none()).count();
        if frameless > 0 {
            warn!("{frameless} of {total} segments have no frame");
        }
        debug!("Built {} segments from {} cues", segments.len(), total);

        debug_assert_eq!(segments.len(), cues.len());
        Ok(segments)
    }
}
