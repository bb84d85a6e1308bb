/*!
 * Pipeline orchestration for digest creation.
 *
 * Drives the stages in order: fetch the session page and assets, decode
 * the subtitles, build frame segments, enrich, assemble and write. Stage
 * transitions are one-way; a fatal error stops the run and carries the
 * stage it happened in, a frame extraction failure only costs that
 * segment its image.
 */

use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};

use crate::app_config::{Config, DEFAULT_LANGUAGE};
use crate::digest_assembler::{
    DigestAssembler, DigestPaths, DigestTranslation, Enrichment, SessionDigest,
};
use crate::enrichment::EnrichmentService;
use crate::errors::{FetchError, PipelineError, StorageError};
use crate::fetcher::{SessionFetcher, SessionMeta};
use crate::frame_extractor::{FfmpegFrameExtractor, VideoSource};
use crate::frame_store::FrameStore;
use crate::language_utils;
use crate::segment_builder::{FrameSegment, SegmentBuilder};
use crate::subtitle_processor::SubtitleCollection;

// @module: Application controller for digest creation

/// Main application controller for the digest pipeline
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    /// Create a digest for a WWDC session URL.
    ///
    /// Configuration problems are rejected before anything touches the
    /// network or the filesystem. The output tree lands in
    /// `output_dir/wwdc_<session>/`.
    pub async fn create_digest(
        &self,
        url: &str,
        output_dir: &Path,
    ) -> Result<SessionDigest, PipelineError> {
        let start_time = std::time::Instant::now();

        self.config.validate()?;

        let enrichment_service = self
            .config
            .enrichment_enabled()
            .then(|| EnrichmentService::new(&self.config.openai));

        // Stage: fetching
        let fetcher = SessionFetcher::new();
        let meta = fetcher.fetch_metadata(url).await?;
        info!("Session {}: {}", meta.id, meta.title);

        // Translation is load-bearing for the run; verify the AI service
        // answers before committing to a multi-gigabyte download.
        if self.config.wants_translation() {
            if let Some(service) = &enrichment_service {
                info!("Verifying AI service connection");
                service
                    .test_connection()
                    .await
                    .map_err(PipelineError::Preflight)?;
            }
        }

        let session_dir = output_dir.join(format!("wwdc_{}", meta.id));
        std::fs::create_dir_all(&session_dir).map_err(FetchError::from)?;

        let video_path = session_dir.join(format!("{}.mp4", meta.id));
        let subtitle_path = session_dir.join(format!("{}.webvtt", meta.id));
        tokio::try_join!(
            fetcher.fetch_video(&meta, &video_path),
            fetcher.fetch_subtitles(&meta, DEFAULT_LANGUAGE, &subtitle_path),
        )?;

        // Stage: decoding
        info!("Decoding subtitles");
        let subtitles = SubtitleCollection::parse_webvtt_file(&subtitle_path, DEFAULT_LANGUAGE)?;
        // Rewrite the stored track so it matches the deduplicated cues
        // the rest of the pipeline works from.
        subtitles.write_to_webvtt(&subtitle_path)?;
        info!("Decoded {} cues", subtitles.cues.len());

        // Stage: building segments
        let video = VideoSource::open(&video_path)
            .await
            .map_err(PipelineError::VideoOpen)?;
        let store = FrameStore::create(
            session_dir.join("frames"),
            self.config.image.format,
            subtitles.cues.len(),
        )?;
        let extractor = FfmpegFrameExtractor::new(video, self.config.image);
        let builder = SegmentBuilder::new(store);

        info!("Extracting {} frames", subtitles.cues.len());
        let progress_bar =
            Self::stage_progress_bar(subtitles.cues.len() as u64, "Extracting frames");
        let pb = progress_bar.clone();
        let segments = builder
            .build_with_progress(&subtitles.cues, &extractor, move |completed, _total| {
                pb.set_position(completed as u64);
            })
            .await?;
        progress_bar.finish_and_clear();
        info!("Built {} segments", segments.len());

        // Stage: enriching
        let enrichment = match &enrichment_service {
            Some(service) => self.enrich(service, &meta, &subtitles, &segments).await?,
            None => {
                info!("No OpenAI API key configured, skipping summary generation");
                Enrichment::None
            }
        };

        // Stage: assembling
        let markdown_path = session_dir.join(format!("{}_digest.md", meta.id));
        let paths = DigestPaths {
            markdown: markdown_path.clone(),
            video: video_path,
            subtitles: subtitle_path,
        };
        let digest = DigestAssembler::assemble(
            &meta.id,
            &meta.title,
            segments,
            enrichment,
            paths,
            &self.config.language,
        );
        let markdown = DigestAssembler::render(&digest);

        // Stage: writing
        std::fs::write(&markdown_path, &markdown).map_err(|e| {
            PipelineError::Write(StorageError::Write {
                path: markdown_path.clone(),
                message: e.to_string(),
            })
        })?;
        info!("Digest written to {}", markdown_path.display());

        info!("Done in {}", Self::format_duration(start_time.elapsed()));

        Ok(digest)
    }

    /// Run the enrichment stage against the AI service.
    ///
    /// Summary generation is best effort; a failure is logged and the
    /// digest ships without the section. Translation is not: the caller
    /// asked for a language, delivering English instead would be a wrong
    /// result, so its errors abort the run.
    async fn enrich(
        &self,
        service: &EnrichmentService,
        meta: &SessionMeta,
        subtitles: &SubtitleCollection,
        segments: &[FrameSegment],
    ) -> Result<Enrichment, PipelineError> {
        let language = &self.config.language;

        let (summary, key_points) = match service
            .generate_summary(&meta.title, &subtitles.transcript(), language)
            .await
        {
            Ok(session_summary) => (session_summary.summary, session_summary.key_points),
            Err(e) => {
                warn!("Summary generation failed, continuing without: {e}");
                (String::new(), Vec::new())
            }
        };

        let translation = if self.config.wants_translation() {
            info!(
                "Translating {} segments to {}",
                segments.len(),
                language_utils::language_name(language)
            );
            let texts: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();
            let segment_texts = service.translate_texts(&texts, language).await?;
            let title = service.translate_text(&meta.title, language).await?;

            Some(DigestTranslation {
                language: language.clone(),
                title,
                segment_texts,
            })
        } else {
            None
        };

        Ok(Enrichment::Enriched {
            summary,
            key_points,
            translation,
        })
    }

    /// Progress bar in the house style, with template fallback
    fn stage_progress_bar(len: u64, message: &'static str) -> ProgressBar {
        let progress_bar = ProgressBar::new(len);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar.set_message(message);
        progress_bar
    }

    // Format duration in a human-readable format (HH:MM:SS)
    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
