/*!
 * WWDC session page scraping and asset download.
 *
 * Resolves a session page URL into its title, video download and subtitle
 * playlist, then pulls the assets into the session directory. Downloads
 * already present on disk are reused, so an interrupted run picks up where
 * it left off. Parsing is kept in pure helpers so it stays testable
 * without a network.
 */

use std::path::Path;
use std::time::Duration;

use futures::{StreamExt, TryStreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::errors::FetchError;
use crate::file_utils::FileManager;
use crate::language_utils::language_codes_match;
use crate::subtitle_processor::SubtitleCollection;

/// Connect timeout; no overall timeout, video downloads run for minutes
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Parallel subtitle sequence fetches per playlist
const CONCURRENT_SEQUENCE_FETCHES: usize = 4;

static MP4_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https://[^"'\s]+?\.mp4"#).unwrap()
});

static PLAYLIST_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https://[^"'\s]+?\.m3u8"#).unwrap()
});

/// Identity and asset locations of a session page after scraping
#[derive(Debug, Clone)]
pub struct SessionMeta {
    /// Session identifier, the last path component of the page URL
    pub id: String,

    /// Session title from page metadata
    pub title: String,

    /// Direct video download URL
    pub video_url: String,

    /// Master playlist carrying the subtitle tracks, when the page has one
    pub webvtt_url: Option<String>,
}

/// Check that a URL points at a WWDC session page.
///
/// Accepts http(s) URLs on developer.apple.com whose path goes through
/// /videos/play/; everything else is rejected before any network traffic.
/// Returns the parsed URL together with the session identifier.
pub fn validate_session_url(url: &str) -> Result<(Url, String), FetchError> {
    let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FetchError::InvalidUrl(url.to_string()));
    }
    if parsed.host_str() != Some("developer.apple.com") {
        return Err(FetchError::InvalidUrl(url.to_string()));
    }
    if !parsed.path().starts_with("/videos/play/") {
        return Err(FetchError::InvalidUrl(url.to_string()));
    }

    let session_id = parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
        .filter(|id| *id != "play")
        .map(str::to_string)
        .ok_or_else(|| FetchError::InvalidUrl(url.to_string()))?;

    Ok((parsed, session_id))
}

/// Scrape title and asset URLs out of a session page.
///
/// The title comes from og:title metadata with the document title as
/// fallback; when the page carries neither, the session identifier stands
/// in. Among the video links, an `_hd` variant wins over the first match.
pub fn parse_session_page(
    page_url: &Url,
    session_id: &str,
    html: &str,
) -> Result<SessionMeta, FetchError> {
    let title = scrape_title(html).unwrap_or_else(|| session_id.to_string());

    let mp4_urls: Vec<&str> = MP4_URL_REGEX
        .find_iter(html)
        .map(|m| m.as_str())
        .collect();
    let video_url = mp4_urls
        .iter()
        .find(|u| u.contains("_hd"))
        .or_else(|| mp4_urls.first())
        .map(|u| u.to_string())
        .ok_or_else(|| FetchError::MissingAsset {
            url: page_url.to_string(),
            asset: "video download link".to_string(),
        })?;

    let webvtt_url = PLAYLIST_URL_REGEX
        .find(html)
        .map(|m| m.as_str().to_string());

    debug!("Session {session_id}: video {video_url}, playlist {webvtt_url:?}");

    Ok(SessionMeta {
        id: session_id.to_string(),
        title,
        video_url,
        webvtt_url,
    })
}

/// Pull the session title from og:title, falling back to the document title
fn scrape_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let og_title = Selector::parse(r#"meta[property="og:title"]"#).ok()?;
    if let Some(element) = document.select(&og_title).next() {
        if let Some(content) = element.value().attr("content") {
            let content = content.trim();
            if !content.is_empty() {
                return Some(content.to_string());
            }
        }
    }

    let title = Selector::parse("title").ok()?;
    document
        .select(&title)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Pick the URI of the subtitle track for a language from a master playlist.
///
/// Falls back to the first subtitle track when no language matches.
pub fn select_subtitle_track(master_playlist: &str, language: &str) -> Option<String> {
    let mut fallback = None;

    for line in master_playlist.lines() {
        let line = line.trim();
        if !line.starts_with("#EXT-X-MEDIA:") {
            continue;
        }
        if playlist_attribute(line, "TYPE").as_deref() != Some("SUBTITLES") {
            continue;
        }
        let Some(uri) = playlist_attribute(line, "URI") else {
            continue;
        };

        let track_language = playlist_attribute(line, "LANGUAGE").unwrap_or_default();
        if language_codes_match(&track_language, language) {
            return Some(uri);
        }
        if fallback.is_none() {
            fallback = Some(uri);
        }
    }

    fallback
}

/// Sequence URIs of a media playlist, in playlist order
pub fn parse_media_playlist(media_playlist: &str) -> Vec<String> {
    media_playlist
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// One `KEY=value` attribute from an M3U8 tag line, unquoting quoted values
fn playlist_attribute(line: &str, key: &str) -> Option<String> {
    let marker = format!("{key}=");
    let start = line.find(&marker)? + marker.len();
    let rest = &line[start..];

    if let Some(quoted) = rest.strip_prefix('"') {
        quoted.split_once('"').map(|(value, _)| value.to_string())
    } else {
        rest.split(',').next().map(str::to_string)
    }
}

/// HTTP client for session pages and their assets
pub struct SessionFetcher {
    /// Shared client, connect timeout only
    client: Client,
}

impl SessionFetcher {
    /// Create a new fetcher
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .user_agent(concat!("wwdcdigest/", env!("CARGO_PKG_VERSION")))
                .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Fetch and scrape the session page into its metadata
    pub async fn fetch_metadata(&self, url: &str) -> Result<SessionMeta, FetchError> {
        let (page_url, session_id) = validate_session_url(url)?;

        info!("Fetching session page {page_url}");
        let html = self.fetch_text(page_url.as_str()).await?;

        parse_session_page(&page_url, &session_id, &html)
    }

    /// Download the session video to `dest`, streaming to disk.
    ///
    /// A file already at `dest` is reused without touching the network. The
    /// transfer goes through a `.part` file so an aborted run never leaves a
    /// truncated video behind to be mistaken for a finished one.
    pub async fn fetch_video(&self, meta: &SessionMeta, dest: &Path) -> Result<(), FetchError> {
        if FileManager::file_exists(dest) {
            info!("Video already downloaded: {}", dest.display());
            return Ok(());
        }

        info!("Downloading video for session {}", meta.id);
        let response = self
            .client
            .get(&meta.video_url)
            .send()
            .await
            .map_err(|e| FetchError::RequestFailed {
                url: meta.video_url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: meta.video_url.clone(),
                status: status.as_u16(),
            });
        }

        let total_bytes = response.content_length().unwrap_or(0);
        let progress_bar = ProgressBar::new(total_bytes);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {bytes}/{total_bytes} {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar.set_message("Downloading video");

        let part_path = dest.with_extension("part");
        let mut file = tokio::fs::File::create(&part_path).await?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::RequestFailed {
                url: meta.video_url.clone(),
                message: e.to_string(),
            })?;
            file.write_all(&chunk).await?;
            progress_bar.inc(chunk.len() as u64);
        }
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&part_path, dest).await?;
        progress_bar.finish_and_clear();
        info!("Video saved to {}", dest.display());

        Ok(())
    }

    /// Download and combine the session subtitles to `dest`.
    ///
    /// Walks master playlist to subtitle track to sequence files, fetches
    /// the sequences in playlist order and writes one combined WebVTT
    /// payload. A file already at `dest` is reused.
    pub async fn fetch_subtitles(
        &self,
        meta: &SessionMeta,
        language: &str,
        dest: &Path,
    ) -> Result<(), FetchError> {
        if FileManager::file_exists(dest) {
            info!("Subtitles already downloaded: {}", dest.display());
            return Ok(());
        }

        let playlist_url = meta
            .webvtt_url
            .as_deref()
            .ok_or_else(|| FetchError::MissingAsset {
                url: meta.video_url.clone(),
                asset: "subtitle playlist".to_string(),
            })?;

        info!("Downloading subtitles for session {}", meta.id);
        let master = self.fetch_text(playlist_url).await?;

        let track_uri = select_subtitle_track(&master, language).ok_or_else(|| {
            FetchError::MissingAsset {
                url: playlist_url.to_string(),
                asset: "subtitle track".to_string(),
            }
        })?;
        let track_url = resolve_playlist_uri(playlist_url, &track_uri)?;

        let media = self.fetch_text(track_url.as_str()).await?;
        let sequence_urls = parse_media_playlist(&media)
            .into_iter()
            .map(|uri| resolve_playlist_uri(track_url.as_str(), &uri))
            .collect::<Result<Vec<_>, _>>()?;
        if sequence_urls.is_empty() {
            return Err(FetchError::MissingAsset {
                url: track_url.to_string(),
                asset: "subtitle sequences".to_string(),
            });
        }

        debug!("Fetching {} subtitle sequences", sequence_urls.len());
        let payloads: Vec<String> = futures::stream::iter(sequence_urls)
            .map(|url| async move { self.fetch_text(url.as_str()).await })
            .buffered(CONCURRENT_SEQUENCE_FETCHES)
            .try_collect()
            .await?;

        let combined = SubtitleCollection::combine_sequences(&payloads);
        tokio::fs::write(dest, combined).await?;
        info!("Subtitles saved to {}", dest.display());

        Ok(())
    }

    /// GET a URL and return its body as text
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::RequestFailed {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| FetchError::RequestFailed {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

impl Default for SessionFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve a possibly-relative playlist URI against the playlist it came from
fn resolve_playlist_uri(base: &str, uri: &str) -> Result<Url, FetchError> {
    let base_url = Url::parse(base).map_err(|e| FetchError::RequestFailed {
        url: base.to_string(),
        message: format!("unparseable playlist URL: {e}"),
    })?;
    base_url.join(uri).map_err(|e| FetchError::RequestFailed {
        url: uri.to_string(),
        message: format!("unresolvable playlist URI: {e}"),
    })
}
