/*!
 * AI enrichment of a digest: summary, key points, and translation.
 *
 * Wraps the OpenAI provider with the two prompts the digest needs. The
 * summary is generated directly in the target language; translation runs
 * one request per text with bounded concurrency, reassembling results by
 * index so output order always matches input order.
 */

use futures::{StreamExt, TryStreamExt, stream};
use log::{debug, info};
use serde::Deserialize;

use crate::app_config::OpenAIConfig;
use crate::errors::ServiceError;
use crate::language_utils;
use crate::providers::openai::{OpenAI, OpenAIRequest};

/// Summary generation temperature, slightly creative
const SUMMARY_TEMPERATURE: f32 = 0.7;

/// Translation temperature, close to deterministic
const TRANSLATION_TEMPERATURE: f32 = 0.3;

/// JSON payload the summary prompt asks the model for
#[derive(Debug, Deserialize)]
struct SummaryPayload {
    summary: String,
    #[serde(default)]
    key_points: Vec<String>,
}

/// Summary and key points, in the requested language
#[derive(Debug, Clone)]
pub struct SessionSummary {
    /// One-paragraph session summary
    pub summary: String,

    /// Main points of the session
    pub key_points: Vec<String>,
}

/// Service running summary and translation requests
pub struct EnrichmentService {
    client: OpenAI,
    model: String,
    concurrent_requests: usize,
}

impl EnrichmentService {
    /// Create a service from the OpenAI configuration
    pub fn new(config: &OpenAIConfig) -> Self {
        EnrichmentService {
            client: OpenAI::new(&config.api_key, &config.endpoint, config.timeout_secs),
            model: config.model.clone(),
            concurrent_requests: config.concurrent_requests.max(1),
        }
    }

    /// Verify the service answers before committing to a run that needs it
    pub async fn test_connection(&self) -> Result<(), ServiceError> {
        self.client.test_connection(&self.model).await
    }

    /// Generate a summary and key points for a session transcript.
    ///
    /// The model is asked for a strict JSON object so the answer parses
    /// without scraping prose.
    pub async fn generate_summary(
        &self,
        title: &str,
        transcript: &str,
        language: &str,
    ) -> Result<SessionSummary, ServiceError> {
        let language_name = language_utils::language_name(language);
        info!("Generating session summary in {language_name}");

        let system_prompt = format!(
            "You are a technical writer summarizing Apple developer conference sessions. \
             Respond with a JSON object containing a \"summary\" string (one concise paragraph) \
             and a \"key_points\" array of short strings covering the main takeaways. \
             Write both in {language_name}."
        );
        let user_prompt = format!("Session title: {title}\n\nTranscript:\n{transcript}");

        let request = OpenAIRequest::new(&self.model)
            .add_message("system", system_prompt)
            .add_message("user", user_prompt)
            .temperature(SUMMARY_TEMPERATURE)
            .json_response();

        let response = self.client.complete(request).await?;
        let text = OpenAI::extract_text_from_response(&response);
        if text.trim().is_empty() {
            return Err(ServiceError::EmptyResponse);
        }

        let payload: SummaryPayload = serde_json::from_str(&text)
            .map_err(|e| ServiceError::ParseError(format!("summary JSON: {e}")))?;
        if payload.summary.trim().is_empty() {
            return Err(ServiceError::EmptyResponse);
        }

        Ok(SessionSummary {
            summary: payload.summary.trim().to_string(),
            key_points: payload
                .key_points
                .into_iter()
                .map(|point| point.trim().to_string())
                .filter(|point| !point.is_empty())
                .collect(),
        })
    }

    /// Translate a single text into the target language
    pub async fn translate_text(
        &self,
        text: &str,
        language: &str,
    ) -> Result<String, ServiceError> {
        let language_name = language_utils::language_name(language);

        let system_prompt = format!(
            "You are a technical translator specializing in developer documentation. \
             Translate the user's text to {language_name}. Keep technical terms, API names \
             and product names unchanged, and answer with the translation only."
        );

        let request = OpenAIRequest::new(&self.model)
            .add_message("system", system_prompt)
            .add_message("user", text)
            .temperature(TRANSLATION_TEMPERATURE);

        let response = self.client.complete(request).await?;
        let translated = OpenAI::extract_text_from_response(&response);
        if translated.trim().is_empty() {
            return Err(ServiceError::EmptyResponse);
        }

        Ok(translated.trim().to_string())
    }

    /// Translate a list of texts, preserving order.
    ///
    /// Requests run with bounded concurrency and are reassembled by index;
    /// the first failure aborts the whole batch since a partially translated
    /// digest must never be emitted.
    pub async fn translate_texts(
        &self,
        texts: &[String],
        language: &str,
    ) -> Result<Vec<String>, ServiceError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        info!(
            "Translating {} texts to {}",
            texts.len(),
            language_utils::language_name(language)
        );

        let mut indexed: Vec<(usize, String)> = stream::iter(texts.iter().enumerate())
            .map(|(idx, text)| async move {
                let translated = self.translate_text(text, language).await?;
                debug!("Translated text {} of {}", idx + 1, texts.len());
                Ok::<(usize, String), ServiceError>((idx, translated))
            })
            .buffer_unordered(self.concurrent_requests)
            .try_collect()
            .await?;

        indexed.sort_by_key(|(idx, _)| *idx);
        Ok(indexed.into_iter().map(|(_, text)| text).collect())
    }
}
