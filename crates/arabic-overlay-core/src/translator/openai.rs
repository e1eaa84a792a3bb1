use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::config::Lang;
use crate::error::{Error, Result};
use super::traits::{Translator, TranslatorInfo};

/// Default number of retry attempts
pub const DEFAULT_RETRY_COUNT: u32 = 3;
/// Default delay between retries in milliseconds
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// OpenAI-compatible API translator.
/// Works with: llama.cpp server, Ollama, DeepSeek, OpenAI, etc.
///
/// Batches are translated in a single chat request using a JSON-array
/// protocol: the model receives the inputs as a JSON array and must answer
/// with a JSON array of the same length.
pub struct OpenAiTranslator {
    client: Client,
    /// Base URL for the API (e.g., "http://localhost:8080/v1")
    pub api_base: String,
    /// Optional API key for authentication
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    /// Number of retry attempts
    pub retry_count: u32,
    /// Delay between retries in milliseconds
    pub retry_delay_ms: u64,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

impl OpenAiTranslator {
    /// Create a new OpenAI translator with all options.
    ///
    /// # Panics
    /// Panics if the HTTP client cannot be created, which should only happen
    /// in extreme circumstances (e.g., TLS backend unavailable on the system).
    #[allow(clippy::expect_used)]
    pub fn new(
        api_base: String,
        api_key: Option<String>,
        model: String,
        retry_count: u32,
        retry_delay_ms: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_base,
            api_key,
            model,
            retry_count,
            retry_delay_ms,
        }
    }

    /// Create a new OpenAI translator with default retry settings.
    ///
    /// # Panics
    /// Panics if the HTTP client cannot be created.
    pub fn with_defaults(api_base: String, api_key: Option<String>, model: String) -> Self {
        Self::new(api_base, api_key, model, DEFAULT_RETRY_COUNT, DEFAULT_RETRY_DELAY_MS)
    }

    /// Create the batch translation prompt.
    fn create_prompt(texts: &[String], source: &Lang, target: &Lang) -> String {
        let source_hint = if source.as_str() == "auto" {
            String::new()
        } else {
            format!(" from {}", language_name(source))
        };
        let payload = serde_json::to_string(texts).unwrap_or_else(|_| "[]".to_string());
        format!(
            "Translate each entry of the following JSON array{} into {}. \
             Respond with only a JSON array of exactly {} strings, in the same order. \
             Use an empty string for entries that cannot be translated.\n\n{}",
            source_hint,
            language_name(target),
            texts.len(),
            payload
        )
    }

    /// Parse the model's reply into exactly `expected` translations.
    fn parse_batch(content: &str, expected: usize) -> Result<Vec<String>> {
        let trimmed = content.trim();

        // Models like to wrap JSON in code fences
        let stripped = trimmed
            .strip_prefix("```json")
            .or_else(|| trimmed.strip_prefix("```"))
            .map_or(trimmed, |s| s.strip_suffix("```").unwrap_or(s))
            .trim();

        let translations: Vec<String> = serde_json::from_str(stripped)
            .map_err(|e| Error::TranslationInvalidResponse(format!("Not a JSON array: {e}")))?;

        if translations.len() == expected {
            Ok(translations)
        } else {
            Err(Error::TranslationBatchMismatch {
                expected,
                got: translations.len(),
            })
        }
    }

    /// Make API request with retry logic
    async fn request_with_retry(
        &self,
        texts: &[String],
        source: &Lang,
        target: &Lang,
    ) -> Result<Vec<String>> {
        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));
        let prompt = Self::create_prompt(texts, source, target);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt,
            }],
            temperature: Some(0.3), // Lower temperature for more consistent translations
            max_tokens: None,
        };

        let mut last_error = None;

        for attempt in 0..self.retry_count {
            debug!(
                "Translation batch of {} attempt {}/{} to {}",
                texts.len(),
                attempt + 1,
                self.retry_count,
                url
            );

            let mut req = self.client.post(&url).json(&request);

            // Add API key if configured
            if let Some(ref key) = self.api_key {
                req = req.header("Authorization", format!("Bearer {key}"));
            }

            match req.send().await {
                Ok(response) => {
                    if response.status().is_success() {
                        match response.json::<ChatResponse>().await {
                            Ok(chat_response) => {
                                if let Some(choice) = chat_response.choices.first() {
                                    match Self::parse_batch(&choice.message.content, texts.len()) {
                                        Ok(translations) => return Ok(translations),
                                        Err(e) => {
                                            warn!("Unusable batch response: {}", e);
                                            last_error = Some(e);
                                        }
                                    }
                                } else {
                                    last_error = Some(Error::TranslationInvalidResponse(
                                        "No choices in response".to_string(),
                                    ));
                                }
                            }
                            Err(e) => {
                                warn!("Failed to parse response: {}", e);
                                last_error = Some(Error::TranslationInvalidResponse(e.to_string()));
                            }
                        }
                    } else if response.status().as_u16() == 429 {
                        // Rate limited
                        let retry_after = response
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse().ok());

                        warn!("Rate limited, retry after {:?}s", retry_after);
                        last_error = Some(Error::TranslationRateLimited { retry_after });

                        // Wait longer on rate limit
                        let wait_time = retry_after.unwrap_or(5) * 1000;
                        tokio::time::sleep(Duration::from_millis(wait_time)).await;
                        continue;
                    } else {
                        let status = response.status();
                        let body = response.text().await.unwrap_or_default();
                        warn!("API error: {} - {}", status, body);
                        last_error = Some(Error::TranslationRequest(format!(
                            "HTTP {status}: {body}"
                        )));
                    }
                }
                Err(e) => {
                    warn!("Request failed: {}", e);
                    if e.is_timeout() {
                        last_error = Some(Error::TranslationTimeout);
                    } else {
                        last_error = Some(Error::TranslationRequest(e.to_string()));
                    }
                }
            }

            // Wait before retry
            if attempt < self.retry_count - 1 {
                tokio::time::sleep(Duration::from_millis(self.retry_delay_ms)).await;
            }
        }

        error!("Translation failed after {} attempts", self.retry_count);
        Err(last_error.unwrap_or(Error::TranslationMaxRetriesExceeded))
    }
}

#[async_trait]
impl Translator for OpenAiTranslator {
    fn info(&self) -> TranslatorInfo {
        TranslatorInfo {
            name: "OpenAI Compatible",
            requires_api_key: false, // Optional for local servers
            supports_auto_detect: true,
        }
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        source: &Lang,
        target: &Lang,
    ) -> Result<Vec<String>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // Skip if source and target are the same
        if source.as_str() == target.as_str() && source.as_str() != "auto" {
            return Ok(texts.to_vec());
        }

        self.request_with_retry(texts, source, target).await
    }

    fn is_available(&self) -> bool {
        // For local servers, we don't require an API key
        true
    }
}

/// Convert language code to human-readable name for prompts
fn language_name(lang: &Lang) -> &'static str {
    match lang.as_str() {
        "ar" => "Arabic",
        "en" => "English",
        "fr" => "French",
        "de" => "German",
        "es" => "Spanish",
        "it" => "Italian",
        "pt" => "Portuguese",
        "ru" => "Russian",
        "fa" => "Persian",
        "ur" => "Urdu",
        "he" => "Hebrew",
        "tr" => "Turkish",
        "zh-CN" => "Simplified Chinese",
        "ja" => "Japanese",
        // For unknown languages, the LLM should still understand most ISO codes
        _ => "the specified language",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_name() {
        assert_eq!(language_name(&Lang::new("ar")), "Arabic");
        assert_eq!(language_name(&Lang::new("en")), "English");
        assert_eq!(language_name(&Lang::new("unknown")), "the specified language");
    }

    #[test]
    fn test_parse_batch_plain_array() {
        let parsed = OpenAiTranslator::parse_batch(r#"["a", "b"]"#, 2);
        assert_eq!(parsed.unwrap_or_default(), vec!["a", "b"]);
    }

    #[test]
    fn test_parse_batch_strips_code_fence() {
        let parsed = OpenAiTranslator::parse_batch("```json\n[\"a\"]\n```", 1);
        assert_eq!(parsed.unwrap_or_default(), vec!["a"]);
    }

    #[test]
    fn test_parse_batch_length_mismatch() {
        let parsed = OpenAiTranslator::parse_batch(r#"["a"]"#, 2);
        assert!(matches!(
            parsed,
            Err(Error::TranslationBatchMismatch { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn test_parse_batch_rejects_non_array() {
        let parsed = OpenAiTranslator::parse_batch("not json", 1);
        assert!(matches!(parsed, Err(Error::TranslationInvalidResponse(_))));
    }
}
