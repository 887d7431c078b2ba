//! Korean → English translation of product names for image prompts.
//!
//! The image model is prompted in English. Translation is best effort: the
//! processor falls back to the original text on any [`TranslateError`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

/// HTTP request timeout for one translation call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Translation API error ({status}): {body}")]
    ApiError { status: u16, body: String },

    #[error("Translation response contained no text")]
    Empty,
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn to_english(&self, text: &str) -> Result<String, TranslateError>;
}

/// Returns the input unchanged. Used when no translation service is set up.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughTranslator;

#[async_trait]
impl Translator for PassthroughTranslator {
    async fn to_english(&self, text: &str) -> Result<String, TranslateError> {
        Ok(text.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct DeeplResponse {
    #[serde(default)]
    translations: Vec<DeeplTranslation>,
}

#[derive(Debug, Deserialize)]
struct DeeplTranslation {
    text: String,
}

/// Client for a DeepL-compatible `/v2/translate` endpoint.
pub struct DeeplTranslator {
    client: reqwest::Client,
    url: String,
    auth_key: String,
}

impl DeeplTranslator {
    pub fn new(url: impl Into<String>, auth_key: impl Into<String>) -> Result<Self, TranslateError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
            auth_key: auth_key.into(),
        })
    }
}

#[async_trait]
impl Translator for DeeplTranslator {
    async fn to_english(&self, text: &str) -> Result<String, TranslateError> {
        let form = [
            ("auth_key", self.auth_key.as_str()),
            ("text", text),
            ("source_lang", "KO"),
            ("target_lang", "EN"),
        ];
        let response = self.client.post(&self.url).form(&form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(TranslateError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: DeeplResponse = response.json().await?;
        parsed
            .translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or(TranslateError::Empty)
    }
}

/// Translate, or log and return `text` unchanged on failure.
pub async fn to_english_or_original(translator: &dyn Translator, text: &str) -> String {
    match translator.to_english(text).await {
        Ok(translated) => translated,
        Err(e) => {
            tracing::warn!(error = %e, "Translation failed, using original text");
            text.to_string()
        }
    }
}
