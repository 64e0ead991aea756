//! [`GeminiGenerator`] — picture-to-poem through the Gemini
//! `generateContent` REST endpoint.
//!
//! All connection details come from [`GeneratorConfig`]; the key travels in
//! the `x-goog-api-key` header rather than the query string so it never
//! shows up in logged URLs.

use async_trait::async_trait;

use crate::camera::CapturedImage;
use crate::config::GeneratorConfig;
use crate::poem::{parse_poem, GenerationError, Poem, PoemGenerator, PromptBuilder};

/// `finishReason` values that mean the output was withheld.
const BLOCKING_FINISH_REASONS: &[&str] = &["SAFETY", "RECITATION", "BLOCKLIST", "PROHIBITED_CONTENT"];

/// Calls `{base_url}/v1beta/models/{model}:generateContent`.
pub struct GeminiGenerator {
    client: reqwest::Client,
    url: String,
    api_key: String,
    prompt: PromptBuilder,
}

impl GeminiGenerator {
    /// Build a generator from config and a resolved API key.
    ///
    /// The HTTP client carries the per-attempt timeout from
    /// `config.timeout_secs`.  A default client is used if the builder fails
    /// (it only fails when the TLS backend cannot initialise).
    pub fn from_config(config: &GeneratorConfig, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );

        Self {
            client,
            url,
            api_key: api_key.into(),
            prompt: PromptBuilder::new(config.prompt.clone()),
        }
    }
}

#[async_trait]
impl PoemGenerator for GeminiGenerator {
    async fn generate(&self, image: &CapturedImage) -> Result<Poem, GenerationError> {
        let body = self.prompt.request_body(image);

        log::debug!("generator: POST {} ({} image bytes)", self.url, image.bytes.len());
        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;

        let poem_text = interpret_response(status, &text)?;
        log::debug!("generator: raw poem {:?}", poem_text);
        parse_poem(&poem_text)
    }
}

/// Pull the poem text out of a `generateContent` response, or classify why
/// there is none.
pub(crate) fn interpret_response(status: u16, body: &str) -> Result<String, GenerationError> {
    let success = (200..300).contains(&status);

    let json: serde_json::Value = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(e) if success => return Err(GenerationError::Malformed(e.to_string())),
        Err(_) => return Err(GenerationError::from_status(status, snippet(body))),
    };

    if let Some(error) = json.get("error") {
        let code = error["code"]
            .as_u64()
            .and_then(|c| u16::try_from(c).ok())
            .unwrap_or(status);
        let message = error["message"].as_str().unwrap_or("unknown error");
        return Err(GenerationError::from_status(code, message));
    }
    if !success {
        return Err(GenerationError::from_status(status, snippet(body)));
    }

    if let Some(reason) = json["promptFeedback"]["blockReason"].as_str() {
        return Err(GenerationError::Blocked(reason.to_string()));
    }

    let candidate = &json["candidates"][0];
    let text: String = candidate["content"]["parts"]
        .as_array()
        .map(|parts| parts.iter().filter_map(|p| p["text"].as_str()).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        if let Some(reason) = candidate["finishReason"].as_str() {
            if BLOCKING_FINISH_REASONS.contains(&reason) {
                return Err(GenerationError::Blocked(reason.to_string()));
            }
        }
        return Err(GenerationError::EmptyPoem);
    }

    Ok(text)
}

fn snippet(body: &str) -> String {
    body.trim().chars().take(200).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
