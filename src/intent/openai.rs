//! OpenAI Extractor Implementation
//!
//! Calls the chat-completions endpoint in JSON mode and parses the reply
//! against the `ProductIntent` contract.

use super::{ChatTurn, ExtractorError, IntentExtractor, ProductIntent};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Low temperature keeps the filter extraction deterministic; the contract
/// is a handful of short fields, so a small completion cap is plenty.
const TEMPERATURE: f32 = 0.2;
const MAX_TOKENS: u32 = 300;

/// Intent extractor backed by the OpenAI chat-completions API.
pub struct OpenAiExtractor {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl OpenAiExtractor {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: OPENAI_API_URL.to_string(),
            client,
        }
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// Point at a different endpoint (test servers).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    response_format: ResponseFormat,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[async_trait]
impl IntentExtractor for OpenAiExtractor {
    async fn extract(&self, history: &[ChatTurn]) -> Result<ProductIntent, ExtractorError> {
        let request = ChatRequest {
            model: &self.model,
            messages: history,
            response_format: ResponseFormat { format_type: "json_object" },
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ExtractorError::Api { status: status.as_u16(), message });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExtractorError::Contract(format!("invalid completion envelope: {e}")))?;

        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| ExtractorError::Contract("completion had no choices".into()))?;

        serde_json::from_str(content)
            .map_err(|e| ExtractorError::Contract(format!("intent JSON did not match contract: {e}")))
    }
}
