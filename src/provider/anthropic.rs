//! Anthropic messages API client.

use super::{
    build_http_client, map_status_error, map_transport_error, GenerationClient, GenerationReply,
    MessageRole, StageMessage,
};
use crate::error::GenerationServiceError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 2048;

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    model: String,
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

pub struct AnthropicClient {
    client: Client,
    model: String,
    api_key: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(
        model: String,
        api_key: String,
        base_url: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, GenerationServiceError> {
        let client = build_http_client(request_timeout)?;
        Ok(Self {
            client,
            model,
            api_key,
            base_url: base_url
                .unwrap_or_else(|| ANTHROPIC_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

#[async_trait]
impl GenerationClient for AnthropicClient {
    async fn generate(
        &self,
        messages: Vec<StageMessage>,
        temperature: f32,
    ) -> Result<GenerationReply, GenerationServiceError> {
        // The system instruction travels outside the message list.
        let system: Vec<String> = messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.clone())
            .collect();
        let turns: Vec<_> = messages
            .into_iter()
            .filter(|m| m.role == MessageRole::User)
            .map(|m| json!({"role": "user", "content": m.content}))
            .collect();

        // Anthropic caps temperature at 1.0.
        let mut body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "temperature": temperature.min(1.0),
            "messages": turns,
        });
        if !system.is_empty() {
            body["system"] = json!(system.join("\n\n"));
        }

        let url = format!("{}/messages", self.base_url);
        debug!(provider = "anthropic", model = %self.model, %url, "Sending messages request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(map_status_error(status, &error_text));
        }

        let completion: MessagesResponse = response.json().await.map_err(|e| {
            GenerationServiceError::Provider(format!("Failed to parse response: {}", e))
        })?;

        if completion.content.is_empty() {
            return Err(GenerationServiceError::Provider(
                "No content blocks in response".to_string(),
            ));
        }
        let text: String = completion
            .content
            .iter()
            .map(|block| block.text.as_str())
            .collect();

        Ok(GenerationReply::new(
            &text,
            completion.model,
            completion.stop_reason,
        ))
    }

    fn provider_name(&self) -> &str {
        "anthropic"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
