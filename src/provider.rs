//! Generation Provider Abstraction
//!
//! Boundary adapter between the recommendation pipeline and an external text
//! generation service (OpenAI-compatible servers, Anthropic). A request is an ordered
//! list of role-tagged messages plus a sampling temperature; the reply is plain text.
//! No business logic lives here.

use crate::error::GenerationServiceError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod anthropic;
pub mod openai;
pub mod profile;
pub mod scripted;

pub use anthropic::AnthropicClient;
pub use openai::OpenAICompatibleClient;
pub use profile::{ProviderConfig, ProviderType};
pub use scripted::{RecordedRequest, ScriptedClient};

/// Model provider selection with its resolved credential
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModelProvider {
    OpenAI {
        model: String,
        api_key: String,
        base_url: Option<String>, // For custom endpoints (e.g., Azure OpenAI)
    },
    Anthropic {
        model: String,
        api_key: String,
        base_url: Option<String>, // Default: https://api.anthropic.com/v1
    },
    Ollama {
        model: String,
        base_url: Option<String>, // Default: http://localhost:11434/v1
    },
    LocalCustom {
        model: String,
        endpoint: String, // Full endpoint URL (e.g., http://localhost:8080/v1)
        api_key: Option<String>,
    },
}

/// Role of one instruction in a generation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageRole {
    System,
    User,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
        }
    }
}

/// One role-tagged instruction. An ordered list of these forms a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageMessage {
    pub role: MessageRole,
    pub content: String,
}

impl StageMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Raw text returned for a single request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationReply {
    /// Reply text with leading and trailing whitespace removed
    pub content: String,
    pub model: String,
    pub finish_reason: Option<String>,
}

impl GenerationReply {
    pub fn new(content: &str, model: impl Into<String>, finish_reason: Option<String>) -> Self {
        Self {
            content: content.trim().to_string(),
            model: model.into(),
            finish_reason,
        }
    }
}

/// Generation service client.
///
/// Each call is one network round trip. Failures surface as
/// [`GenerationServiceError`] and are never swallowed or retried here.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(
        &self,
        messages: Vec<StageMessage>,
        temperature: f32,
    ) -> Result<GenerationReply, GenerationServiceError>;

    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;
}

pub(crate) const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub(crate) const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub(crate) fn build_http_client(
    request_timeout: Duration,
) -> Result<Client, GenerationServiceError> {
    Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .timeout(request_timeout)
        .build()
        .map_err(|e| GenerationServiceError::Provider(format!("Failed to create HTTP client: {}", e)))
}

pub(crate) fn map_transport_error(error: reqwest::Error) -> GenerationServiceError {
    if error.is_timeout() {
        GenerationServiceError::RequestFailed(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        GenerationServiceError::RequestFailed(format!("Connection error: {}", error))
    } else {
        GenerationServiceError::RequestFailed(format!("HTTP error: {}", error))
    }
}

/// Map a non-success status and its body text to a service error kind.
pub(crate) fn map_status_error(status: reqwest::StatusCode, body: &str) -> GenerationServiceError {
    match status.as_u16() {
        401 | 403 => GenerationServiceError::AuthFailed(format!("Authentication failed: {}", body)),
        429 => GenerationServiceError::RateLimited(format!("Rate limit exceeded: {}", body)),
        404 => GenerationServiceError::ModelNotFound(format!("Model not found: {}", body)),
        _ => GenerationServiceError::RequestFailed(format!(
            "Request failed with status {}: {}",
            status, body
        )),
    }
}

/// Provider factory for creating generation clients
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create_client(
        provider: &ModelProvider,
        request_timeout: Duration,
    ) -> Result<Box<dyn GenerationClient>, GenerationServiceError> {
        match provider {
            ModelProvider::OpenAI {
                model,
                api_key,
                base_url,
            } => Ok(Box::new(OpenAICompatibleClient::new(
                "openai",
                model.clone(),
                Some(api_key.clone()),
                base_url
                    .clone()
                    .unwrap_or_else(|| openai::OPENAI_BASE_URL.to_string()),
                request_timeout,
            )?)),
            ModelProvider::Anthropic {
                model,
                api_key,
                base_url,
            } => Ok(Box::new(AnthropicClient::new(
                model.clone(),
                api_key.clone(),
                base_url.clone(),
                request_timeout,
            )?)),
            ModelProvider::Ollama { model, base_url } => Ok(Box::new(OpenAICompatibleClient::new(
                "ollama",
                model.clone(),
                None,
                base_url
                    .clone()
                    .unwrap_or_else(|| openai::OLLAMA_BASE_URL.to_string()),
                request_timeout,
            )?)),
            ModelProvider::LocalCustom {
                model,
                endpoint,
                api_key,
            } => Ok(Box::new(OpenAICompatibleClient::new(
                "local",
                model.clone(),
                api_key.clone(),
                endpoint.clone(),
                request_timeout,
            )?)),
        }
    }
}
