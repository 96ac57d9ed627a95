//! Model Provider Abstraction
//!
//! Transport boundary to the text generation service. The rest of the crate only needs
//! "submit role-tagged messages, receive text, fail with a typed transport error"; the
//! concrete client speaks the OpenAI-compatible chat completions protocol, which covers
//! OpenAI, Groq and most self-hosted servers.

use crate::context::truncate_chars;
use crate::error::TransportError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Upper bound on requested output tokens, whatever the caller asks for.
pub const MAX_OUTPUT_TOKENS: u32 = 9000;

/// Resolved model provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModelProvider {
    OpenAI {
        model: String,
        api_key: String,
        base_url: Option<String>,
    },
    Groq {
        model: String,
        api_key: String,
    },
    LocalCustom {
        model: String,
        endpoint: String,
        api_key: Option<String>,
    },
}

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
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

/// Completion options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: Some(0.6),
            max_tokens: Some(8000),
        }
    }
}

/// Token usage information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub usage: TokenUsage,
    pub finish_reason: Option<String>,
}

/// Model provider client trait
#[async_trait]
pub trait ModelProviderClient: Send + Sync {
    /// Generate a completion from a list of messages
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, TransportError>;

    /// Get the provider name
    fn provider_name(&self) -> &str;

    /// Get the model name
    fn model_name(&self) -> &str;
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    model: Option<String>,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: WireMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

fn role_to_string(role: MessageRole) -> &'static str {
    match role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    }
}

fn map_status(status: u16, detail: String) -> TransportError {
    match status {
        401 | 403 => TransportError::AuthFailed(detail),
        404 => TransportError::ModelNotFound(detail),
        413 => TransportError::PayloadTooLarge(detail),
        429 => TransportError::RateLimited(detail),
        _ => TransportError::RequestFailed(format!("status {}: {}", status, detail)),
    }
}

fn map_http_error(error: reqwest::Error) -> TransportError {
    if let Some(status) = error.status() {
        map_status(status.as_u16(), error.to_string())
    } else if error.is_timeout() {
        TransportError::RequestFailed(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        TransportError::RequestFailed(format!("Connection error: {}", error))
    } else {
        TransportError::RequestFailed(format!("HTTP error: {}", error))
    }
}

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

fn build_provider_http_client(request_timeout: Duration) -> Result<Client, TransportError> {
    Client::builder()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT)
        .timeout(request_timeout)
        .build()
        .map_err(|e| TransportError::NotConfigured(format!("Failed to create HTTP client: {}", e)))
}

/// Transport limits applied by every client.
#[derive(Debug, Clone)]
pub struct TransportSettings {
    /// Messages longer than this are cut and suffixed with `...`.
    pub max_message_chars: usize,
    pub request_timeout: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            max_message_chars: 8000,
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// Client for any OpenAI-compatible chat completions endpoint
pub struct OpenAICompatibleClient {
    client: Client,
    provider_name: String,
    model: String,
    api_key: Option<String>,
    base_url: String,
    max_message_chars: usize,
}

impl OpenAICompatibleClient {
    pub fn new(
        provider_name: &str,
        model: String,
        api_key: Option<String>,
        base_url: String,
        settings: &TransportSettings,
    ) -> Result<Self, TransportError> {
        if model.trim().is_empty() {
            return Err(TransportError::NotConfigured(
                "Model name cannot be empty".to_string(),
            ));
        }
        let client = build_provider_http_client(settings.request_timeout)?;
        Ok(Self {
            client,
            provider_name: provider_name.to_string(),
            model,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_message_chars: settings.max_message_chars,
        })
    }

    fn build_request(&self, messages: Vec<ChatMessage>, options: CompletionOptions) -> ChatCompletionRequest {
        let messages = messages
            .into_iter()
            .map(|msg| WireMessage {
                role: role_to_string(msg.role).to_string(),
                content: Some(truncate_chars(&msg.content, self.max_message_chars)),
            })
            .collect();

        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens.map(|t| t.min(MAX_OUTPUT_TOKENS)),
            stream: false,
        }
    }
}

#[async_trait]
impl ModelProviderClient for OpenAICompatibleClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, TransportError> {
        let request = self.build_request(messages, options);
        let url = format!("{}/chat/completions", self.base_url);
        debug!(
            provider = %self.provider_name,
            model = %self.model,
            message_count = request.messages.len(),
            "Sending chat completion request"
        );

        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request);
        if let Some(api_key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", api_key));
        }
        let response = builder.send().await.map_err(map_http_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(map_status(status, error_text));
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            TransportError::InvalidResponse(format!("Failed to parse response: {}", e))
        })?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| TransportError::InvalidResponse("No choices in response".to_string()))?;
        let content = choice.message.content.unwrap_or_default();
        if content.trim().is_empty() {
            return Err(TransportError::InvalidResponse(
                "Empty response from model".to_string(),
            ));
        }

        let usage = completion
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            content,
            model: completion.model.unwrap_or_else(|| self.model.clone()),
            usage,
            finish_reason: choice.finish_reason,
        })
    }

    fn provider_name(&self) -> &str {
        &self.provider_name
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Provider factory for creating provider clients
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create_client(
        provider: &ModelProvider,
        settings: &TransportSettings,
    ) -> Result<Box<dyn ModelProviderClient>, TransportError> {
        let client = match provider {
            ModelProvider::OpenAI {
                model,
                api_key,
                base_url,
            } => OpenAICompatibleClient::new(
                "openai",
                model.clone(),
                Some(api_key.clone()),
                base_url.clone().unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
                settings,
            )?,
            ModelProvider::Groq { model, api_key } => OpenAICompatibleClient::new(
                "groq",
                model.clone(),
                Some(api_key.clone()),
                GROQ_BASE_URL.to_string(),
                settings,
            )?,
            ModelProvider::LocalCustom {
                model,
                endpoint,
                api_key,
            } => OpenAICompatibleClient::new(
                "local",
                model.clone(),
                api_key.clone(),
                endpoint.clone(),
                settings,
            )?,
        };
        Ok(Box::new(client))
    }
}

/// Scripted provider for unit tests: replays replies in order, then repeats the last one.
#[cfg(test)]
pub struct MockProvider {
    replies: Vec<Result<String, TransportError>>,
    calls: parking_lot::Mutex<Vec<Vec<ChatMessage>>>,
}

#[cfg(test)]
impl MockProvider {
    pub fn new(replies: Vec<Result<String, TransportError>>) -> Self {
        Self {
            replies,
            calls: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn always(reply: &str) -> Self {
        Self::new(vec![Ok(reply.to_string())])
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl ModelProviderClient for MockProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        _options: CompletionOptions,
    ) -> Result<CompletionResponse, TransportError> {
        let index = {
            let mut calls = self.calls.lock();
            calls.push(messages);
            calls.len() - 1
        };
        let reply = self
            .replies
            .get(index)
            .or_else(|| self.replies.last())
            .cloned()
            .unwrap_or_else(|| Ok("Mock response".to_string()))?;
        Ok(CompletionResponse {
            content: reply,
            model: "mock-model".to_string(),
            usage: TokenUsage::default(),
            finish_reason: Some("stop".to_string()),
        })
    }

    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}
