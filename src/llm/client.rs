//! HTTP completion client for hosted LLM APIs.
//!
//! Speaks the Anthropic Messages API and OpenAI-style chat completions
//! (OpenAI, Cerebras, and any compatible server reachable through `base_url`).

use crate::config::LlmConfig;
use crate::llm::TextCompletionService;
use crate::otel::record_llm_usage;
use crate::types::{PipelineError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAI,
    Anthropic,
    Cerebras,
}

impl LlmProvider {
    /// Infer the provider from a model name.
    ///
    /// - `claude-*`, `anthropic*` → Anthropic
    /// - `cerebras:*`, `llama*`, `qwen*` → Cerebras
    /// - anything else → OpenAI
    pub fn from_model(model: &str) -> Self {
        if model.starts_with("claude") || model.starts_with("anthropic") {
            LlmProvider::Anthropic
        } else if model.starts_with("cerebras") || model.starts_with("llama") || model.starts_with("qwen") {
            LlmProvider::Cerebras
        } else {
            LlmProvider::OpenAI
        }
    }

    /// Environment variable holding the API key.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Self::OpenAI => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Cerebras => "CEREBRAS_API_KEY",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAI => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com/v1",
            Self::Cerebras => "https://api.cerebras.ai/v1",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::Cerebras => "cerebras",
        }
    }
}

/// OpenAI chat completion response.
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

/// Anthropic messages response.
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}

/// Completion client for one model.
pub struct LlmClient {
    api_key: Option<String>,
    model: String,
    provider: LlmProvider,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
    client: Client,
}

impl LlmClient {
    /// Create a client from configuration.
    ///
    /// An API key is required unless `base_url` points at a self-hosted server.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::ConfigError` if the key is missing or the HTTP
    /// client cannot be built
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let provider = config.provider();

        if config.api_key.is_none() && config.base_url.is_none() {
            return Err(PipelineError::ConfigError(format!(
                "{} environment variable not set",
                provider.api_key_var()
            )));
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| PipelineError::ConfigError(format!("HTTP client: {}", e)))?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| provider.default_base_url().to_string());

        Ok(Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            provider,
            base_url: base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    /// Model name as sent to the provider (`cerebras:` prefix stripped).
    fn wire_model(&self) -> &str {
        self.model.strip_prefix("cerebras:").unwrap_or(&self.model)
    }

    /// Call an OpenAI-compatible chat completions endpoint.
    async fn call_openai(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&json!({
                "model": self.wire_model(),
                "messages": [
                    {"role": "system", "content": system_prompt},
                    {"role": "user", "content": user_prompt}
                ],
                "temperature": self.temperature,
                "max_tokens": self.max_tokens
            }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let (status, body) = self.send(request).await?;
        if !status.is_success() {
            return Err(classify_status(self.provider, status, &body));
        }
        parse_openai_body(&body)
    }

    /// Call Anthropic API.
    async fn call_anthropic(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let mut request = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("anthropic-version", "2023-06-01")
            .json(&json!({
                "model": self.model,
                "max_tokens": self.max_tokens,
                "system": system_prompt,
                "messages": [
                    {"role": "user", "content": user_prompt}
                ],
                "temperature": self.temperature
            }));
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let (status, body) = self.send(request).await?;
        if !status.is_success() {
            return Err(classify_status(self.provider, status, &body));
        }
        parse_anthropic_body(&body)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<(StatusCode, String)> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        Ok((status, body))
    }

    fn transport_error(&self, e: reqwest::Error) -> PipelineError {
        let message = format!("{} API error: {}", self.provider.as_str(), e);
        if e.is_timeout() || e.is_connect() {
            PipelineError::ServiceUnavailable(message)
        } else {
            PipelineError::GenerationError(message)
        }
    }
}

#[async_trait]
impl TextCompletionService for LlmClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let text = match self.provider {
            LlmProvider::Anthropic => self.call_anthropic(system, user).await?,
            LlmProvider::OpenAI | LlmProvider::Cerebras => self.call_openai(system, user).await?,
        };
        tracing::debug!(provider = self.provider.as_str(), chars = text.len(), "LLM response received");
        Ok(text)
    }

    fn provider(&self) -> &str {
        self.provider.as_str()
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Map a non-success HTTP status to an error.
///
/// 408, 429 and 5xx are transient; every other status is permanent.
fn classify_status(provider: LlmProvider, status: StatusCode, body: &str) -> PipelineError {
    let message = format!("{} API error {}: {}", provider.as_str(), status, body);
    if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
    {
        PipelineError::ServiceUnavailable(message)
    } else {
        PipelineError::GenerationError(message)
    }
}

fn parse_openai_body(body: &str) -> Result<String> {
    let parsed: OpenAIResponse = serde_json::from_str(body)
        .map_err(|e| PipelineError::generation(format!("Failed to parse completion response: {}", e)))?;

    if let Some(usage) = &parsed.usage {
        record_llm_usage(Some(usage.prompt_tokens), Some(usage.completion_tokens));
    }

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| PipelineError::generation("No content in completion response"))
}

fn parse_anthropic_body(body: &str) -> Result<String> {
    let parsed: AnthropicResponse = serde_json::from_str(body)
        .map_err(|e| PipelineError::generation(format!("Failed to parse Anthropic response: {}", e)))?;

    if let Some(usage) = &parsed.usage {
        record_llm_usage(Some(usage.input_tokens), Some(usage.output_tokens));
    }

    let text: String = parsed
        .content
        .into_iter()
        .filter_map(|block| block.text)
        .collect();

    if text.is_empty() {
        return Err(PipelineError::generation("No text in Anthropic response"));
    }
    Ok(text)
}
