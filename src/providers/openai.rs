//! OpenAI client for embeddings and chat completions
//!
//! Implements both [`ChatModel`] and [`Embedder`] over the OpenAI HTTP API.
//! Timeouts are bounded per call (10s for embeddings, 30s for completions
//! by default) and no retries are performed: a timeout or error is a
//! terminal failure for that call, and the caller falls back to a sentinel.

use crate::config::OpenAiConfig;
use crate::error::{BridgechatError, Result};
use crate::providers::{ChatModel, ChatRequest, Embedder};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OpenAI API client
///
/// One client instance serves both the embeddings endpoint and the chat
/// completions endpoint; the base URL is configurable so tests can point it
/// at a mock server.
///
/// # Examples
///
/// ```no_run
/// use bridgechat::config::OpenAiConfig;
/// use bridgechat::providers::{ChatModel, ChatRequest, OpenAiProvider};
///
/// # async fn example() -> bridgechat::error::Result<()> {
/// let config = OpenAiConfig {
///     api_key: "sk-test".to_string(),
///     ..Default::default()
/// };
/// let provider = OpenAiProvider::new(config)?;
/// let reply = provider
///     .complete(ChatRequest {
///         system_prompt: "You are a coach.".to_string(),
///         user_message: "My boss micromanages me".to_string(),
///         temperature: 0.7,
///         max_tokens: 200,
///     })
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
}

/// Request body for the embeddings endpoint
#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

/// Response from the embeddings endpoint
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

/// One embedding record
#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Request body for the chat completions endpoint
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

/// Message structure on the completions wire
#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Response from the chat completions endpoint
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

/// One completion choice
#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

/// Assistant message inside a completion choice
#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiProvider {
    /// Create a new OpenAI client
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent("bridgechat/0.2.0")
            .build()
            .map_err(|e| {
                BridgechatError::Config(format!("Failed to create HTTP client: {}", e))
            })?;

        tracing::info!(
            "Initialized OpenAI client: chat_model={}, embedding_model={}",
            config.chat_model,
            config.embedding_model
        );

        Ok(Self { client, config })
    }

    /// The configured chat model name
    pub fn chat_model(&self) -> &str {
        &self.config.chat_model
    }

    /// The configured embedding model name
    pub fn embedding_model(&self) -> &str {
        &self.config.embedding_model
    }

    /// Probe API reachability for the health endpoint
    ///
    /// A cheap GET against the models listing; any 2xx counts as ready.
    pub async fn healthcheck(&self) -> bool {
        let url = format!("{}/models", self.config.api_base);
        let result = self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .timeout(Duration::from_secs(self.config.embedding_timeout_seconds))
            .send()
            .await;

        match result {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!("OpenAI healthcheck failed: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl Embedder for OpenAiProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/embeddings", self.config.api_base);
        tracing::debug!("Requesting embedding for {} chars", text.len());

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .timeout(Duration::from_secs(self.config.embedding_timeout_seconds))
            .json(&EmbeddingRequest {
                model: &self.config.embedding_model,
                input: text,
            })
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Embedding request failed: {}", e);
                BridgechatError::Retrieval(format!("Embedding request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!("Embedding API returned {}: {}", status, error_text);
            return Err(BridgechatError::Retrieval(format!(
                "Embedding API returned {}: {}",
                status, error_text
            ))
            .into());
        }

        let embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            tracing::warn!("Failed to parse embedding response: {}", e);
            BridgechatError::Retrieval(format!("Failed to parse embedding response: {}", e))
        })?;

        let vector = embedding_response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| BridgechatError::Retrieval("Embedding response was empty".to_string()))?;

        if vector.is_empty() {
            return Err(
                BridgechatError::Retrieval("Embedding vector was empty".to_string()).into(),
            );
        }

        tracing::debug!("Received embedding with {} dimensions", vector.len());
        Ok(vector)
    }
}

#[async_trait]
impl ChatModel for OpenAiProvider {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.api_base);

        let completion_request = CompletionRequest {
            model: &self.config.chat_model,
            messages: vec![
                WireMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                WireMessage {
                    role: "user",
                    content: &request.user_message,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        tracing::debug!(
            "Sending completion request: model={}, temperature={}, max_tokens={}",
            self.config.chat_model,
            request.temperature,
            request.max_tokens
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .timeout(Duration::from_secs(self.config.completion_timeout_seconds))
            .json(&completion_request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Completion request failed: {}", e);
                BridgechatError::Generation(format!("Completion request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Completion API returned {}: {}", status, error_text);
            return Err(BridgechatError::Generation(format!(
                "Completion API returned {}: {}",
                status, error_text
            ))
            .into());
        }

        let completion: CompletionResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse completion response: {}", e);
            BridgechatError::Generation(format!("Failed to parse completion response: {}", e))
        })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| {
                BridgechatError::Generation("Completion response carried no text".to_string())
            })?;

        Ok(content)
    }
}
