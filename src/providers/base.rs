//! Model client traits and common request types
//!
//! The orchestrator depends on these traits rather than on a concrete
//! vendor client, which is what makes the turn pipeline testable without a
//! network: tests supply canned implementations, production supplies
//! [`crate::providers::OpenAiProvider`].

use crate::error::Result;
use async_trait::async_trait;

/// A single-turn completion request
///
/// The composer builds the full instruction block (tone rules, retrieved
/// context, recent history) into `system_prompt`; the raw user message
/// rides separately so the API sees a conventional system/user pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Full instruction block for the model
    pub system_prompt: String,
    /// The raw user message
    pub user_message: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Output-length cap in tokens
    pub max_tokens: u32,
}

/// Text-completion client
///
/// # Examples
///
/// ```
/// use bridgechat::providers::{ChatModel, ChatRequest};
/// use bridgechat::error::Result;
/// use async_trait::async_trait;
///
/// struct CannedModel;
///
/// #[async_trait]
/// impl ChatModel for CannedModel {
///     async fn complete(&self, _request: ChatRequest) -> Result<String> {
///         Ok("canned reply".to_string())
///     }
/// }
/// ```
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete a single-turn request
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails or the response carries no
    /// usable text. Callers recover with a sentinel; completion failure is
    /// never fatal to an HTTP turn.
    async fn complete(&self, request: ChatRequest) -> Result<String>;
}

/// Embedding-generation client
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Compute the embedding vector for one input text
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails or returns no vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
