//! Context retrieval from the vector-search service
//!
//! Given a user message, fetches a small number of relevant text snippets:
//! the message is embedded via the [`Embedder`], the vector is searched
//! against a Qdrant collection, and a text field is extracted from each
//! result payload. Result ordering follows the service's relevance ranking.
//!
//! Retrieval failure must never abort the turn: every failure path
//! (unreachable service, non-2xx status, malformed payload, empty results)
//! collapses into a sentinel string that the composer embeds as-is.

use crate::config::QdrantConfig;
use crate::error::{BridgechatError, Result};
use crate::providers::Embedder;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// Sentinel used when retrieval fails outright
pub const NO_CONTEXT_SENTINEL: &str = "No context available.";

/// Sentinel used when the search succeeds but yields no usable text
pub const NO_RELEVANT_CONTEXT: &str = "No relevant context found.";

/// Payload field names tried in priority order when extracting snippet text
const TEXT_FIELDS: &[&str] = &["text", "page_content", "content", "body"];

/// Nearest-neighbor search over a vector index
///
/// Returns the raw result payloads in relevance order; text extraction is
/// the retriever's job, not the index's.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Search for the `top_k` nearest payloads to `vector`
    ///
    /// # Errors
    ///
    /// Returns an error if the service is unreachable or responds with a
    /// non-success status or an unparseable body.
    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<serde_json::Value>>;
}

/// Qdrant search client
///
/// Talks to the points-search endpoint of a named collection over HTTP.
pub struct QdrantIndex {
    client: Client,
    config: QdrantConfig,
}

/// Request body for Qdrant points search
#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

impl QdrantIndex {
    /// Create a new Qdrant client
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: QdrantConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.search_timeout_seconds))
            .user_agent("bridgechat/0.2.0")
            .build()
            .map_err(|e| {
                BridgechatError::Config(format!("Failed to create HTTP client: {}", e))
            })?;

        tracing::info!(
            "Initialized Qdrant client: url={}, collection={}",
            config.url,
            config.collection
        );

        Ok(Self { client, config })
    }

    /// The configured collection name
    pub fn collection(&self) -> &str {
        &self.config.collection
    }

    /// Probe service reachability for the health endpoint
    pub async fn healthcheck(&self) -> bool {
        let url = format!("{}/collections", self.config.url);
        let mut request = self.client.get(&url);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("api-key", api_key);
        }

        match request.send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!("Qdrant healthcheck failed: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<serde_json::Value>> {
        let url = format!(
            "{}/collections/{}/points/search",
            self.config.url, self.config.collection
        );

        let mut request = self.client.post(&url).json(&SearchRequest {
            vector,
            limit: top_k,
            with_payload: true,
        });
        if let Some(api_key) = &self.config.api_key {
            request = request.header("api-key", api_key);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!("Qdrant search request failed: {}", e);
            BridgechatError::Retrieval(format!("Search request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!("Qdrant returned {}: {}", status, error_text);
            return Err(BridgechatError::Retrieval(format!(
                "Search service returned {}: {}",
                status, error_text
            ))
            .into());
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            tracing::warn!("Failed to parse Qdrant response: {}", e);
            BridgechatError::Retrieval(format!("Failed to parse search response: {}", e))
        })?;

        let hits = body
            .get("result")
            .and_then(|r| r.as_array())
            .ok_or_else(|| {
                BridgechatError::Retrieval("Search response missing result array".to_string())
            })?;

        let payloads = hits
            .iter()
            .filter_map(|hit| hit.get("payload").cloned())
            .collect::<Vec<_>>();

        tracing::debug!("Qdrant search returned {} payloads", payloads.len());
        Ok(payloads)
    }
}

/// Extract snippet text from one result payload
///
/// Tries the known field names in priority order, taking the first
/// non-empty string.
fn extract_text(payload: &serde_json::Value) -> Option<String> {
    TEXT_FIELDS.iter().find_map(|field| {
        payload
            .get(field)
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.to_string())
    })
}

/// Retrieve relevant context snippets for a user message
///
/// Embeds the message, searches the index, and joins the extracted snippet
/// texts with a paragraph separator. Never returns an error: failures are
/// logged and collapsed into [`NO_CONTEXT_SENTINEL`]; a successful search
/// with no usable text yields [`NO_RELEVANT_CONTEXT`].
pub async fn retrieve(
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    user_text: &str,
    top_k: usize,
) -> String {
    let vector = match embedder.embed(user_text).await {
        Ok(vector) => vector,
        Err(e) => {
            tracing::warn!("Context retrieval skipped, embedding failed: {}", e);
            return NO_CONTEXT_SENTINEL.to_string();
        }
    };

    let payloads = match index.search(&vector, top_k).await {
        Ok(payloads) => payloads,
        Err(e) => {
            tracing::warn!("Context retrieval skipped, search failed: {}", e);
            return NO_CONTEXT_SENTINEL.to_string();
        }
    };

    let snippets: Vec<String> = payloads.iter().filter_map(extract_text).collect();
    if snippets.is_empty() {
        return NO_RELEVANT_CONTEXT.to_string();
    }

    snippets.join("\n\n")
}
