//! Configuration management for BridgeChat
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//!
//! Secrets (API keys, the session signing secret) are never expected in the
//! YAML file; they come from environment variables and override whatever the
//! file contains.

use crate::error::{Result, BridgechatError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for BridgeChat
///
/// This structure holds everything the server needs: bind address, the
/// completion/embedding API settings, the vector-search settings, and the
/// session token parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// OpenAI API configuration (embeddings and chat completions)
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Qdrant vector-search configuration
    #[serde(default)]
    pub qdrant: QdrantConfig,

    /// Session token configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Chat behavior configuration
    #[serde(default)]
    pub chat: ChatConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the server to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5001
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// OpenAI API configuration
///
/// The same API base serves both the embeddings and the chat completions
/// endpoints. `api_base` exists primarily so tests can point the clients at
/// a mock server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key (normally supplied via the OPENAI_API_KEY env var)
    #[serde(default)]
    pub api_key: String,

    /// Base URL for OpenAI endpoints (useful for tests and local mocks)
    #[serde(default = "default_openai_api_base")]
    pub api_base: String,

    /// Chat completion model
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Embedding model
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Sampling temperature for completions
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Output-length cap for completions (tokens)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Timeout for embedding requests (seconds)
    #[serde(default = "default_embedding_timeout")]
    pub embedding_timeout_seconds: u64,

    /// Timeout for completion requests (seconds)
    #[serde(default = "default_completion_timeout")]
    pub completion_timeout_seconds: u64,
}

fn default_openai_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    200
}

fn default_embedding_timeout() -> u64 {
    10
}

fn default_completion_timeout() -> u64 {
    30
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_openai_api_base(),
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            embedding_timeout_seconds: default_embedding_timeout(),
            completion_timeout_seconds: default_completion_timeout(),
        }
    }
}

/// Qdrant vector-search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QdrantConfig {
    /// Qdrant server URL (normally supplied via the QDRANT_URL env var)
    #[serde(default)]
    pub url: String,

    /// Optional API key for hosted Qdrant
    #[serde(default)]
    pub api_key: Option<String>,

    /// Collection to search
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Number of snippets to retrieve per turn
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Timeout for search requests (seconds)
    #[serde(default = "default_search_timeout")]
    pub search_timeout_seconds: u64,
}

fn default_collection() -> String {
    "bridgetext_scenarios".to_string()
}

fn default_top_k() -> usize {
    3
}

fn default_search_timeout() -> u64 {
    10
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: None,
            collection: default_collection(),
            top_k: default_top_k(),
            search_timeout_seconds: default_search_timeout(),
        }
    }
}

/// Session token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Secret used to sign session tokens
    /// (normally supplied via the BRIDGECHAT_SESSION_SECRET env var)
    #[serde(default)]
    pub secret: String,

    /// Token lifetime in hours
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: i64,

    /// Maximum turns per conversation before the limit notice
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
}

fn default_ttl_hours() -> i64 {
    24
}

fn default_max_turns() -> usize {
    10
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            ttl_hours: default_ttl_hours(),
            max_turns: default_max_turns(),
        }
    }
}

/// Chat behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Number of recent turns embedded verbatim into the prompt
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

fn default_history_window() -> usize {
    2
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            openai: OpenAiConfig::default(),
            qdrant: QdrantConfig::default(),
            session: SessionConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a file, environment, and CLI overrides
    ///
    /// The file is optional: when it does not exist the built-in defaults
    /// are used. Environment variables then override secrets and endpoints,
    /// and finally explicit CLI flags override the bind address.
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    /// Parse configuration from a YAML file
    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| BridgechatError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| BridgechatError::Config(format!("Failed to parse config: {}", e)).into())
    }

    /// Apply environment variable overrides
    fn apply_env_vars(&mut self) {
        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            self.openai.api_key = api_key;
        }

        if let Ok(api_base) = std::env::var("OPENAI_API_BASE") {
            self.openai.api_base = api_base;
        }

        if let Ok(url) = std::env::var("QDRANT_URL") {
            self.qdrant.url = url;
        }

        if let Ok(api_key) = std::env::var("QDRANT_API_KEY") {
            self.qdrant.api_key = Some(api_key);
        }

        if let Ok(secret) = std::env::var("BRIDGECHAT_SESSION_SECRET") {
            self.session.secret = secret;
        }

        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            } else {
                tracing::warn!("Ignoring unparseable PORT value: {}", port);
            }
        }
    }

    /// Apply CLI flag overrides
    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(host) = &cli.host {
            self.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error for any value that would make the
    /// server unable to process requests correctly.
    pub fn validate(&self) -> Result<()> {
        if self.openai.api_key.is_empty() {
            return Err(
                BridgechatError::Config("OpenAI API key cannot be empty".to_string()).into(),
            );
        }

        if self.qdrant.url.is_empty() {
            return Err(BridgechatError::Config("Qdrant URL cannot be empty".to_string()).into());
        }

        if self.session.secret.is_empty() {
            return Err(
                BridgechatError::Config("Session secret cannot be empty".to_string()).into(),
            );
        }

        if self.session.secret.len() < 16 {
            return Err(BridgechatError::Config(
                "Session secret must be at least 16 bytes".to_string(),
            )
            .into());
        }

        if self.session.ttl_hours <= 0 {
            return Err(
                BridgechatError::Config("ttl_hours must be greater than 0".to_string()).into(),
            );
        }

        if self.session.max_turns == 0 {
            return Err(
                BridgechatError::Config("max_turns must be greater than 0".to_string()).into(),
            );
        }

        if self.qdrant.top_k == 0 {
            return Err(BridgechatError::Config("top_k must be greater than 0".to_string()).into());
        }

        if self.openai.temperature < 0.0 || self.openai.temperature > 2.0 {
            return Err(BridgechatError::Config(
                "temperature must be between 0.0 and 2.0".to_string(),
            )
            .into());
        }

        if self.openai.max_tokens == 0 {
            return Err(
                BridgechatError::Config("max_tokens must be greater than 0".to_string()).into(),
            );
        }

        Ok(())
    }
}
