//! Error types for BridgeChat
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.
//!
//! The variants mirror the failure taxonomy of the chat pipeline:
//! configuration failures surface as 503 on the next request, validation
//! failures as 400, and everything unexpected as 500. Retrieval, generation,
//! and token failures are recovered locally with sentinel values and never
//! abort an HTTP turn.

use thiserror::Error;

/// Main error type for BridgeChat operations
#[derive(Error, Debug)]
pub enum BridgechatError {
    /// Configuration-related errors (bad config file, missing secrets,
    /// dependency clients that cannot be constructed)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Context retrieval errors (embedding or vector search failed)
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Completion API errors (generation failed or returned garbage)
    #[error("Generation error: {0}")]
    Generation(String),

    /// Session token errors (expired, tampered, malformed)
    #[error("Session token error: {0}")]
    Token(String),

    /// Request validation errors (empty message, oversized payload)
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for BridgeChat operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = BridgechatError::Config("missing session secret".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: missing session secret"
        );
    }

    #[test]
    fn test_retrieval_error_display() {
        let error = BridgechatError::Retrieval("search timed out".to_string());
        assert_eq!(error.to_string(), "Retrieval error: search timed out");
    }

    #[test]
    fn test_generation_error_display() {
        let error = BridgechatError::Generation("completion API returned 500".to_string());
        assert_eq!(
            error.to_string(),
            "Generation error: completion API returned 500"
        );
    }

    #[test]
    fn test_token_error_display() {
        let error = BridgechatError::Token("signature mismatch".to_string());
        assert_eq!(error.to_string(), "Session token error: signature mismatch");
    }

    #[test]
    fn test_validation_error_display() {
        let error = BridgechatError::Validation("message cannot be empty".to_string());
        assert_eq!(
            error.to_string(),
            "Validation error: message cannot be empty"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: BridgechatError = io_error.into();
        assert!(matches!(error, BridgechatError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_str = "{invalid json}";
        let json_error = serde_json::from_str::<serde_json::Value>(json_str).unwrap_err();
        let error: BridgechatError = json_error.into();
        assert!(matches!(error, BridgechatError::Serialization(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_str = "invalid: : yaml";
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>(yaml_str).unwrap_err();
        let error: BridgechatError = yaml_error.into();
        assert!(matches!(error, BridgechatError::Yaml(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BridgechatError>();
    }
}
