//! External model API clients
//!
//! This module defines the traits the orchestrator depends on for text
//! completion and embedding generation, along with the OpenAI
//! implementation of both.

pub mod base;
pub mod openai;

pub use base::{ChatModel, ChatRequest, Embedder};
pub use openai::OpenAiProvider;
