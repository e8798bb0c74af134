//! # BridgeChat
//!
//! A stateless workplace-communication coaching service. One HTTP endpoint
//! accepts a chat message plus an opaque signed session token, runs it
//! through safety filters and a small conversational state machine, pulls
//! relevant workplace scenarios from a vector index, composes a reply via a
//! completion API, and hands back the reply together with a re-signed token
//! carrying the updated history.
//!
//! ## Architecture
//!
//! - **safety** / **state**: pure classification, no I/O
//! - **session**: the HMAC-signed token codec that replaces server-side
//!   session storage
//! - **providers** / **retrieval**: HTTP clients for the completion,
//!   embedding, and vector-search services, behind traits
//! - **composer** / **orchestrator**: prompt assembly and the per-request
//!   turn pipeline
//! - **server**: the axum surface

pub mod cli;
pub mod composer;
pub mod config;
pub mod error;
pub mod format;
pub mod orchestrator;
pub mod providers;
pub mod retrieval;
pub mod safety;
pub mod server;
pub mod session;
pub mod state;

pub use config::Config;
pub use error::{BridgechatError, Result};
pub use orchestrator::{TurnOrchestrator, TurnOutcome};
pub use session::{SessionCodec, Turn};
pub use state::Tone;
