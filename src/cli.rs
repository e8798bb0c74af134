//! Command-line interface definition for BridgeChat
//!
//! This module defines the CLI structure using clap's derive API. The
//! server takes no subcommands; everything is a flag with a config-file
//! fallback.

use clap::Parser;

/// BridgeChat - workplace communication coach chat server
///
/// Serves the chat API backed by an external completion API and a
/// vector-search index for context retrieval.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "bridgechat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override the bind address from config
    #[arg(long)]
    pub host: Option<String>,

    /// Override the port from config
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
