//! BridgeChat server entrypoint

use bridgechat::cli::Cli;
use bridgechat::config::Config;
use bridgechat::error::Result;
use bridgechat::server;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    let config_path = cli.config.as_deref().unwrap_or("bridgechat.yaml");
    let config = Config::load(config_path, &cli)?;
    config.validate()?;

    tracing::info!(
        "Starting bridgechat: chat_model={}, collection={}",
        config.openai.chat_model,
        config.qdrant.collection
    );

    server::serve(&config).await
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "bridgechat=debug"
    } else {
        "bridgechat=info"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
