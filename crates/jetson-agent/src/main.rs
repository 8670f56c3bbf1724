//! Remote UCI chess-engine gateway agent.

use clap::Parser;
use jetson_agent::config::{AgentConfig, CliArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliArgs::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = AgentConfig::load(&cli)?;
    jetson_agent::root::run(cli, config).await
}
