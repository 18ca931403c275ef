//! src/bin/node.rs
//!
//! Binary entry point for the long-running gossiper. Responsible for
//! initializing tracing, resolving configuration, instantiating the main
//! `App`, and running it.

use anyhow::Context;
use clap::Parser;
use peerster::{App, NodeConfig};
use peerster::config::NodeCli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = NodeCli::parse();
    let config = NodeConfig::resolve(cli).context("failed to resolve node configuration")?;

    if let Err(e) = App::new(config)?.run().await {
        tracing::error!(error = %e, "node failed");
        std::process::exit(1);
    }

    Ok(())
}
