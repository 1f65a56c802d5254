//! # Bank CLI
//!
//! Starts the actor system and drives it from the command line.
//!
//! ```bash
//! # Run every canned scenario
//! bank demo
//!
//! # Run shorthand commands against a fresh system
//! bank exec status deposit:1001:50 atm:default:status
//!
//! # Write the default configuration
//! bank init-config ./bank.yaml
//! ```

use actor_bank::{
    BankingClient,
    cli::{Cli, Commands, commands},
    config
};
use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry().with(env_filter).with(tracing_subscriber::fmt::layer()).init();

    let command = match cli.command {
        Commands::InitConfig { path } => return commands::handle_init_config(path).await,
        command => command
    };

    let config = match &cli.config {
        Some(path) => config::load_config_from(path)?,
        None => config::load_config()?
    };
    let client = BankingClient::start(config).await.context("Failed to start banking system")?;

    let result = match &command {
        Commands::Demo => commands::handle_demo(&client, cli.json).await,
        Commands::Exec { commands: lines } => commands::handle_exec(&client, lines, cli.json).await,
        Commands::InitConfig { .. } => Ok(())
    };

    client.shutdown().await;
    result
}
