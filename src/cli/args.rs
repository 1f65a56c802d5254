//! CLI argument parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to the per-user config directory)
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Print replies as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the canned scenarios against a fresh system
    Demo,
    /// Start the system and run shorthand commands in order
    Exec {
        /// Commands such as `deposit:1001:50` or `atm:default:status`
        #[arg(required = true, value_name = "COMMAND")]
        commands: Vec<String>
    },
    /// Write the default configuration
    InitConfig {
        /// Destination file (defaults to the per-user config path)
        path: Option<PathBuf>
    }
}
