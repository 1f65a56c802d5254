//! Command-line harness for the banking system

pub mod args;
pub mod commands;

pub use args::{Cli, Commands};
