//! # Actor Bank
//!
//! A banking core built on the actor model with Ractor.
//!
//! This crate provides:
//! - Isolated account actors owned by a bank registry
//! - Chained, lock-free transfers tracked by a transaction coordinator
//! - Streaming fraud detection that freezes suspicious accounts
//! - ATM gateways with cash-drawer bookkeeping
//! - A supervisor that restarts failed components within a budget

pub mod actor;
pub mod cli;
pub mod client;
pub mod config;
pub mod domain;
pub mod runtime;

pub use client::BankingClient;
pub use config::BankingConfig;
pub use domain::error::BankingError;
