//! Application configuration
//!
//! YAML-backed settings for timeouts, ATM limits, fraud thresholds and
//! supervision budgets. Every field has a default.

pub mod settings;

pub use settings::*;
