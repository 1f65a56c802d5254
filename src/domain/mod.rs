//! Banking domain: plain data and pure rules, no actors

pub mod account;
pub mod atm;
pub mod command;
pub mod constant;
pub mod error;
pub mod fraud;
pub mod status;
pub mod transaction;
