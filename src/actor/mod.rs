//! Actor-based banking system
//!
//! Every account is an isolated actor owned by the bank registry. The
//! supervisor sits at the root and restarts the bank, the transaction
//! coordinator and the ATMs according to its supervision strategy.

pub mod account;
pub mod atm;
pub mod bank;
pub mod coordinator;
pub mod fraud;
pub mod message;
pub mod supervisor;

pub use account::AccountActor;
pub use atm::Atm;
pub use bank::Bank;
pub use coordinator::TransactionCoordinator;
pub use fraud::FraudEngine;
pub use message::*;
pub use supervisor::Supervisor;
