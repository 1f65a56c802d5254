use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::runtime::AskError;

/// Failures returned to a requester as reply values.
///
/// None of these trigger supervision: a frozen account or a malformed command
/// is an answer, not a crash.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BankingError {
    /// Balance-affecting operation on a frozen account
    #[error("Account {account} is frozen: {reason}")]
    Frozen { account: String, reason: String },

    /// Withdrawal or debit larger than the balance
    #[error("Insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: Decimal, requested: Decimal },

    /// No account registered under the given number
    #[error("Account {0} not found")]
    AccountNotFound(String),

    /// Credential or account number mismatch
    #[error("{0}")]
    AuthenticationFailed(String),

    /// Shorthand command that does not parse
    #[error("Invalid {command} command format: {usage}")]
    InvalidCommandFormat { command: String, usage: String },

    /// Amounts must be strictly positive
    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),

    /// Account creation rejected
    #[error("Account creation failed: {0}")]
    AccountCreationFailed(String),

    /// ATM per-transaction ceiling
    #[error("Withdrawal limit of {0} exceeded")]
    WithdrawalLimitExceeded(Decimal),

    /// ATM drawer cannot cover a withdrawal
    #[error("ATM has insufficient cash available")]
    InsufficientAtmCash,

    /// ATM id not registered with the supervisor
    #[error("ATM {0} not found")]
    AtmNotFound(String),

    /// A subsystem is down or did not answer
    #[error("{0} temporarily unavailable")]
    Unavailable(String),

    /// A bounded ask ran out of time
    #[error("{component} did not answer within {timeout_ms} ms")]
    Timeout { component: String, timeout_ms: u64 },

    /// Spawn errors
    #[error("{0}")]
    Spawn(String)
}

impl BankingError {
    pub fn invalid_format(command: &str, usage: &str) -> Self {
        BankingError::InvalidCommandFormat { command: command.to_string(), usage: usage.to_string() }
    }

    pub fn timeout(component: &str, timeout: Duration) -> Self {
        BankingError::Timeout { component: component.to_string(), timeout_ms: timeout.as_millis() as u64 }
    }

    /// Map an infrastructure failure of an ask into a reply value.
    pub fn from_ask(component: &str, err: AskError) -> Self {
        match err {
            AskError::Timeout(timeout) => Self::timeout(component, timeout),
            AskError::Dropped | AskError::Unreachable(_) => BankingError::Unavailable(component.to_string())
        }
    }
}

/// Convert from ractor::SpawnErr
impl From<ractor::SpawnErr> for BankingError {
    fn from(err: ractor::SpawnErr) -> Self {
        BankingError::Spawn(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frozen_message_carries_reason() {
        let err = BankingError::Frozen { account: "1001".to_string(), reason: "audit".to_string() };
        assert_eq!(err.to_string(), "Account 1001 is frozen: audit");
    }

    #[test]
    fn ask_failures_stay_distinguishable() {
        let timeout = BankingError::from_ask("bank", AskError::Timeout(Duration::from_millis(250)));
        assert_eq!(timeout, BankingError::Timeout { component: "bank".to_string(), timeout_ms: 250 });

        let dropped = BankingError::from_ask("bank", AskError::Dropped);
        assert_eq!(dropped.to_string(), "bank temporarily unavailable");
    }
}
