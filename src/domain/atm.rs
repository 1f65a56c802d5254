//! ATM drawer bookkeeping and request/response contract

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::error::BankingError;

/// Drawer state of one ATM, mutated only by its owning actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtmState {
    pub id:                String,
    pub location:          String,
    pub cash_available:    Decimal,
    pub transaction_count: u64
}

impl AtmState {
    pub fn new(id: impl Into<String>, location: impl Into<String>, cash_available: Decimal) -> Self {
        Self { id: id.into(), location: location.into(), cash_available, transaction_count: 0 }
    }

    /// Checks done before any remote interaction
    pub fn precheck(&self, operation: &AtmOperation, withdrawal_limit: Decimal) -> Result<(), BankingError> {
        match operation {
            AtmOperation::Withdraw { amount } | AtmOperation::Deposit { amount } if *amount <= Decimal::ZERO => {
                Err(BankingError::InvalidAmount(*amount))
            }
            AtmOperation::Withdraw { amount } if *amount > withdrawal_limit => {
                Err(BankingError::WithdrawalLimitExceeded(withdrawal_limit))
            }
            AtmOperation::Withdraw { amount } if *amount > self.cash_available => {
                Err(BankingError::InsufficientAtmCash)
            }
            _ => Ok(())
        }
    }

    /// Apply a settled operation to the drawer
    pub fn settle(&mut self, operation: &AtmOperation) {
        match operation {
            AtmOperation::Withdraw { amount } => self.cash_available -= *amount,
            AtmOperation::Deposit { amount } => self.cash_available += *amount,
            AtmOperation::BalanceInquiry => {}
        }
    }

    pub fn refill_to(&mut self, amount: Decimal) {
        self.cash_available = amount;
    }

    pub fn refill_by(&mut self, amount: Decimal) {
        self.cash_available += amount;
    }
}

impl fmt::Display for AtmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ATM {} at {} - Cash: {}, Transactions: {}",
            self.id, self.location, self.cash_available, self.transaction_count
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AtmOperation {
    Withdraw { amount: Decimal },
    Deposit { amount: Decimal },
    BalanceInquiry
}

impl AtmOperation {
    pub fn name(&self) -> &'static str {
        match self {
            AtmOperation::Withdraw { .. } => "withdrawal",
            AtmOperation::Deposit { .. } => "deposit",
            AtmOperation::BalanceInquiry => "balance inquiry"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtmRequest {
    pub account_number: String,
    pub credential:     String,
    pub operation:      AtmOperation
}

impl AtmRequest {
    pub fn withdraw(account_number: impl Into<String>, credential: impl Into<String>, amount: Decimal) -> Self {
        Self::new(account_number, credential, AtmOperation::Withdraw { amount })
    }

    pub fn deposit(account_number: impl Into<String>, credential: impl Into<String>, amount: Decimal) -> Self {
        Self::new(account_number, credential, AtmOperation::Deposit { amount })
    }

    pub fn balance_inquiry(account_number: impl Into<String>, credential: impl Into<String>) -> Self {
        Self::new(account_number, credential, AtmOperation::BalanceInquiry)
    }

    fn new(account_number: impl Into<String>, credential: impl Into<String>, operation: AtmOperation) -> Self {
        Self { account_number: account_number.into(), credential: credential.into(), operation }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtmResponse {
    pub success: bool,
    pub message: String,
    pub balance: Option<Decimal>
}

impl AtmResponse {
    pub fn succeeded(operation: &AtmOperation, balance: Decimal) -> Self {
        let mut message = operation.name().to_string();
        if let Some(first) = message.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        Self { success: true, message: format!("{message} successful"), balance: Some(balance) }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into(), balance: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precheck_rejects_over_limit_before_cash() {
        let atm = AtmState::new("default", "Main Branch", Decimal::from(50_000));
        let err = atm.precheck(&AtmOperation::Withdraw { amount: Decimal::from(1500) }, Decimal::from(1000));
        assert!(err.unwrap_err().to_string().contains("limit"));
    }

    #[test]
    fn precheck_rejects_when_drawer_is_short() {
        let atm = AtmState::new("lobby", "Lobby", Decimal::from(200));
        let err = atm.precheck(&AtmOperation::Withdraw { amount: Decimal::from(500) }, Decimal::from(1000));
        assert_eq!(err, Err(BankingError::InsufficientAtmCash));
        assert!(atm.precheck(&AtmOperation::Deposit { amount: Decimal::from(500) }, Decimal::from(1000)).is_ok());
        assert!(atm.precheck(&AtmOperation::BalanceInquiry, Decimal::from(1000)).is_ok());
    }

    #[test]
    fn settle_moves_cash_by_operation() {
        let mut atm = AtmState::new("default", "Main Branch", Decimal::from(1000));
        atm.settle(&AtmOperation::Withdraw { amount: Decimal::from(100) });
        atm.settle(&AtmOperation::Deposit { amount: Decimal::from(300) });
        atm.settle(&AtmOperation::BalanceInquiry);
        assert_eq!(atm.cash_available, Decimal::from(1200));

        atm.refill_to(Decimal::from(50_000));
        atm.refill_by(Decimal::from(5));
        assert_eq!(atm.cash_available, Decimal::from(50_005));
    }

    #[test]
    fn success_message_names_the_operation() {
        let response = AtmResponse::succeeded(&AtmOperation::BalanceInquiry, Decimal::from(7));
        assert_eq!(response.message, "Balance inquiry successful");
        assert_eq!(response.balance, Some(Decimal::from(7)));
    }
}
