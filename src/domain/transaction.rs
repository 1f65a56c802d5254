//! Transactions and the transfer request/response contract

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::constant::EXTERNAL_ACCOUNT;

/// Lifecycle of a transaction; only `Pending` may change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionStatus::Pending => "Pending",
            TransactionStatus::Completed => "Completed",
            TransactionStatus::Failed => "Failed",
            TransactionStatus::Cancelled => "Cancelled"
        };
        f.write_str(label)
    }
}

/// A single movement of money between two accounts (or an account and `EXTERNAL`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id:           String,
    pub from_account: String,
    pub to_account:   String,
    pub amount:       Decimal,
    pub description:  String,
    pub timestamp:    DateTime<Utc>,
    pub status:       TransactionStatus
}

impl Transaction {
    pub fn pending(
        id: impl Into<String>,
        from_account: impl Into<String>,
        to_account: impl Into<String>,
        amount: Decimal,
        description: impl Into<String>
    ) -> Self {
        Self {
            id: id.into(),
            from_account: from_account.into(),
            to_account: to_account.into(),
            amount,
            description: description.into(),
            timestamp: Utc::now(),
            status: TransactionStatus::Pending
        }
    }

    /// A settled entry as recorded in an account's log
    pub fn completed(
        id: Option<String>,
        from_account: impl Into<String>,
        to_account: impl Into<String>,
        amount: Decimal,
        description: impl Into<String>
    ) -> Self {
        let id = id.unwrap_or_else(new_transaction_id);
        let pending = Self::pending(id, from_account, to_account, amount, description);
        Self { status: TransactionStatus::Completed, ..pending }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Move out of `Pending`. Returns false if the transaction was already settled.
    pub fn settle(&mut self, status: TransactionStatus) -> bool {
        if self.status != TransactionStatus::Pending || status == TransactionStatus::Pending {
            return false;
        }
        self.status = status;
        true
    }

    /// Deposits and withdrawals have `EXTERNAL` on one side
    pub fn is_external(&self) -> bool {
        self.from_account == EXTERNAL_ACCOUNT || self.to_account == EXTERNAL_ACCOUNT
    }

    pub fn touches(&self, account_number: &str) -> bool {
        self.from_account == account_number || self.to_account == account_number
    }
}

pub fn new_transaction_id() -> String {
    Uuid::new_v4().to_string()
}

/// Request to move `amount` from one account to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from_account:   String,
    pub to_account:     String,
    pub amount:         Decimal,
    pub description:    String,
    /// Correlation id assigned by the transaction coordinator
    pub transaction_id: Option<String>
}

impl TransferRequest {
    pub fn new(from_account: impl Into<String>, to_account: impl Into<String>, amount: Decimal) -> Self {
        Self {
            from_account: from_account.into(),
            to_account: to_account.into(),
            amount,
            description: "Transfer".to_string(),
            transaction_id: None
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Outcome of a transfer as seen by the requester
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResponse {
    pub success:        bool,
    pub message:        String,
    pub transaction_id: Option<String>
}

impl TransferResponse {
    pub fn succeeded(message: impl Into<String>, transaction_id: Option<String>) -> Self {
        Self { success: true, message: message.into(), transaction_id }
    }

    pub fn failed(message: impl Into<String>, transaction_id: Option<String>) -> Self {
        Self { success: false, message: message.into(), transaction_id }
    }
}

/// Counters kept by the transaction coordinator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionStats {
    pub total:     usize,
    pub completed: usize,
    pub failed:    usize,
    pub pending:   usize
}

impl TransactionStats {
    pub fn tally<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Self {
        let mut stats = Self::default();
        for transaction in transactions {
            stats.total += 1;
            match transaction.status {
                TransactionStatus::Pending => stats.pending += 1,
                TransactionStatus::Completed => stats.completed += 1,
                TransactionStatus::Failed | TransactionStatus::Cancelled => stats.failed += 1
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_only_leaves_pending_once() {
        let mut tx = Transaction::pending("t-1", "1001", "1002", Decimal::from(10), "rent");
        assert!(tx.settle(TransactionStatus::Completed));
        assert!(!tx.settle(TransactionStatus::Failed));
        assert_eq!(tx.status, TransactionStatus::Completed);
    }

    #[test]
    fn settling_back_to_pending_is_rejected() {
        let mut tx = Transaction::pending("t-1", "1001", "1002", Decimal::from(10), "rent");
        assert!(!tx.settle(TransactionStatus::Pending));
        assert_eq!(tx.status, TransactionStatus::Pending);
    }

    #[test]
    fn external_side_marks_deposits_and_withdrawals() {
        let deposit = Transaction::completed(None, EXTERNAL_ACCOUNT, "1001", Decimal::from(5), "Deposit");
        let transfer = Transaction::completed(None, "1001", "1002", Decimal::from(5), "Transfer");
        assert!(deposit.is_external());
        assert!(!transfer.is_external());
        assert!(transfer.touches("1002"));
        assert!(!transfer.touches("1003"));
    }

    #[test]
    fn stats_count_each_status() {
        let mut done = Transaction::pending("t-1", "1001", "1002", Decimal::from(10), "rent");
        done.settle(TransactionStatus::Completed);
        let mut lost = Transaction::pending("t-2", "1001", "1002", Decimal::from(10), "rent");
        lost.settle(TransactionStatus::Failed);
        let open = Transaction::pending("t-3", "1001", "1002", Decimal::from(10), "rent");

        let stats = TransactionStats::tally([&done, &lost, &open]);
        assert_eq!(stats, TransactionStats { total: 3, completed: 1, failed: 1, pending: 1 });
    }
}
