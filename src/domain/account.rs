//! Account state and the rules that mutate it
//!
//! `Account` is plain data plus pure operations; the account actor owns one
//! instance and applies exactly one message at a time to it.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{constant::EXTERNAL_ACCOUNT, error::BankingError, transaction::Transaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    Checking,
    Savings,
    Business
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AccountType::Checking => "Checking",
            AccountType::Savings => "Savings",
            AccountType::Business => "Business"
        };
        f.write_str(label)
    }
}

impl FromStr for AccountType {
    type Err = BankingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "checking" => Ok(AccountType::Checking),
            "savings" => Ok(AccountType::Savings),
            "business" => Ok(AccountType::Business),
            other => Err(BankingError::invalid_format("account type", &format!("unknown type '{other}'")))
        }
    }
}

/// Opaque secret issued at account creation.
///
/// Random v4 token; never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential(String);

impl Credential {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.0 == candidate
    }
}

impl From<&str> for Credential {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(****)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    pub customer_name:   String,
    pub account_type:    AccountType,
    pub initial_deposit: Decimal
}

impl CreateAccountRequest {
    pub fn new(customer_name: impl Into<String>, account_type: AccountType, initial_deposit: Decimal) -> Self {
        Self { customer_name: customer_name.into(), account_type, initial_deposit }
    }

    pub fn validate(&self) -> Result<(), BankingError> {
        if self.customer_name.trim().is_empty() {
            return Err(BankingError::AccountCreationFailed("customer name must not be empty".to_string()));
        }
        if self.initial_deposit.is_sign_negative() {
            return Err(BankingError::AccountCreationFailed(format!(
                "initial deposit {} must not be negative",
                self.initial_deposit
            )));
        }
        Ok(())
    }
}

/// Reply to a successful account creation; the credential is only ever handed out here
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountCreated {
    pub account_number: String,
    pub balance:        Decimal,
    pub credential:     Credential
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationResponse {
    pub success: bool,
    pub message: String
}

impl AuthenticationResponse {
    pub fn accepted() -> Self {
        Self { success: true, message: "Authentication successful".to_string() }
    }

    pub fn rejected() -> Self {
        Self { success: false, message: "Invalid account number or credential".to_string() }
    }
}

/// Point-in-time view of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub account_number: String,
    pub customer_name:  String,
    pub account_type:   AccountType,
    pub balance:        Decimal,
    pub frozen:         bool,
    pub freeze_reason:  Option<String>,
    pub created_at:     DateTime<Utc>
}

/// Directory entry kept by the bank registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub account_number: String,
    pub customer_name:  String,
    pub account_type:   AccountType,
    pub created_at:     DateTime<Utc>
}

/// Which side of a transfer an account plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferSide {
    Debit,
    Credit
}

#[derive(Debug, Clone)]
pub struct Account {
    account_number:  String,
    customer_name:   String,
    account_type:    AccountType,
    balance:         Decimal,
    freeze_reason:   Option<String>,
    created_at:      DateTime<Utc>,
    transaction_log: Vec<Transaction>,
    credential:      Credential
}

impl Account {
    pub fn open(account_number: impl Into<String>, request: &CreateAccountRequest, credential: Credential) -> Self {
        Self {
            account_number: account_number.into(),
            customer_name: request.customer_name.clone(),
            account_type: request.account_type,
            balance: request.initial_deposit,
            freeze_reason: None,
            created_at: Utc::now(),
            transaction_log: Vec::new(),
            credential
        }
    }

    pub fn account_number(&self) -> &str {
        &self.account_number
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn is_frozen(&self) -> bool {
        self.freeze_reason.is_some()
    }

    pub fn history(&self) -> &[Transaction] {
        &self.transaction_log
    }

    pub fn info(&self) -> AccountInfo {
        AccountInfo {
            account_number: self.account_number.clone(),
            customer_name:  self.customer_name.clone(),
            account_type:   self.account_type,
            balance:        self.balance,
            frozen:         self.is_frozen(),
            freeze_reason:  self.freeze_reason.clone(),
            created_at:     self.created_at
        }
    }

    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            account_number: self.account_number.clone(),
            customer_name:  self.customer_name.clone(),
            account_type:   self.account_type,
            created_at:     self.created_at
        }
    }

    pub fn deposit(&mut self, amount: Decimal, description: &str) -> Result<Decimal, BankingError> {
        self.ensure_active(amount)?;
        self.balance += amount;
        self.record(Transaction::completed(None, EXTERNAL_ACCOUNT, self.account_number.clone(), amount, description));
        Ok(self.balance)
    }

    pub fn withdraw(&mut self, amount: Decimal, description: &str) -> Result<Decimal, BankingError> {
        self.ensure_active(amount)?;
        self.ensure_covered(amount)?;
        self.balance -= amount;
        self.record(Transaction::completed(None, self.account_number.clone(), EXTERNAL_ACCOUNT, amount, description));
        Ok(self.balance)
    }

    /// Which leg of `from -> to` this account is responsible for, if any
    pub fn side_of(&self, from_account: &str, to_account: &str) -> Option<TransferSide> {
        if from_account == self.account_number {
            Some(TransferSide::Debit)
        } else if to_account == self.account_number {
            Some(TransferSide::Credit)
        } else {
            None
        }
    }

    /// Outgoing leg of a transfer: a conditional withdrawal
    pub fn debit(
        &mut self,
        to_account: &str,
        amount: Decimal,
        description: &str,
        transaction_id: Option<String>
    ) -> Result<Transaction, BankingError> {
        self.ensure_active(amount)?;
        self.ensure_covered(amount)?;
        self.balance -= amount;
        let transaction =
            Transaction::completed(transaction_id, self.account_number.clone(), to_account, amount, description);
        self.record(transaction.clone());
        Ok(transaction)
    }

    /// Incoming leg of a transfer: a deposit
    pub fn credit(
        &mut self,
        from_account: &str,
        amount: Decimal,
        description: &str,
        transaction_id: Option<String>
    ) -> Result<Transaction, BankingError> {
        self.ensure_active(amount)?;
        self.balance += amount;
        let transaction =
            Transaction::completed(transaction_id, from_account, self.account_number.clone(), amount, description);
        self.record(transaction.clone());
        Ok(transaction)
    }

    pub fn freeze(&mut self, reason: impl Into<String>) -> String {
        let reason = reason.into();
        self.freeze_reason = Some(reason.clone());
        reason
    }

    pub fn unfreeze(&mut self) {
        self.freeze_reason = None;
    }

    pub fn authenticate(&self, account_number: &str, credential: &str) -> bool {
        account_number == self.account_number && self.credential.matches(credential)
    }

    fn ensure_active(&self, amount: Decimal) -> Result<(), BankingError> {
        if let Some(reason) = &self.freeze_reason {
            return Err(BankingError::Frozen { account: self.account_number.clone(), reason: reason.clone() });
        }
        if amount <= Decimal::ZERO {
            return Err(BankingError::InvalidAmount(amount));
        }
        Ok(())
    }

    fn ensure_covered(&self, amount: Decimal) -> Result<(), BankingError> {
        if self.balance < amount {
            return Err(BankingError::InsufficientFunds { balance: self.balance, requested: amount });
        }
        Ok(())
    }

    fn record(&mut self, transaction: Transaction) {
        self.transaction_log.push(transaction);
    }
}
