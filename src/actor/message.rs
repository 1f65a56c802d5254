//! Typed messages for actor communication

use std::collections::HashMap;

use ractor::{ActorRef, Message, RpcReplyPort};
use rust_decimal::Decimal;

use crate::domain::{
    account::{AccountCreated, AccountInfo, AccountSummary, AuthenticationResponse, CreateAccountRequest},
    atm::{AtmRequest, AtmResponse},
    command::{AtmCommand, BankCommand, CommandResult},
    error::BankingError,
    fraud::{FraudAlert, FraudStats},
    status::SystemStatus,
    transaction::{Transaction, TransactionStats, TransferRequest, TransferResponse}
};

/// Messages for the Supervisor actor (root of the actor system)
#[derive(Debug)]
pub enum SupervisorMessage {
    /// Spawn the bank, the coordinator and the default ATM
    Start { reply: RpcReplyPort<Result<(), BankingError>> },
    /// Tear every child down; the supervisor itself stays alive
    Stop,
    /// Parse and run one shorthand command
    Command { text: String, reply: RpcReplyPort<CommandResult> },
    Execute { command: BankCommand, reply: RpcReplyPort<CommandResult> },
    CreateAccount { request: CreateAccountRequest, reply: RpcReplyPort<Result<AccountCreated, BankingError>> },
    Transfer { transfer: TransferRequest, reply: RpcReplyPort<TransferResponse> },
    Authenticate { account_number: String, credential: String, reply: RpcReplyPort<AuthenticationResponse> },
    GetAccountInfo { account_number: String, reply: RpcReplyPort<Result<AccountInfo, BankingError>> },
    GetAllAccounts { reply: RpcReplyPort<Result<Vec<AccountSummary>, BankingError>> },
    /// Everything an account recorded, oldest first
    GetAccountHistory { account_number: String, reply: RpcReplyPort<Result<Vec<Transaction>, BankingError>> },
    /// Transfers touching an account, most recent first
    GetTransactionHistory { account_number: String, reply: RpcReplyPort<Result<Vec<Transaction>, BankingError>> },
    GetTransaction { transaction_id: String, reply: RpcReplyPort<Result<Option<Transaction>, BankingError>> },
    GetTransactionStats { reply: RpcReplyPort<Result<TransactionStats, BankingError>> },
    GetFraudAlerts { account_number: String, reply: RpcReplyPort<Result<Vec<FraudAlert>, BankingError>> },
    GetFraudStats { reply: RpcReplyPort<Result<FraudStats, BankingError>> },
    CreateAtm {
        atm_id:       String,
        location:     String,
        initial_cash: Option<Decimal>,
        reply:        RpcReplyPort<CommandResult>
    },
    /// ATM request; `None` targets the default ATM
    Atm { atm_id: Option<String>, request: AtmRequest, reply: RpcReplyPort<AtmResponse> },
    GetStatus { reply: RpcReplyPort<SystemStatus> },
    GetChildren { reply: RpcReplyPort<SystemChildren> },
    /// Reported by the bank for every transfer it routes
    TransferRouted(TransferRequest),
    TransferCompleted(Transaction),
    TransferFailed { transaction_id: String, reason: String }
}

/// Messages for the Bank registry actor
#[derive(Debug)]
pub enum BankMessage {
    CreateAccount { request: CreateAccountRequest, reply: RpcReplyPort<Result<AccountCreated, BankingError>> },
    Execute { command: BankCommand, reply: RpcReplyPort<CommandResult> },
    /// Shorthand limited to account commands
    Command { text: String, reply: RpcReplyPort<CommandResult> },
    Transfer { transfer: TransferRequest, reply: RpcReplyPort<TransferResponse> },
    Authenticate { account_number: String, credential: String, reply: RpcReplyPort<AuthenticationResponse> },
    GetAccountInfo { account_number: String, reply: RpcReplyPort<Result<AccountInfo, BankingError>> },
    GetAccountHistory { account_number: String, reply: RpcReplyPort<Result<Vec<Transaction>, BankingError>> },
    GetAllAccounts { reply: RpcReplyPort<Vec<AccountSummary>> },
    GetFraudAlerts { account_number: String, reply: RpcReplyPort<Result<Vec<FraudAlert>, BankingError>> },
    GetFraudStats { reply: RpcReplyPort<Result<FraudStats, BankingError>> },
    /// A settled debit, reported by the source account
    MonitorTransaction(Transaction),
    /// Raised by the fraud engine
    FraudDetected(FraudAlert)
}

/// Messages for one Account actor
#[derive(Debug)]
pub enum AccountMessage {
    Deposit { amount: Decimal, description: String, reply: RpcReplyPort<CommandResult> },
    Withdraw { amount: Decimal, description: String, reply: RpcReplyPort<CommandResult> },
    GetBalance { reply: RpcReplyPort<CommandResult> },
    GetAccountInfo { reply: RpcReplyPort<Result<AccountInfo, BankingError>> },
    /// One leg of a transfer. The debit leg carries the credit side's handle.
    Transfer {
        transfer:     TransferRequest,
        counterparty: Option<ActorRef<AccountMessage>>,
        reply:        RpcReplyPort<TransferResponse>
    },
    /// Fraud enforcement freezes without waiting for an answer
    Freeze { reason: String, reply: Option<RpcReplyPort<CommandResult>> },
    Unfreeze { reply: RpcReplyPort<CommandResult> },
    Authenticate { account_number: String, credential: String, reply: RpcReplyPort<AuthenticationResponse> },
    GetHistory { reply: RpcReplyPort<Result<Vec<Transaction>, BankingError>> }
}

/// Messages for the Transaction coordinator actor
#[derive(Debug)]
pub enum CoordinatorMessage {
    Transfer { transfer: TransferRequest, reply: RpcReplyPort<TransferResponse> },
    /// Outcome of a delegated transfer, matched by id
    TransferSettled { transaction_id: String, response: TransferResponse },
    GetTransactionHistory { account_number: String, reply: RpcReplyPort<Vec<Transaction>> },
    GetTransaction { transaction_id: String, reply: RpcReplyPort<Option<Transaction>> },
    GetStats { reply: RpcReplyPort<TransactionStats> },
    BankChanged(Option<ActorRef<BankMessage>>)
}

/// Messages for the Fraud engine actor
#[derive(Debug)]
pub enum FraudMessage {
    Monitor(Transaction),
    GetAlerts { account_number: String, reply: RpcReplyPort<Vec<FraudAlert>> },
    GetStats { reply: RpcReplyPort<FraudStats> }
}

/// Messages for one ATM actor
#[derive(Debug)]
pub enum AtmMessage {
    Request { request: AtmRequest, reply: RpcReplyPort<AtmResponse> },
    Command { command: AtmCommand, reply: RpcReplyPort<CommandResult> },
    BankChanged(Option<ActorRef<BankMessage>>)
}

/// Live child handles of a supervisor
#[derive(Debug, Clone)]
pub struct SystemChildren {
    pub bank:        Option<ActorRef<BankMessage>>,
    pub coordinator: Option<ActorRef<CoordinatorMessage>>,
    pub atms:        HashMap<String, ActorRef<AtmMessage>>
}

// Implement Message trait for Ractor
impl Message for SupervisorMessage {}
impl Message for BankMessage {}
impl Message for AccountMessage {}
impl Message for CoordinatorMessage {}
impl Message for FraudMessage {}
impl Message for AtmMessage {}
