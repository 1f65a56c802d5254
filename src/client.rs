//! Typed client for a running banking system
//!
//! Wraps the supervisor handle with one bounded ask per operation. Requests
//! that cross several actors get a proportionally longer deadline so that the
//! inner asks time out first and report which component was slow.

use std::time::Duration;

use ractor::{ActorRef, RpcReplyPort};
use rust_decimal::Decimal;

use crate::{
    actor::{Supervisor, SupervisorMessage, SystemChildren},
    config::BankingConfig,
    domain::{
        account::{
            AccountCreated, AccountInfo, AccountSummary, AccountType, AuthenticationResponse, CreateAccountRequest
        },
        atm::{AtmRequest, AtmResponse},
        command::{BankCommand, CommandResult},
        error::BankingError,
        fraud::{FraudAlert, FraudStats},
        status::SystemStatus,
        transaction::{Transaction, TransactionStats, TransferRequest, TransferResponse}
    },
    runtime::ask
};

/// Deadline multiple for requests answered behind one inner ask
const RELAYED: u32 = 2;
/// ATM requests make two sequential inner asks (authenticate, then operate)
const ATM_RELAYED: u32 = 3;

#[derive(Clone)]
pub struct BankingClient {
    supervisor:       ActorRef<SupervisorMessage>,
    timeout:          Duration,
    shutdown_timeout: Duration
}

impl BankingClient {
    /// Spawn a complete system and connect to it
    pub async fn start(config: BankingConfig) -> Result<Self, BankingError> {
        let (timeout, shutdown_timeout) = (config.ask_timeout(), config.supervision.shutdown_timeout());
        let supervisor = Supervisor::spawn_system(config).await?;
        Ok(Self { supervisor, timeout, shutdown_timeout })
    }

    /// Connect to an already running supervisor
    pub fn connect(supervisor: ActorRef<SupervisorMessage>, timeout: Duration) -> Self {
        Self { supervisor, timeout, shutdown_timeout: timeout }
    }

    pub fn supervisor(&self) -> &ActorRef<SupervisorMessage> {
        &self.supervisor
    }

    pub async fn create_account(
        &self,
        customer_name: &str,
        account_type: AccountType,
        initial_deposit: Decimal
    ) -> Result<AccountCreated, BankingError> {
        let request = CreateAccountRequest::new(customer_name, account_type, initial_deposit);
        self.request(|reply| SupervisorMessage::CreateAccount { request, reply }, RELAYED).await?
    }

    pub async fn deposit(&self, account_number: &str, amount: Decimal) -> CommandResult {
        self.execute(BankCommand::deposit(account_number, amount)).await
    }

    pub async fn withdraw(&self, account_number: &str, amount: Decimal) -> CommandResult {
        self.execute(BankCommand::withdraw(account_number, amount)).await
    }

    pub async fn balance(&self, account_number: &str) -> CommandResult {
        self.execute(BankCommand::balance(account_number)).await
    }

    pub async fn freeze(&self, account_number: &str, reason: &str) -> CommandResult {
        self.execute(BankCommand::Freeze { account_number: account_number.to_string(), reason: reason.to_string() })
            .await
    }

    pub async fn unfreeze(&self, account_number: &str) -> CommandResult {
        self.execute(BankCommand::Unfreeze { account_number: account_number.to_string() }).await
    }

    pub async fn execute(&self, command: BankCommand) -> CommandResult {
        self.request(|reply| SupervisorMessage::Execute { command, reply }, RELAYED).await?
    }

    /// Run one textual shorthand command
    pub async fn command(&self, text: &str) -> CommandResult {
        let text = text.to_string();
        self.request(|reply| SupervisorMessage::Command { text, reply }, ATM_RELAYED).await?
    }

    pub async fn transfer(
        &self,
        from_account: &str,
        to_account: &str,
        amount: Decimal,
        description: &str
    ) -> Result<TransferResponse, BankingError> {
        let transfer = TransferRequest::new(from_account, to_account, amount).with_description(description);
        self.request(|reply| SupervisorMessage::Transfer { transfer, reply }, RELAYED).await
    }

    pub async fn authenticate(
        &self,
        account_number: &str,
        credential: &str
    ) -> Result<AuthenticationResponse, BankingError> {
        let (account_number, credential) = (account_number.to_string(), credential.to_string());
        self.request(|reply| SupervisorMessage::Authenticate { account_number, credential, reply }, RELAYED).await
    }

    pub async fn account_info(&self, account_number: &str) -> Result<AccountInfo, BankingError> {
        let account_number = account_number.to_string();
        self.request(|reply| SupervisorMessage::GetAccountInfo { account_number, reply }, RELAYED).await?
    }

    pub async fn all_accounts(&self) -> Result<Vec<AccountSummary>, BankingError> {
        self.request(|reply| SupervisorMessage::GetAllAccounts { reply }, RELAYED).await?
    }

    /// The account's own log, oldest first
    pub async fn account_history(&self, account_number: &str) -> Result<Vec<Transaction>, BankingError> {
        let account_number = account_number.to_string();
        self.request(|reply| SupervisorMessage::GetAccountHistory { account_number, reply }, RELAYED).await?
    }

    /// Coordinated transfers touching the account, most recent first
    pub async fn transaction_history(&self, account_number: &str) -> Result<Vec<Transaction>, BankingError> {
        let account_number = account_number.to_string();
        self.request(|reply| SupervisorMessage::GetTransactionHistory { account_number, reply }, RELAYED).await?
    }

    pub async fn transaction(&self, transaction_id: &str) -> Result<Option<Transaction>, BankingError> {
        let transaction_id = transaction_id.to_string();
        self.request(|reply| SupervisorMessage::GetTransaction { transaction_id, reply }, RELAYED).await?
    }

    pub async fn transaction_stats(&self) -> Result<TransactionStats, BankingError> {
        self.request(|reply| SupervisorMessage::GetTransactionStats { reply }, RELAYED).await?
    }

    /// Alerts raised for the account, newest first
    pub async fn fraud_alerts(&self, account_number: &str) -> Result<Vec<FraudAlert>, BankingError> {
        let account_number = account_number.to_string();
        self.request(|reply| SupervisorMessage::GetFraudAlerts { account_number, reply }, RELAYED).await?
    }

    pub async fn fraud_stats(&self) -> Result<FraudStats, BankingError> {
        self.request(|reply| SupervisorMessage::GetFraudStats { reply }, RELAYED).await?
    }

    pub async fn atm_withdraw(
        &self,
        atm_id: Option<&str>,
        account_number: &str,
        credential: &str,
        amount: Decimal
    ) -> Result<AtmResponse, BankingError> {
        self.atm(atm_id, AtmRequest::withdraw(account_number, credential, amount)).await
    }

    pub async fn atm_deposit(
        &self,
        atm_id: Option<&str>,
        account_number: &str,
        credential: &str,
        amount: Decimal
    ) -> Result<AtmResponse, BankingError> {
        self.atm(atm_id, AtmRequest::deposit(account_number, credential, amount)).await
    }

    pub async fn atm_balance_inquiry(
        &self,
        atm_id: Option<&str>,
        account_number: &str,
        credential: &str
    ) -> Result<AtmResponse, BankingError> {
        self.atm(atm_id, AtmRequest::balance_inquiry(account_number, credential)).await
    }

    /// Send a request to an ATM; `None` selects the default ATM
    pub async fn atm(&self, atm_id: Option<&str>, request: AtmRequest) -> Result<AtmResponse, BankingError> {
        let atm_id = atm_id.map(str::to_string);
        self.request(|reply| SupervisorMessage::Atm { atm_id, request, reply }, ATM_RELAYED).await
    }

    pub async fn create_atm(&self, atm_id: &str, location: &str, initial_cash: Option<Decimal>) -> CommandResult {
        let (atm_id, location) = (atm_id.to_string(), location.to_string());
        self.request(|reply| SupervisorMessage::CreateAtm { atm_id, location, initial_cash, reply }, RELAYED).await?
    }

    pub async fn status(&self) -> Result<SystemStatus, BankingError> {
        self.request(|reply| SupervisorMessage::GetStatus { reply }, RELAYED).await
    }

    pub async fn children(&self) -> Result<SystemChildren, BankingError> {
        self.request(|reply| SupervisorMessage::GetChildren { reply }, RELAYED).await
    }

    /// Stop every child and then the supervisor itself
    pub async fn shutdown(self) {
        self.supervisor.cast(SupervisorMessage::Stop).ok();
        self.supervisor.stop_and_wait(None, Some(self.shutdown_timeout)).await.ok();
    }

    async fn request<T, F>(&self, builder: F, scale: u32) -> Result<T, BankingError>
    where
        T: Send + 'static,
        F: FnOnce(RpcReplyPort<T>) -> SupervisorMessage
    {
        ask(&self.supervisor, builder, self.timeout * scale)
            .await
            .map_err(|e| BankingError::from_ask("Banking system", e))
    }
}
