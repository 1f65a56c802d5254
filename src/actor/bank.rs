//! Bank Actor - account registry and command router
//!
//! The bank owns the account directory and is the only actor allowed to create
//! or forget accounts:
//! - Spawns one linked `AccountActor` per account and watches it
//! - Routes commands to the matching account, keeping the requester as reply target
//! - Starts transfers on the source account and reports them to its owner
//! - Supervises the fraud engine and freezes accounts it flags

use std::collections::HashMap;

use ractor::{Actor, ActorId, ActorProcessingErr, ActorRef, RpcReplyPort, SpawnErr, SupervisionEvent};
use tracing::{Level, event};

use crate::{
    actor::{
        account::{AccountActor, AccountArgs},
        fraud::FraudEngine,
        message::{AccountMessage, BankMessage, FraudMessage, SupervisorMessage}
    },
    config::BankingConfig,
    domain::{
        account::{Account, AccountCreated, AccountSummary, AuthenticationResponse, CreateAccountRequest, Credential},
        command::{BankCommand, CommandResult, ShorthandCommand},
        constant::bank,
        error::BankingError,
        fraud::FraudAlert,
        transaction::{TransferRequest, TransferResponse}
    },
    runtime::{ChildExit, RestartBudget, SupervisionStrategy, ask, child_exit, child_name, respond}
};

const BANK_COMMANDS_USAGE: &str = "deposit, withdraw, balance, freeze or unfreeze";

pub struct BankArgs {
    pub config: BankingConfig,
    /// Notified of every routed transfer
    pub owner:  Option<ActorRef<SupervisorMessage>>
}

struct AccountEntry {
    actor:   ActorRef<AccountMessage>,
    summary: AccountSummary
}

/// Bank Actor State - the account directory and the fraud engine handle
pub struct BankState {
    config:           BankingConfig,
    owner:            Option<ActorRef<SupervisorMessage>>,
    accounts:         HashMap<String, AccountEntry>,
    /// Reverse index used when an account actor terminates
    account_ids:      HashMap<ActorId, String>,
    last_number:      u64,
    account_strategy: SupervisionStrategy,
    fraud_engine:     Option<ActorRef<FraudMessage>>,
    fraud_budget:     RestartBudget,
    fraud_generation: u32
}

/// Bank Actor - the "branch" that knows every account
pub struct Bank;

#[async_trait::async_trait]
impl Actor for Bank {
    type Arguments = BankArgs;
    type Msg = BankMessage;
    type State = BankState;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        BankArgs { config, owner }: Self::Arguments
    ) -> Result<Self::State, ActorProcessingErr> {
        event!(Level::DEBUG, event = bank::BANK_STARTED, name = ?myself.get_name());

        let supervision = &config.supervision;
        let mut state = BankState {
            owner,
            accounts: HashMap::new(),
            account_ids: HashMap::new(),
            last_number: config.accounts.number_floor,
            account_strategy: AccountActor::strategy(supervision),
            fraud_engine: None,
            fraud_budget: RestartBudget::new(supervision.max_retries, Some(supervision.retry_window())),
            fraud_generation: 0,
            config
        };
        Self::spawn_fraud_engine(&myself, &mut state).await?;

        Ok(state)
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State
    ) -> Result<(), ActorProcessingErr> {
        match message {
            BankMessage::CreateAccount { request, reply } => {
                let created = self.handle_create_account(&myself, request, state).await;
                respond(reply, created, bank::REPLY_FAILED);
            }
            BankMessage::Execute { command, reply } => self.route_command(command, reply, state),
            BankMessage::Command { text, reply } => match text.parse::<ShorthandCommand>() {
                Ok(ShorthandCommand::Bank(command)) => self.route_command(command, reply, state),
                Ok(_) => {
                    let err = BankingError::invalid_format("bank", BANK_COMMANDS_USAGE);
                    event!(Level::INFO, event = bank::COMMAND_REJECTED, command = %text, error = %err);
                    respond(reply, Err(err), bank::REPLY_FAILED);
                }
                Err(err) => {
                    event!(Level::INFO, event = bank::COMMAND_REJECTED, command = %text, error = %err);
                    respond(reply, Err(err), bank::REPLY_FAILED);
                }
            },
            BankMessage::Transfer { transfer, reply } => self.route_transfer(transfer, reply, state),
            BankMessage::Authenticate { account_number, credential, reply } => {
                match state.accounts.get(&account_number) {
                    Some(entry) => {
                        Self::forward(&entry.actor, AccountMessage::Authenticate { account_number, credential, reply })
                    }
                    None => respond(reply, AuthenticationResponse::rejected(), bank::REPLY_FAILED)
                }
            }
            BankMessage::GetAccountInfo { account_number, reply } => match state.accounts.get(&account_number) {
                Some(entry) => Self::forward(&entry.actor, AccountMessage::GetAccountInfo { reply }),
                None => respond(reply, Err(BankingError::AccountNotFound(account_number)), bank::REPLY_FAILED)
            },
            BankMessage::GetAccountHistory { account_number, reply } => match state.accounts.get(&account_number) {
                Some(entry) => Self::forward(&entry.actor, AccountMessage::GetHistory { reply }),
                None => respond(reply, Err(BankingError::AccountNotFound(account_number)), bank::REPLY_FAILED)
            },
            BankMessage::GetAllAccounts { reply } => {
                let mut summaries: Vec<AccountSummary> =
                    state.accounts.values().map(|entry| entry.summary.clone()).collect();
                summaries.sort_by(|a, b| {
                    (a.account_number.len(), &a.account_number).cmp(&(b.account_number.len(), &b.account_number))
                });
                respond(reply, summaries, bank::REPLY_FAILED);
            }
            BankMessage::GetFraudAlerts { account_number, reply } => {
                let alerts = match &state.fraud_engine {
                    Some(engine) => ask(
                        engine,
                        |reply| FraudMessage::GetAlerts { account_number, reply },
                        state.config.ask_timeout()
                    )
                    .await
                    .map_err(|e| BankingError::from_ask("Fraud engine", e)),
                    None => Err(BankingError::Unavailable("Fraud engine".to_string()))
                };
                respond(reply, alerts, bank::REPLY_FAILED);
            }
            BankMessage::GetFraudStats { reply } => {
                let stats = match &state.fraud_engine {
                    Some(engine) => ask(engine, |reply| FraudMessage::GetStats { reply }, state.config.ask_timeout())
                        .await
                        .map_err(|e| BankingError::from_ask("Fraud engine", e)),
                    None => Err(BankingError::Unavailable("Fraud engine".to_string()))
                };
                respond(reply, stats, bank::REPLY_FAILED);
            }
            BankMessage::MonitorTransaction(transaction) => match &state.fraud_engine {
                Some(engine) => {
                    if let Err(e) = engine.cast(FraudMessage::Monitor(transaction)) {
                        event!(Level::ERROR, event = bank::FRAUD_REPORTED, error = %e, message = "engine_unreachable");
                    }
                }
                None => {
                    event!(Level::WARN, event = bank::FRAUD_REPORTED,
                           transaction_id = %transaction.id, message = "engine_down_transaction_unmonitored");
                }
            },
            BankMessage::FraudDetected(alert) => self.handle_fraud_alert(alert, state)
        }
        Ok(())
    }

    async fn handle_supervisor_evt(
        &self,
        myself: ActorRef<Self::Msg>,
        message: SupervisionEvent,
        state: &mut Self::State
    ) -> Result<(), ActorProcessingErr> {
        let Some((cell, exit)) = child_exit(message) else {
            return Ok(());
        };

        if state.fraud_engine.as_ref().is_some_and(|engine| engine.get_id() == cell.get_id()) {
            state.fraud_engine = None;
            // A stopped engine leaves transfers unmonitored just like a failed one
            let cause = match exit {
                ChildExit::Failed(err) => err.to_string(),
                ChildExit::Stopped { reason } => reason.unwrap_or_else(|| "stopped".to_string())
            };
            if state.fraud_budget.try_acquire() {
                event!(Level::WARN, event = bank::FRAUD_ENGINE_RESTARTED, cause = %cause);
                Self::spawn_fraud_engine(&myself, state).await?;
            } else {
                event!(Level::ERROR, event = bank::FRAUD_ENGINE_RESTARTED, cause = %cause,
                       message = "restart_budget_exhausted");
            }
            return Ok(());
        }

        if let Some(account_number) = state.account_ids.remove(&cell.get_id()) {
            state.accounts.remove(&account_number);
            match exit {
                ChildExit::Failed(err) => {
                    event!(Level::WARN, event = bank::ACCOUNT_REMOVED, account_number = %account_number,
                           error = %err, directive = ?state.account_strategy.decide(&err));
                }
                ChildExit::Stopped { reason } => {
                    event!(Level::INFO, event = bank::ACCOUNT_REMOVED, account_number = %account_number,
                           reason = ?reason);
                }
            }
        }

        Ok(())
    }

    async fn post_stop(&self, myself: ActorRef<Self::Msg>, state: &mut Self::State) -> Result<(), ActorProcessingErr> {
        event!(Level::DEBUG, event = bank::BANK_STOPPED, name = ?myself.get_name(), accounts = %state.accounts.len());
        Ok(())
    }
}

impl Bank {
    async fn spawn_fraud_engine(myself: &ActorRef<BankMessage>, state: &mut BankState) -> Result<(), SpawnErr> {
        state.fraud_generation += 1;
        let name = child_name(&myself.get_cell(), &format!("fraud-{}", state.fraud_generation));
        let args = (state.config.fraud.clone(), Some(myself.clone()));
        let (engine, _handle) = Actor::spawn_linked(name, FraudEngine, args, myself.get_cell()).await?;
        state.fraud_engine = Some(engine);
        Ok(())
    }

    async fn handle_create_account(
        &self,
        myself: &ActorRef<BankMessage>,
        request: CreateAccountRequest,
        state: &mut BankState
    ) -> Result<AccountCreated, BankingError> {
        if let Err(e) = request.validate() {
            event!(Level::INFO, event = bank::ACCOUNT_CREATION_FAILED, error = %e);
            return Err(e);
        }

        let account_number = (state.last_number + 1).to_string();
        let credential = Credential::generate();
        let account = Account::open(account_number.clone(), &request, credential.clone());
        let summary = account.summary();
        let balance = account.balance();

        let args = AccountArgs {
            account,
            bank: Some(myself.clone()),
            strategy: state.account_strategy.clone()
        };
        let name = child_name(&myself.get_cell(), &format!("account-{account_number}"));
        let actor = match Actor::spawn_linked(name, AccountActor, args, myself.get_cell()).await {
            Ok((actor, _handle)) => actor,
            Err(e) => {
                event!(Level::ERROR, event = bank::ACCOUNT_CREATION_FAILED,
                       account_number = %account_number, error = %e);
                return Err(BankingError::AccountCreationFailed(e.to_string()));
            }
        };

        state.last_number += 1;
        state.account_ids.insert(actor.get_id(), account_number.clone());
        state.accounts.insert(account_number.clone(), AccountEntry { actor, summary });

        event!(Level::INFO, event = bank::ACCOUNT_CREATED,
               account_number = %account_number, account_type = %request.account_type, balance = %balance);

        Ok(AccountCreated { account_number, balance, credential })
    }

    fn route_command(&self, command: BankCommand, reply: RpcReplyPort<CommandResult>, state: &BankState) {
        let Some(entry) = state.accounts.get(command.account_number()) else {
            let err = BankingError::AccountNotFound(command.account_number().to_string());
            event!(Level::INFO, event = bank::COMMAND_REJECTED, command = %command.name(), error = %err);
            respond(reply, Err(err), bank::REPLY_FAILED);
            return;
        };

        event!(Level::DEBUG, event = bank::COMMAND_ROUTED,
               command = %command.name(), account_number = %command.account_number());

        let message = match command {
            BankCommand::Deposit { amount, description, .. } => AccountMessage::Deposit { amount, description, reply },
            BankCommand::Withdraw { amount, description, .. } => {
                AccountMessage::Withdraw { amount, description, reply }
            }
            BankCommand::Balance { .. } => AccountMessage::GetBalance { reply },
            BankCommand::Freeze { reason, .. } => AccountMessage::Freeze { reason, reply: Some(reply) },
            BankCommand::Unfreeze { .. } => AccountMessage::Unfreeze { reply }
        };
        Self::forward(&entry.actor, message);
    }

    fn route_transfer(&self, transfer: TransferRequest, reply: RpcReplyPort<TransferResponse>, state: &BankState) {
        let endpoints = if transfer.from_account == transfer.to_account {
            Err(format!("Cannot transfer from account {} to itself", transfer.from_account))
        } else {
            match (state.accounts.get(&transfer.from_account), state.accounts.get(&transfer.to_account)) {
                (None, _) => Err(format!("Source account {} not found", transfer.from_account)),
                (_, None) => Err(format!("Destination account {} not found", transfer.to_account)),
                (Some(source), Some(destination)) => Ok((source.actor.clone(), destination.actor.clone()))
            }
        };

        let (source, destination) = match endpoints {
            Ok(endpoints) => endpoints,
            Err(message) => {
                event!(Level::INFO, event = bank::TRANSFER_REJECTED,
                       from = %transfer.from_account, to = %transfer.to_account, reason = %message);
                respond(reply, TransferResponse::failed(message, transfer.transaction_id), bank::REPLY_FAILED);
                return;
            }
        };

        event!(Level::DEBUG, event = bank::TRANSFER_ROUTED,
               from = %transfer.from_account, to = %transfer.to_account, amount = %transfer.amount);

        if let Some(owner) = &state.owner
            && let Err(e) = owner.cast(SupervisorMessage::TransferRouted(transfer.clone()))
        {
            event!(Level::WARN, event = bank::TRANSFER_ROUTED, error = %e, message = "owner_unreachable");
        }

        Self::forward(&source, AccountMessage::Transfer { transfer, counterparty: Some(destination), reply });
    }

    fn handle_fraud_alert(&self, alert: FraudAlert, state: &BankState) {
        event!(Level::WARN, event = bank::FRAUD_REPORTED,
               account_number = %alert.account_number, severity = ?alert.severity, reason = %alert.reason);

        if alert.severity < state.config.fraud.freeze_at {
            return;
        }
        let Some(entry) = state.accounts.get(&alert.account_number) else {
            return;
        };

        let reason = format!("Fraud detected: {}", alert.reason);
        event!(Level::WARN, event = bank::FRAUD_ENFORCED, account_number = %alert.account_number, reason = %reason);
        Self::forward(&entry.actor, AccountMessage::Freeze { reason, reply: None });
    }

    /// Hand a message to an account; if the account is gone the reply port is
    /// dropped and the requester's ask resolves as unavailable.
    fn forward(actor: &ActorRef<AccountMessage>, message: AccountMessage) {
        if let Err(e) = actor.cast(message) {
            event!(Level::WARN, event = bank::COMMAND_REJECTED, error = %e, message = "account_unreachable");
        }
    }
}
