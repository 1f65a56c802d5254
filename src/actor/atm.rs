//! Atm Actor - customer-facing cash machine
//!
//! Each request is prechecked locally (amount, withdrawal limit, drawer cash),
//! then authenticated and executed against the bank with two bounded asks.
//! The drawer only changes after the bank confirmed the operation.

use std::time::Duration;

use ractor::{Actor, ActorProcessingErr, ActorRef};
use rust_decimal::Decimal;
use tracing::{Level, event};

use crate::{
    actor::message::{AtmMessage, BankMessage},
    config::AtmSettings,
    domain::{
        atm::{AtmOperation, AtmRequest, AtmResponse, AtmState},
        command::{AtmCommand, BankCommand, CommandOutcome, CommandResult},
        constant::atm,
        error::BankingError
    },
    runtime::{Fault, ask, respond}
};

pub struct AtmArgs {
    pub state:       AtmState,
    pub bank:        Option<ActorRef<BankMessage>>,
    pub settings:    AtmSettings,
    pub ask_timeout: Duration
}

pub struct AtmActorState {
    atm:         AtmState,
    bank:        Option<ActorRef<BankMessage>>,
    settings:    AtmSettings,
    ask_timeout: Duration
}

pub struct Atm;

#[async_trait::async_trait]
impl Actor for Atm {
    type Arguments = AtmArgs;
    type Msg = AtmMessage;
    type State = AtmActorState;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        AtmArgs { state, bank, settings, ask_timeout }: Self::Arguments
    ) -> Result<Self::State, ActorProcessingErr> {
        event!(Level::DEBUG, event = atm::ATM_STARTED,
               atm_id = %state.id, location = %state.location, cash = %state.cash_available);

        Ok(AtmActorState { atm: state, bank, settings, ask_timeout })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State
    ) -> Result<(), ActorProcessingErr> {
        match message {
            AtmMessage::Request { request, reply } => match self.handle_request(request, state).await {
                Ok(response) => respond(reply, response, atm::REPLY_FAILED),
                Err(fault) => {
                    // Answer first: the fault stops this ATM and its parent decides what comes next
                    respond(reply, AtmResponse::failed(fault.to_string()), atm::REPLY_FAILED);
                    return Err(fault.into());
                }
            },
            AtmMessage::Command { command, reply } => {
                let result = self.handle_command(command, state);
                respond(reply, result, atm::REPLY_FAILED);
            }
            AtmMessage::BankChanged(bank) => {
                event!(Level::INFO, event = atm::BANK_CHANGED,
                       atm_id = %state.atm.id, bank_available = %bank.is_some());
                state.bank = bank;
            }
        }
        Ok(())
    }

    async fn post_stop(&self, _myself: ActorRef<Self::Msg>, state: &mut Self::State) -> Result<(), ActorProcessingErr> {
        event!(Level::DEBUG, event = atm::ATM_STOPPED, atm_id = %state.atm.id);
        Ok(())
    }
}

impl Atm {
    /// Rejections are answers; only a bank reply that breaks the protocol is a fault.
    async fn handle_request(&self, request: AtmRequest, state: &mut AtmActorState) -> Result<AtmResponse, Fault> {
        state.atm.transaction_count += 1;
        let AtmRequest { account_number, credential, operation } = request;

        event!(Level::DEBUG, event = atm::REQUEST_RECEIVED,
               atm_id = %state.atm.id, account_number = %account_number, operation = %operation.name());

        if let Err(e) = state.atm.precheck(&operation, state.settings.withdrawal_limit) {
            event!(Level::INFO, event = atm::REQUEST_REJECTED, atm_id = %state.atm.id, error = %e);
            return Ok(AtmResponse::failed(e.to_string()));
        }

        let Some(bank) = state.bank.clone() else {
            return Ok(AtmResponse::failed(BankingError::Unavailable("Bank".to_string()).to_string()));
        };

        let authentication = ask(
            &bank,
            |reply| BankMessage::Authenticate { account_number: account_number.clone(), credential, reply },
            state.ask_timeout
        )
        .await;
        match authentication {
            Ok(response) if response.success => {}
            Ok(response) => {
                let err = BankingError::AuthenticationFailed(response.message);
                event!(Level::INFO, event = atm::AUTHENTICATION_FAILED,
                       atm_id = %state.atm.id, account_number = %account_number, error = %err);
                return Ok(AtmResponse::failed(err.to_string()));
            }
            Err(e) => {
                let err = BankingError::from_ask("Authentication service", e);
                event!(Level::WARN, event = atm::AUTHENTICATION_FAILED, atm_id = %state.atm.id, error = %err);
                return Ok(AtmResponse::failed(err.to_string()));
            }
        }

        let command = Self::bank_command(&state.atm.id, account_number, &operation);
        let outcome = ask(&bank, |reply| BankMessage::Execute { command, reply }, state.ask_timeout)
            .await
            .unwrap_or_else(|e| Err(BankingError::from_ask("Bank", e)));

        match outcome {
            Ok(CommandOutcome::Balance(balance)) => {
                state.atm.settle(&operation);
                event!(Level::INFO, event = atm::OPERATION_COMPLETED,
                       atm_id = %state.atm.id, operation = %operation.name(), cash = %state.atm.cash_available);
                Ok(AtmResponse::succeeded(&operation, balance))
            }
            Ok(other) => {
                event!(Level::ERROR, event = atm::OPERATION_FAILED, atm_id = %state.atm.id, outcome = %other);
                Err(Fault::InvalidOperation(format!("unexpected reply from bank to {}: {other}", operation.name())))
            }
            Err(e) => {
                event!(Level::INFO, event = atm::OPERATION_FAILED, atm_id = %state.atm.id, error = %e);
                Ok(AtmResponse::failed(e.to_string()))
            }
        }
    }

    fn bank_command(atm_id: &str, account_number: String, operation: &AtmOperation) -> BankCommand {
        match operation {
            AtmOperation::Withdraw { amount } => BankCommand::Withdraw {
                account_number,
                amount: *amount,
                description: format!("ATM withdrawal at {atm_id}")
            },
            AtmOperation::Deposit { amount } => BankCommand::Deposit {
                account_number,
                amount: *amount,
                description: format!("ATM deposit at {atm_id}")
            },
            AtmOperation::BalanceInquiry => BankCommand::Balance { account_number }
        }
    }

    fn handle_command(&self, command: AtmCommand, state: &mut AtmActorState) -> CommandResult {
        match command {
            AtmCommand::Status => Ok(CommandOutcome::AtmStatus(state.atm.clone())),
            AtmCommand::Refill => {
                state.atm.refill_to(state.settings.refill_amount);
                event!(Level::INFO, event = atm::REFILLED, atm_id = %state.atm.id, cash = %state.atm.cash_available);
                Ok(CommandOutcome::AtmRefilled(state.atm.clone()))
            }
            AtmCommand::RefillBy(amount) if amount <= Decimal::ZERO => Err(BankingError::InvalidAmount(amount)),
            AtmCommand::RefillBy(amount) => {
                state.atm.refill_by(amount);
                event!(Level::INFO, event = atm::REFILLED, atm_id = %state.atm.id, cash = %state.atm.cash_available);
                Ok(CommandOutcome::AtmRefilled(state.atm.clone()))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        actor::bank::{Bank, BankArgs},
        config::BankingConfig,
        domain::account::{AccountCreated, AccountType, AuthenticationResponse, CreateAccountRequest}
    };

    const TIMEOUT: Duration = Duration::from_secs(1);

    /// Accepts every credential and answers every command as if it were an unfreeze
    pub(crate) struct MisreportingBank;

    #[async_trait::async_trait]
    impl Actor for MisreportingBank {
        type Arguments = ();
        type Msg = BankMessage;
        type State = ();

        async fn pre_start(&self, _myself: ActorRef<Self::Msg>, _: ()) -> Result<(), ActorProcessingErr> {
            Ok(())
        }

        async fn handle(
            &self,
            _myself: ActorRef<Self::Msg>,
            message: Self::Msg,
            _state: &mut Self::State
        ) -> Result<(), ActorProcessingErr> {
            match message {
                BankMessage::Authenticate { reply, .. } => {
                    reply.send(AuthenticationResponse::accepted()).ok();
                }
                BankMessage::Execute { reply, .. } => {
                    reply.send(Ok(CommandOutcome::AccountUnfrozen)).ok();
                }
                _ => {}
            }
            Ok(())
        }
    }

    async fn spawn_atm(bank: Option<ActorRef<BankMessage>>, cash: i64) -> ActorRef<AtmMessage> {
        let args = AtmArgs {
            state: AtmState::new("lobby", "Lobby", Decimal::from(cash)),
            bank,
            settings: AtmSettings::default(),
            ask_timeout: TIMEOUT
        };
        let (atm, _) = Actor::spawn(None, Atm, args).await.unwrap();
        atm
    }

    async fn spawn_bank_with_account(name: &str, deposit: i64) -> (ActorRef<BankMessage>, AccountCreated) {
        let config = BankingConfig::default().named(name);
        let (bank, _) = Actor::spawn(Some(name.to_string()), Bank, BankArgs { config, owner: None }).await.unwrap();
        let request = CreateAccountRequest::new("John Doe", AccountType::Checking, Decimal::from(deposit));
        let created =
            ask(&bank, |reply| BankMessage::CreateAccount { request, reply }, TIMEOUT).await.unwrap().unwrap();
        (bank, created)
    }

    async fn request(atm: &ActorRef<AtmMessage>, request: AtmRequest) -> AtmResponse {
        ask(atm, |reply| AtmMessage::Request { request, reply }, TIMEOUT * 3).await.unwrap()
    }

    async fn status(atm: &ActorRef<AtmMessage>) -> AtmState {
        match ask(atm, |reply| AtmMessage::Command { command: AtmCommand::Status, reply }, TIMEOUT).await.unwrap() {
            Ok(CommandOutcome::AtmStatus(state)) => state,
            other => panic!("unexpected status reply {other:?}")
        }
    }

    #[tokio::test]
    async fn over_limit_withdrawal_is_rejected_before_authentication() {
        // No bank at all: any remote interaction would fail with "unavailable".
        let atm = spawn_atm(None, 50_000).await;

        let response = request(&atm, AtmRequest::withdraw("1001", "wrong", Decimal::from(1500))).await;
        assert!(!response.success);
        assert!(response.message.contains("limit"));

        let state = status(&atm).await;
        assert_eq!(state.cash_available, Decimal::from(50_000));
        assert_eq!(state.transaction_count, 1);

        atm.stop(None);
    }

    #[tokio::test]
    async fn authenticated_operations_adjust_the_drawer() {
        let (bank, account) = spawn_bank_with_account("atm-test-operations", 2000).await;
        let atm = spawn_atm(Some(bank.clone()), 5000).await;
        let credential = account.credential.expose().to_string();

        let number = account.account_number.as_str();

        let withdrawn = request(&atm, AtmRequest::withdraw(number, &credential, Decimal::from(300))).await;
        assert_eq!(withdrawn.message, "Withdrawal successful");
        assert_eq!(withdrawn.balance, Some(Decimal::from(1700)));

        let deposited = request(&atm, AtmRequest::deposit(number, &credential, Decimal::from(100))).await;
        assert_eq!(deposited.balance, Some(Decimal::from(1800)));

        let inquiry = request(&atm, AtmRequest::balance_inquiry(number, &credential)).await;
        assert_eq!(inquiry.message, "Balance inquiry successful");
        assert_eq!(inquiry.balance, Some(Decimal::from(1800)));

        let state = status(&atm).await;
        assert_eq!(state.cash_available, Decimal::from(4800));
        assert_eq!(state.transaction_count, 3);

        atm.stop(None);
        bank.stop(None);
    }

    #[tokio::test]
    async fn failures_leave_the_drawer_untouched() {
        let (bank, account) = spawn_bank_with_account("atm-test-failures", 100).await;
        let atm = spawn_atm(Some(bank.clone()), 5000).await;

        let number = account.account_number.as_str();

        let bad_credential = request(&atm, AtmRequest::withdraw(number, "guess", Decimal::from(50))).await;
        assert!(!bad_credential.success);
        assert_eq!(bad_credential.message, "Invalid account number or credential");

        let credential = account.credential.expose().to_string();
        let overdrawn = request(&atm, AtmRequest::withdraw(number, &credential, Decimal::from(500))).await;
        assert!(!overdrawn.success);
        assert!(overdrawn.message.contains("Insufficient funds"));

        let state = status(&atm).await;
        assert_eq!(state.cash_available, Decimal::from(5000));
        assert_eq!(state.transaction_count, 2);

        atm.stop(None);
        bank.stop(None);
    }

    #[tokio::test]
    async fn missing_bank_is_reported_as_unavailable() {
        let atm = spawn_atm(None, 5000).await;

        let response = request(&atm, AtmRequest::balance_inquiry("1001", "secret")).await;
        assert_eq!(response.message, "Bank temporarily unavailable");

        atm.stop(None);
    }

    #[tokio::test]
    async fn refill_resets_or_tops_up_cash() {
        let atm = spawn_atm(None, 10).await;

        let refilled = ask(&atm, |reply| AtmMessage::Command { command: AtmCommand::Refill, reply }, TIMEOUT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(refilled.to_string(), "ATM lobby refilled - Cash available: 50000");

        let topped_up = ask(
            &atm,
            |reply| AtmMessage::Command { command: AtmCommand::RefillBy(Decimal::from(250)), reply },
            TIMEOUT
        )
        .await
        .unwrap();
        match topped_up {
            Ok(CommandOutcome::AtmRefilled(state)) => assert_eq!(state.cash_available, Decimal::from(50_250)),
            other => panic!("unexpected refill reply {other:?}")
        }

        let rejected = ask(
            &atm,
            |reply| AtmMessage::Command { command: AtmCommand::RefillBy(Decimal::ZERO), reply },
            TIMEOUT
        )
        .await
        .unwrap();
        assert_eq!(rejected, Err(BankingError::InvalidAmount(Decimal::ZERO)));

        atm.stop(None);
    }

    #[tokio::test]
    async fn unexpected_bank_reply_is_answered_then_faults() {
        let (bank, _) = Actor::spawn(None, MisreportingBank, ()).await.unwrap();
        let args = AtmArgs {
            state: AtmState::new("lobby", "Lobby", Decimal::from(5000)),
            bank: Some(bank.clone()),
            settings: AtmSettings::default(),
            ask_timeout: TIMEOUT
        };
        let (atm, handle) = Actor::spawn(None, Atm, args).await.unwrap();

        let response = request(&atm, AtmRequest::withdraw("1001", "secret", Decimal::from(20))).await;
        assert!(!response.success);
        assert!(response.message.starts_with("invalid operation: unexpected reply from bank"), "{}", response.message);
        assert_eq!(response.balance, None);

        tokio::time::timeout(TIMEOUT, handle).await.unwrap().unwrap();
        bank.stop(None);
    }
}
