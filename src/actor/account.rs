//! Account Actor - one per account
//!
//! Owns a single `Account` and applies one message at a time to it:
//! - Deposits, withdrawals, balance and info inquiries
//! - Either leg of a transfer; the debit leg reports the settled transaction
//!   to the bank for fraud monitoring and then hands the credit leg to the
//!   destination, which answers the original requester
//! - Freeze/unfreeze and credential checks

use ractor::{Actor, ActorProcessingErr, ActorRef, MessagingErr, RpcReplyPort};
use tracing::{Level, event};

use crate::{
    actor::message::{AccountMessage, BankMessage},
    config::SupervisionSettings,
    domain::{
        account::{Account, AuthenticationResponse, TransferSide},
        command::{CommandOutcome, CommandResult},
        constant::account,
        transaction::{TransferRequest, TransferResponse}
    },
    runtime::{Directive, Fault, FaultKind, SupervisionStrategy, respond}
};

pub struct AccountArgs {
    pub account:  Account,
    /// Receives settled debits for fraud monitoring
    pub bank:     Option<ActorRef<BankMessage>>,
    pub strategy: SupervisionStrategy
}

pub struct AccountState {
    account:  Account,
    bank:     Option<ActorRef<BankMessage>>,
    strategy: SupervisionStrategy
}

pub struct AccountActor;

impl AccountActor {
    /// Misrouted transfers are dropped and the account keeps running; anything else stops it.
    pub fn strategy(settings: &SupervisionSettings) -> SupervisionStrategy {
        SupervisionStrategy::one_for_one(settings.max_retries, Some(settings.retry_window()), |kind| match kind {
            FaultKind::Known(Fault::Misrouted(_)) => Directive::Resume,
            _ => Directive::Stop
        })
    }
}

#[async_trait::async_trait]
impl Actor for AccountActor {
    type Arguments = AccountArgs;
    type Msg = AccountMessage;
    type State = AccountState;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        AccountArgs { account, bank, strategy }: Self::Arguments
    ) -> Result<Self::State, ActorProcessingErr> {
        event!(Level::DEBUG, event = account::ACCOUNT_STARTED,
               account_number = %account.account_number(), balance = %account.balance());

        Ok(AccountState { account, bank, strategy })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State
    ) -> Result<(), ActorProcessingErr> {
        let result = match message {
            AccountMessage::Deposit { amount, description, reply } => {
                let outcome = state.account.deposit(amount, &description).map(CommandOutcome::Balance);
                Self::reply_outcome(account::DEPOSITED, state, outcome, reply);
                Ok(())
            }
            AccountMessage::Withdraw { amount, description, reply } => {
                let outcome = state.account.withdraw(amount, &description).map(CommandOutcome::Balance);
                Self::reply_outcome(account::WITHDRAWN, state, outcome, reply);
                Ok(())
            }
            AccountMessage::GetBalance { reply } => {
                respond(reply, Ok(CommandOutcome::Balance(state.account.balance())), account::REPLY_FAILED);
                Ok(())
            }
            AccountMessage::GetAccountInfo { reply } => {
                respond(reply, Ok(state.account.info()), account::REPLY_FAILED);
                Ok(())
            }
            AccountMessage::Transfer { transfer, counterparty, reply } => {
                Self::handle_transfer(transfer, counterparty, reply, state)
            }
            AccountMessage::Freeze { reason, reply } => {
                let reason = state.account.freeze(reason);
                event!(Level::WARN, event = account::FROZEN,
                       account_number = %state.account.account_number(), reason = %reason);
                if let Some(reply) = reply {
                    respond(reply, Ok(CommandOutcome::AccountFrozen { reason }), account::REPLY_FAILED);
                }
                Ok(())
            }
            AccountMessage::Unfreeze { reply } => {
                state.account.unfreeze();
                event!(Level::INFO, event = account::UNFROZEN, account_number = %state.account.account_number());
                respond(reply, Ok(CommandOutcome::AccountUnfrozen), account::REPLY_FAILED);
                Ok(())
            }
            AccountMessage::Authenticate { account_number, credential, reply } => {
                let success = state.account.authenticate(&account_number, &credential);
                event!(Level::DEBUG, event = account::AUTHENTICATED,
                       account_number = %state.account.account_number(), success = %success);
                let response =
                    if success { AuthenticationResponse::accepted() } else { AuthenticationResponse::rejected() };
                respond(reply, response, account::REPLY_FAILED);
                Ok(())
            }
            AccountMessage::GetHistory { reply } => {
                respond(reply, Ok(state.account.history().to_vec()), account::REPLY_FAILED);
                Ok(())
            }
        };

        state.strategy.absorb(state.account.account_number(), result)
    }
}

impl AccountActor {
    fn reply_outcome(
        event_name: &'static str,
        state: &AccountState,
        outcome: CommandResult,
        reply: RpcReplyPort<CommandResult>
    ) {
        match &outcome {
            Ok(_) => {
                event!(Level::DEBUG, event = event_name,
                       account_number = %state.account.account_number(), balance = %state.account.balance());
            }
            Err(e) => {
                event!(Level::INFO, event = account::OPERATION_REJECTED,
                       account_number = %state.account.account_number(), error = %e);
            }
        }
        respond(reply, outcome, account::REPLY_FAILED);
    }

    fn handle_transfer(
        mut transfer: TransferRequest,
        counterparty: Option<ActorRef<AccountMessage>>,
        reply: RpcReplyPort<TransferResponse>,
        state: &mut AccountState
    ) -> Result<(), ActorProcessingErr> {
        match state.account.side_of(&transfer.from_account, &transfer.to_account) {
            Some(TransferSide::Debit) => {
                let debited = state.account.debit(
                    &transfer.to_account,
                    transfer.amount,
                    &transfer.description,
                    transfer.transaction_id.clone()
                );
                let transaction = match debited {
                    Ok(transaction) => transaction,
                    Err(e) => {
                        event!(Level::INFO, event = account::OPERATION_REJECTED,
                               account_number = %state.account.account_number(), error = %e);
                        let response = TransferResponse::failed(e.to_string(), transfer.transaction_id);
                        respond(reply, response, account::REPLY_FAILED);
                        return Ok(());
                    }
                };

                event!(Level::DEBUG, event = account::DEBITED,
                       transaction_id = %transaction.id, from = %transfer.from_account,
                       to = %transfer.to_account, amount = %transfer.amount);

                transfer.transaction_id = Some(transaction.id.clone());
                if let Some(bank) = &state.bank
                    && let Err(e) = bank.cast(BankMessage::MonitorTransaction(transaction))
                {
                    event!(Level::WARN, event = account::DEBITED, error = %e, message = "fraud_monitoring_skipped");
                }

                let Some(counterparty) = counterparty else {
                    respond(reply, Self::credit_undelivered(transfer), account::REPLY_FAILED);
                    return Ok(());
                };

                match counterparty.cast(AccountMessage::Transfer { transfer, counterparty: None, reply }) {
                    Ok(()) => {}
                    Err(MessagingErr::SendErr(AccountMessage::Transfer { transfer, reply, .. })) => {
                        event!(Level::WARN, event = account::CREDIT_UNDELIVERED,
                               from = %transfer.from_account, to = %transfer.to_account);
                        respond(reply, Self::credit_undelivered(transfer), account::REPLY_FAILED);
                    }
                    Err(e) => {
                        // The leg is lost with its reply port; the requester only sees its own deadline
                        event!(Level::ERROR, event = account::CREDIT_UNDELIVERED,
                               account_number = %state.account.account_number(), error = %e,
                               message = "reply_dropped_after_debit");
                    }
                }
                Ok(())
            }
            Some(TransferSide::Credit) => {
                let credited = state.account.credit(
                    &transfer.from_account,
                    transfer.amount,
                    &transfer.description,
                    transfer.transaction_id.clone()
                );
                let response = match credited {
                    Ok(transaction) => {
                        event!(Level::DEBUG, event = account::CREDITED,
                               transaction_id = %transaction.id, from = %transfer.from_account,
                               to = %transfer.to_account, amount = %transfer.amount);
                        TransferResponse::succeeded("Transfer completed successfully", Some(transaction.id))
                    }
                    Err(e) => {
                        event!(Level::WARN, event = account::OPERATION_REJECTED,
                               account_number = %state.account.account_number(), error = %e,
                               message = "credit_leg_rejected");
                        TransferResponse::failed(
                            format!(
                                "Transfer debited from {} but not credited to {}: {e}",
                                transfer.from_account, transfer.to_account
                            ),
                            transfer.transaction_id
                        )
                    }
                };
                respond(reply, response, account::REPLY_FAILED);
                Ok(())
            }
            None => {
                event!(Level::ERROR, event = account::MISROUTED,
                       account_number = %state.account.account_number(),
                       from = %transfer.from_account, to = %transfer.to_account);
                let message = format!(
                    "Account {} is not part of the transfer from {} to {}",
                    state.account.account_number(),
                    transfer.from_account,
                    transfer.to_account
                );
                let response = TransferResponse::failed(message.clone(), transfer.transaction_id);
                respond(reply, response, account::REPLY_FAILED);
                Err(Fault::Misrouted(message).into())
            }
        }
    }

    fn credit_undelivered(transfer: TransferRequest) -> TransferResponse {
        TransferResponse::failed(
            format!(
                "Transfer debited from {} but destination account {} is unavailable",
                transfer.from_account, transfer.to_account
            ),
            transfer.transaction_id
        )
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rust_decimal::Decimal;

    use super::*;
    use crate::{
        domain::{
            account::{AccountType, CreateAccountRequest, Credential},
            error::BankingError
        },
        runtime::ask
    };

    const TIMEOUT: Duration = Duration::from_secs(1);

    async fn spawn_account(number: &str, balance: i64) -> ActorRef<AccountMessage> {
        let request = CreateAccountRequest::new("Test Customer", AccountType::Checking, Decimal::from(balance));
        let args = AccountArgs {
            account:  Account::open(number, &request, Credential::from("secret")),
            bank:     None,
            strategy: AccountActor::strategy(&SupervisionSettings::default())
        };
        let (actor, _) = Actor::spawn(None, AccountActor, args).await.unwrap();
        actor
    }

    async fn balance(actor: &ActorRef<AccountMessage>) -> Decimal {
        match ask(actor, |reply| AccountMessage::GetBalance { reply }, TIMEOUT).await.unwrap() {
            Ok(CommandOutcome::Balance(balance)) => balance,
            other => panic!("unexpected balance reply {other:?}")
        }
    }

    async fn transfer(
        source: &ActorRef<AccountMessage>,
        destination: &ActorRef<AccountMessage>,
        request: TransferRequest
    ) -> TransferResponse {
        let counterparty = Some(destination.clone());
        ask(source, |reply| AccountMessage::Transfer { transfer: request, counterparty, reply }, TIMEOUT)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn deposit_and_withdraw_reply_with_balance() {
        let actor = spawn_account("1001", 1000).await;

        let deposited = ask(
            &actor,
            |reply| AccountMessage::Deposit { amount: Decimal::from(500), description: "Deposit".into(), reply },
            TIMEOUT
        )
        .await
        .unwrap();
        assert_eq!(deposited, Ok(CommandOutcome::Balance(Decimal::from(1500))));

        let overdrawn = ask(
            &actor,
            |reply| AccountMessage::Withdraw { amount: Decimal::from(5000), description: "Withdrawal".into(), reply },
            TIMEOUT
        )
        .await
        .unwrap();
        assert!(matches!(overdrawn, Err(BankingError::InsufficientFunds { .. })));
        assert_eq!(balance(&actor).await, Decimal::from(1500));

        actor.stop(None);
    }

    #[tokio::test]
    async fn transfer_moves_money_between_accounts() {
        let source = spawn_account("1001", 5000).await;
        let destination = spawn_account("1002", 1000).await;

        let response = transfer(&source, &destination, TransferRequest::new("1001", "1002", Decimal::from(500))).await;
        assert!(response.success, "{}", response.message);
        assert!(response.transaction_id.is_some());
        assert_eq!(balance(&source).await, Decimal::from(4500));
        assert_eq!(balance(&destination).await, Decimal::from(1500));

        let response =
            transfer(&source, &destination, TransferRequest::new("1001", "1002", Decimal::from(10_000))).await;
        assert!(!response.success);
        assert_eq!(balance(&source).await, Decimal::from(4500));
        assert_eq!(balance(&destination).await, Decimal::from(1500));

        source.stop(None);
        destination.stop(None);
    }

    #[tokio::test]
    async fn frozen_destination_leaves_transfer_half_applied() {
        let source = spawn_account("1001", 5000).await;
        let destination = spawn_account("1002", 1000).await;
        destination.cast(AccountMessage::Freeze { reason: "audit".to_string(), reply: None }).unwrap();

        let response = transfer(&source, &destination, TransferRequest::new("1001", "1002", Decimal::from(500))).await;
        assert!(!response.success);
        assert!(response.message.contains("not credited"));
        assert!(response.message.contains("audit"));
        assert_eq!(balance(&source).await, Decimal::from(4500));
        assert_eq!(balance(&destination).await, Decimal::from(1000));

        source.stop(None);
        destination.stop(None);
    }

    #[tokio::test]
    async fn stopped_destination_is_reported_after_the_debit() {
        let source = spawn_account("1001", 5000).await;
        let destination = spawn_account("1002", 1000).await;
        destination.stop_and_wait(None, Some(TIMEOUT)).await.unwrap();

        let response = transfer(&source, &destination, TransferRequest::new("1001", "1002", Decimal::from(500))).await;
        assert!(!response.success);
        assert_eq!(response.message, "Transfer debited from 1001 but destination account 1002 is unavailable");
        assert!(response.transaction_id.is_some());
        assert_eq!(balance(&source).await, Decimal::from(4500));

        source.stop(None);
    }

    #[tokio::test]
    async fn misrouted_transfer_is_refused_and_account_keeps_running() {
        let account = spawn_account("1001", 1000).await;

        let response = ask(
            &account,
            |reply| AccountMessage::Transfer {
                transfer: TransferRequest::new("2001", "2002", Decimal::from(10)),
                counterparty: None,
                reply
            },
            TIMEOUT
        )
        .await
        .unwrap();
        assert!(!response.success);
        assert!(response.message.contains("not part of the transfer"));

        assert_eq!(balance(&account).await, Decimal::from(1000));
        account.stop(None);
    }

    #[tokio::test]
    async fn freeze_blocks_withdrawals_until_unfrozen() {
        let account = spawn_account("1001", 1000).await;

        let frozen =
            ask(&account, |reply| AccountMessage::Freeze { reason: "audit".into(), reply: Some(reply) }, TIMEOUT)
                .await
                .unwrap();
        assert_eq!(frozen, Ok(CommandOutcome::AccountFrozen { reason: "audit".to_string() }));

        let rejected = ask(
            &account,
            |reply| AccountMessage::Withdraw { amount: Decimal::ONE, description: "Withdrawal".into(), reply },
            TIMEOUT
        )
        .await
        .unwrap();
        assert!(rejected.unwrap_err().to_string().contains("audit"));

        let info = ask(&account, |reply| AccountMessage::GetAccountInfo { reply }, TIMEOUT).await.unwrap().unwrap();
        assert!(info.frozen);

        ask(&account, |reply| AccountMessage::Unfreeze { reply }, TIMEOUT).await.unwrap().unwrap();
        let history = ask(&account, |reply| AccountMessage::GetHistory { reply }, TIMEOUT).await.unwrap().unwrap();
        assert!(history.is_empty());

        account.stop(None);
    }

    #[tokio::test]
    async fn authentication_checks_number_and_credential() {
        let account = spawn_account("1001", 10).await;

        let accepted = ask(
            &account,
            |reply| AccountMessage::Authenticate {
                account_number: "1001".into(),
                credential: "secret".into(),
                reply
            },
            TIMEOUT
        )
        .await
        .unwrap();
        assert!(accepted.success);

        let rejected = ask(
            &account,
            |reply| AccountMessage::Authenticate { account_number: "1001".into(), credential: "guess".into(), reply },
            TIMEOUT
        )
        .await
        .unwrap();
        assert_eq!(rejected, AuthenticationResponse::rejected());

        account.stop(None);
    }
}
