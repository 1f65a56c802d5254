//! TransactionCoordinator Actor - transfer lifecycle
//!
//! Every transfer gets an id and a `Pending` record holding the requester.
//! The debit/credit work is delegated to the bank from a detached task so the
//! coordinator keeps serving while a transfer is in flight; the outcome comes
//! back as `TransferSettled` and is matched by id. Unknown ids are ignored.

use std::{collections::HashMap, time::Duration};

use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use tracing::{Level, event};

use crate::{
    actor::message::{BankMessage, CoordinatorMessage, SupervisorMessage},
    domain::{
        constant::coordinator,
        error::BankingError,
        transaction::{
            Transaction, TransactionStats, TransactionStatus, TransferRequest, TransferResponse, new_transaction_id
        }
    },
    runtime::{ask, respond}
};

pub struct CoordinatorArgs {
    pub bank:        Option<ActorRef<BankMessage>>,
    /// Receives completion and failure notifications
    pub owner:       Option<ActorRef<SupervisorMessage>>,
    pub ask_timeout: Duration
}

struct PendingTransfer {
    transaction: Transaction,
    reply:       RpcReplyPort<TransferResponse>
}

pub struct CoordinatorState {
    bank:        Option<ActorRef<BankMessage>>,
    owner:       Option<ActorRef<SupervisorMessage>>,
    ask_timeout: Duration,
    pending:     HashMap<String, PendingTransfer>,
    settled:     Vec<Transaction>
}

pub struct TransactionCoordinator;

#[async_trait::async_trait]
impl Actor for TransactionCoordinator {
    type Arguments = CoordinatorArgs;
    type Msg = CoordinatorMessage;
    type State = CoordinatorState;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        CoordinatorArgs { bank, owner, ask_timeout }: Self::Arguments
    ) -> Result<Self::State, ActorProcessingErr> {
        event!(Level::DEBUG, event = coordinator::COORDINATOR_STARTED, bank_available = %bank.is_some());

        Ok(CoordinatorState { bank, owner, ask_timeout, pending: HashMap::new(), settled: Vec::new() })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State
    ) -> Result<(), ActorProcessingErr> {
        match message {
            CoordinatorMessage::Transfer { transfer, reply } => self.handle_transfer(myself, transfer, reply, state),
            CoordinatorMessage::TransferSettled { transaction_id, response } => {
                self.handle_settled(transaction_id, response, state)
            }
            CoordinatorMessage::GetTransactionHistory { account_number, reply } => {
                let mut history: Vec<Transaction> = state
                    .settled
                    .iter()
                    .chain(state.pending.values().map(|pending| &pending.transaction))
                    .filter(|transaction| transaction.touches(&account_number))
                    .cloned()
                    .collect();
                history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
                respond(reply, history, coordinator::REPLY_FAILED);
            }
            CoordinatorMessage::GetTransaction { transaction_id, reply } => {
                let found = state
                    .pending
                    .get(&transaction_id)
                    .map(|pending| pending.transaction.clone())
                    .or_else(|| state.settled.iter().find(|transaction| transaction.id == transaction_id).cloned());
                respond(reply, found, coordinator::REPLY_FAILED);
            }
            CoordinatorMessage::GetStats { reply } => {
                let stats = TransactionStats::tally(
                    state.settled.iter().chain(state.pending.values().map(|pending| &pending.transaction))
                );
                respond(reply, stats, coordinator::REPLY_FAILED);
            }
            CoordinatorMessage::BankChanged(bank) => {
                event!(Level::INFO, event = coordinator::BANK_CHANGED, bank_available = %bank.is_some());
                state.bank = bank;
            }
        }
        Ok(())
    }
}

impl TransactionCoordinator {
    fn handle_transfer(
        &self,
        myself: ActorRef<CoordinatorMessage>,
        transfer: TransferRequest,
        reply: RpcReplyPort<TransferResponse>,
        state: &mut CoordinatorState
    ) {
        let transaction_id = new_transaction_id();
        let transaction = Transaction::pending(
            transaction_id.clone(),
            transfer.from_account.clone(),
            transfer.to_account.clone(),
            transfer.amount,
            transfer.description.clone()
        );
        state.pending.insert(transaction_id.clone(), PendingTransfer { transaction, reply });

        event!(Level::DEBUG, event = coordinator::TRANSFER_PENDING,
               transaction_id = %transaction_id, from = %transfer.from_account,
               to = %transfer.to_account, amount = %transfer.amount);

        let Some(bank) = state.bank.clone() else {
            let reason = BankingError::Unavailable("Bank".to_string()).to_string();
            self.handle_settled(transaction_id.clone(), TransferResponse::failed(reason, Some(transaction_id)), state);
            return;
        };

        let timeout = state.ask_timeout;
        let transfer = TransferRequest { transaction_id: Some(transaction_id.clone()), ..transfer };
        tokio::spawn(async move {
            let response = match ask(&bank, |reply| BankMessage::Transfer { transfer, reply }, timeout).await {
                Ok(response) => response,
                Err(e) => {
                    let reason = BankingError::from_ask("Bank", e).to_string();
                    TransferResponse::failed(reason, Some(transaction_id.clone()))
                }
            };
            if let Err(e) = myself.cast(CoordinatorMessage::TransferSettled { transaction_id, response }) {
                event!(Level::WARN, event = coordinator::OUTCOME_IGNORED, error = %e, message = "coordinator_gone");
            }
        });
    }

    fn handle_settled(&self, transaction_id: String, response: TransferResponse, state: &mut CoordinatorState) {
        let Some(PendingTransfer { mut transaction, reply }) = state.pending.remove(&transaction_id) else {
            event!(Level::DEBUG, event = coordinator::OUTCOME_IGNORED, transaction_id = %transaction_id);
            return;
        };

        let status = if response.success { TransactionStatus::Completed } else { TransactionStatus::Failed };
        transaction.settle(status);
        let response = TransferResponse { transaction_id: Some(transaction_id.clone()), ..response };

        let notification = if response.success {
            event!(Level::INFO, event = coordinator::TRANSFER_COMPLETED,
                   transaction_id = %transaction_id, amount = %transaction.amount);
            SupervisorMessage::TransferCompleted(transaction.clone())
        } else {
            event!(Level::INFO, event = coordinator::TRANSFER_FAILED,
                   transaction_id = %transaction_id, reason = %response.message);
            SupervisorMessage::TransferFailed { transaction_id, reason: response.message.clone() }
        };
        if let Some(owner) = &state.owner
            && let Err(e) = owner.cast(notification)
        {
            event!(Level::WARN, event = coordinator::OUTCOME_IGNORED, error = %e, message = "owner_unreachable");
        }

        state.settled.push(transaction);
        respond(reply, response, coordinator::REPLY_FAILED);
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::{
        actor::bank::{Bank, BankArgs},
        config::BankingConfig,
        domain::account::{AccountType, CreateAccountRequest}
    };

    const TIMEOUT: Duration = Duration::from_secs(1);

    async fn spawn_coordinator(bank: Option<ActorRef<BankMessage>>) -> ActorRef<CoordinatorMessage> {
        let args = CoordinatorArgs { bank, owner: None, ask_timeout: TIMEOUT };
        let (coordinator, _) = Actor::spawn(None, TransactionCoordinator, args).await.unwrap();
        coordinator
    }

    async fn transfer(
        coordinator: &ActorRef<CoordinatorMessage>,
        from: &str,
        to: &str,
        amount: i64
    ) -> TransferResponse {
        let transfer = TransferRequest::new(from, to, Decimal::from(amount));
        ask(coordinator, |reply| CoordinatorMessage::Transfer { transfer, reply }, TIMEOUT * 2).await.unwrap()
    }

    #[tokio::test]
    async fn transfers_are_tracked_until_settled() {
        let config = BankingConfig::default().named("coordinator-test-tracking");
        let (bank, _) = Actor::spawn(Some(config.system_name.clone()), Bank, BankArgs { config, owner: None })
            .await
            .unwrap();
        for (customer, deposit) in [("John Doe", 5000), ("Jane Smith", 1000)] {
            let request = CreateAccountRequest::new(customer, AccountType::Checking, Decimal::from(deposit));
            ask(&bank, |reply| BankMessage::CreateAccount { request, reply }, TIMEOUT).await.unwrap().unwrap();
        }
        let coordinator = spawn_coordinator(Some(bank.clone())).await;

        let completed = transfer(&coordinator, "1001", "1002", 500).await;
        assert!(completed.success, "{}", completed.message);
        let transaction_id = completed.transaction_id.clone().unwrap();

        let failed = transfer(&coordinator, "1002", "1001", 10_000).await;
        assert!(!failed.success);

        let recorded = ask(
            &coordinator,
            |reply| CoordinatorMessage::GetTransaction { transaction_id: transaction_id.clone(), reply },
            TIMEOUT
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(recorded.status, TransactionStatus::Completed);

        let history = ask(
            &coordinator,
            |reply| CoordinatorMessage::GetTransactionHistory { account_number: "1001".into(), reply },
            TIMEOUT
        )
        .await
        .unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].timestamp >= history[1].timestamp);
        assert_eq!(history[1].id, transaction_id);

        let stats = ask(&coordinator, |reply| CoordinatorMessage::GetStats { reply }, TIMEOUT).await.unwrap();
        assert_eq!(stats, TransactionStats { total: 2, completed: 1, failed: 1, pending: 0 });

        coordinator.stop(None);
        bank.stop(None);
    }

    #[tokio::test]
    async fn missing_bank_fails_fast() {
        let coordinator = spawn_coordinator(None).await;

        let response = transfer(&coordinator, "1001", "1002", 10).await;
        assert!(!response.success);
        assert!(response.message.contains("temporarily unavailable"));
        assert!(response.transaction_id.is_some());

        coordinator.stop(None);
    }

    #[tokio::test]
    async fn unknown_outcomes_are_ignored() {
        let coordinator = spawn_coordinator(None).await;

        coordinator
            .cast(CoordinatorMessage::TransferSettled {
                transaction_id: "stale".to_string(),
                response:       TransferResponse::succeeded("late", None)
            })
            .unwrap();

        let stats = ask(&coordinator, |reply| CoordinatorMessage::GetStats { reply }, TIMEOUT).await.unwrap();
        assert_eq!(stats, TransactionStats::default());

        coordinator.stop(None);
    }
}
