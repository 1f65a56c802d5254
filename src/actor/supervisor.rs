//! Supervisor Actor - Root of the banking actor system
//!
//! The Supervisor owns every long-lived child and manages system-wide concerns:
//! - Spawns the bank, the transaction coordinator and the ATMs on start,
//!   tears them down on stop
//! - Routes client requests to the child that owns them
//! - Applies the restart policy when a child terminates or fails
//! - Keeps transfer counters and reports system status

use std::collections::HashMap;

use ractor::{Actor, ActorProcessingErr, ActorRef, Message, RpcReplyPort, SpawnErr, SupervisionEvent};
use rust_decimal::Decimal;
use tracing::{Level, event};

use crate::{
    actor::{
        atm::{Atm, AtmArgs},
        bank::{Bank, BankArgs},
        coordinator::{CoordinatorArgs, TransactionCoordinator},
        message::{AtmMessage, BankMessage, CoordinatorMessage, SupervisorMessage, SystemChildren}
    },
    config::BankingConfig,
    domain::{
        account::AuthenticationResponse,
        atm::{AtmResponse, AtmState},
        command::{AtmCommand, CommandOutcome, CommandResult, ShorthandCommand},
        constant::supervisor,
        error::BankingError,
        status::{ComponentStatus, SystemStatus},
        transaction::TransferResponse
    },
    runtime::{
        ChildExit, Directive, FaultKind, RestartBudget, SupervisionStrategy, ask, child_exit, child_name, respond
    }
};

struct AtmEntry {
    actor:        ActorRef<AtmMessage>,
    location:     String,
    initial_cash: Decimal,
    restarts:     RestartBudget
}

/// Supervisor Actor State - child handles, restart bookkeeping and counters
pub struct SupervisorState {
    config:                 BankingConfig,
    strategy:               SupervisionStrategy,
    running:                bool,
    bank:                   Option<ActorRef<BankMessage>>,
    bank_status:            ComponentStatus,
    bank_generation:        u32,
    /// Lifetime cap, reset on every start
    bank_restarts:          RestartBudget,
    coordinator:            Option<ActorRef<CoordinatorMessage>>,
    coordinator_status:     ComponentStatus,
    coordinator_generation: u32,
    coordinator_restarts:   RestartBudget,
    atms:                   HashMap<String, AtmEntry>,
    /// Shared by every ATM and never reset on stop
    atm_generation:         u32,
    transfers_routed:       u64,
    transfers_completed:    u64,
    transfers_failed:       u64
}

/// Supervisor Actor - root of the actor system
pub struct Supervisor;

impl Supervisor {
    /// Recognized faults restart the child; anything else is escalated.
    pub fn strategy(config: &BankingConfig) -> SupervisionStrategy {
        let supervision = &config.supervision;
        SupervisionStrategy::one_for_one(supervision.max_retries, Some(supervision.retry_window()), |kind| {
            match kind {
                FaultKind::Known(_) => Directive::Restart,
                FaultKind::Unknown(_) => Directive::Escalate
            }
        })
    }

    /// Spawn the supervisor under `config.system_name` and start its children
    pub async fn spawn_system(config: BankingConfig) -> Result<ActorRef<SupervisorMessage>, BankingError> {
        let timeout = config.ask_timeout() * 2;
        let (supervisor, _handle) = Actor::spawn(Some(config.system_name.clone()), Supervisor, config).await?;

        let started = ask(&supervisor, |reply| SupervisorMessage::Start { reply }, timeout)
            .await
            .unwrap_or_else(|e| Err(BankingError::from_ask("Supervisor", e)));

        match started {
            Ok(()) => Ok(supervisor),
            Err(e) => {
                event!(Level::ERROR, event = supervisor::CHILDREN_SPAWN_FAILED, error = %e);
                supervisor.stop(None);
                Err(e)
            }
        }
    }
}

#[async_trait::async_trait]
impl Actor for Supervisor {
    type Arguments = BankingConfig;
    type Msg = SupervisorMessage;
    type State = SupervisorState;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        config: Self::Arguments
    ) -> Result<Self::State, ActorProcessingErr> {
        event!(Level::DEBUG, event = supervisor::SUPERVISOR_STARTED, system = %config.system_name);

        let supervision = &config.supervision;
        Ok(SupervisorState {
            strategy: Self::strategy(&config),
            running: false,
            bank: None,
            bank_status: ComponentStatus::Stopped,
            bank_generation: 0,
            bank_restarts: RestartBudget::lifetime(supervision.bank_max_restarts),
            coordinator: None,
            coordinator_status: ComponentStatus::Stopped,
            coordinator_generation: 0,
            coordinator_restarts: RestartBudget::new(supervision.max_retries, Some(supervision.retry_window())),
            atms: HashMap::new(),
            atm_generation: 0,
            transfers_routed: 0,
            transfers_completed: 0,
            transfers_failed: 0,
            config
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SupervisorMessage::Start { reply } => {
                let started = self.handle_start(&myself, state).await;
                respond(reply, started, supervisor::REPLY_FAILED);
            }
            SupervisorMessage::Stop => self.handle_stop(state),
            SupervisorMessage::Command { text, reply } => self.handle_command(&myself, text, reply, state).await,
            SupervisorMessage::Execute { command, reply } => match &state.bank {
                Some(bank) => Self::forward(bank, BankMessage::Execute { command, reply }),
                None => respond(reply, Err(bank_unavailable()), supervisor::REPLY_FAILED)
            },
            SupervisorMessage::CreateAccount { request, reply } => match &state.bank {
                Some(bank) => Self::forward(bank, BankMessage::CreateAccount { request, reply }),
                None => respond(reply, Err(bank_unavailable()), supervisor::REPLY_FAILED)
            },
            SupervisorMessage::Transfer { transfer, reply } => match &state.coordinator {
                Some(coordinator) => Self::forward(coordinator, CoordinatorMessage::Transfer { transfer, reply }),
                None => {
                    let reason = coordinator_unavailable().to_string();
                    respond(reply, TransferResponse::failed(reason, None), supervisor::REPLY_FAILED);
                }
            },
            SupervisorMessage::Authenticate { account_number, credential, reply } => match &state.bank {
                Some(bank) => Self::forward(bank, BankMessage::Authenticate { account_number, credential, reply }),
                None => {
                    let response = AuthenticationResponse { success: false, message: bank_unavailable().to_string() };
                    respond(reply, response, supervisor::REPLY_FAILED);
                }
            },
            SupervisorMessage::GetAccountInfo { account_number, reply } => match &state.bank {
                Some(bank) => Self::forward(bank, BankMessage::GetAccountInfo { account_number, reply }),
                None => respond(reply, Err(bank_unavailable()), supervisor::REPLY_FAILED)
            },
            SupervisorMessage::GetAccountHistory { account_number, reply } => match &state.bank {
                Some(bank) => Self::forward(bank, BankMessage::GetAccountHistory { account_number, reply }),
                None => respond(reply, Err(bank_unavailable()), supervisor::REPLY_FAILED)
            },
            SupervisorMessage::GetAllAccounts { reply } => {
                let accounts = match &state.bank {
                    Some(bank) => ask(bank, |reply| BankMessage::GetAllAccounts { reply }, state.config.ask_timeout())
                        .await
                        .map_err(|e| BankingError::from_ask("Bank", e)),
                    None => Err(bank_unavailable())
                };
                respond(reply, accounts, supervisor::REPLY_FAILED);
            }
            SupervisorMessage::GetTransactionHistory { account_number, reply } => {
                let history = self
                    .ask_coordinator(state, |reply| CoordinatorMessage::GetTransactionHistory { account_number, reply })
                    .await;
                respond(reply, history, supervisor::REPLY_FAILED);
            }
            SupervisorMessage::GetTransaction { transaction_id, reply } => {
                let transaction = self
                    .ask_coordinator(state, |reply| CoordinatorMessage::GetTransaction { transaction_id, reply })
                    .await;
                respond(reply, transaction, supervisor::REPLY_FAILED);
            }
            SupervisorMessage::GetTransactionStats { reply } => {
                let stats = self.ask_coordinator(state, |reply| CoordinatorMessage::GetStats { reply }).await;
                respond(reply, stats, supervisor::REPLY_FAILED);
            }
            SupervisorMessage::GetFraudAlerts { account_number, reply } => match &state.bank {
                Some(bank) => Self::forward(bank, BankMessage::GetFraudAlerts { account_number, reply }),
                None => respond(reply, Err(bank_unavailable()), supervisor::REPLY_FAILED)
            },
            SupervisorMessage::GetFraudStats { reply } => match &state.bank {
                Some(bank) => Self::forward(bank, BankMessage::GetFraudStats { reply }),
                None => respond(reply, Err(bank_unavailable()), supervisor::REPLY_FAILED)
            },
            SupervisorMessage::CreateAtm { atm_id, location, initial_cash, reply } => {
                let created = self.create_atm(&myself, atm_id, location, initial_cash, state).await;
                respond(reply, created, supervisor::REPLY_FAILED);
            }
            SupervisorMessage::Atm { atm_id, request, reply } => {
                let explicit = atm_id.is_some();
                let atm_id = atm_id.unwrap_or_else(|| state.config.atm.default_id.clone());
                match state.atms.get(&atm_id) {
                    Some(entry) => Self::forward(&entry.actor, AtmMessage::Request { request, reply }),
                    None => {
                        let message = if explicit {
                            BankingError::AtmNotFound(atm_id).to_string()
                        } else {
                            "No ATM available".to_string()
                        };
                        event!(Level::INFO, event = supervisor::REQUEST_REJECTED, reason = %message);
                        respond(reply, AtmResponse::failed(message), supervisor::REPLY_FAILED);
                    }
                }
            }
            SupervisorMessage::GetStatus { reply } => respond(reply, Self::status(state), supervisor::REPLY_FAILED),
            SupervisorMessage::GetChildren { reply } => {
                let children = SystemChildren {
                    bank:        state.bank.clone(),
                    coordinator: state.coordinator.clone(),
                    atms:        state.atms.iter().map(|(id, entry)| (id.clone(), entry.actor.clone())).collect()
                };
                respond(reply, children, supervisor::REPLY_FAILED);
            }
            SupervisorMessage::TransferRouted(transfer) => {
                state.transfers_routed += 1;
                event!(Level::DEBUG, event = supervisor::TRANSFER_OBSERVED,
                       from = %transfer.from_account, to = %transfer.to_account, amount = %transfer.amount);
            }
            SupervisorMessage::TransferCompleted(transaction) => {
                state.transfers_completed += 1;
                event!(Level::DEBUG, event = supervisor::TRANSFER_OBSERVED,
                       transaction_id = %transaction.id, status = %transaction.status);
            }
            SupervisorMessage::TransferFailed { transaction_id, reason } => {
                state.transfers_failed += 1;
                event!(Level::DEBUG, event = supervisor::TRANSFER_OBSERVED,
                       transaction_id = %transaction_id, reason = %reason);
            }
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
        let id = cell.get_id();

        if state.bank.as_ref().is_some_and(|bank| bank.get_id() == id) {
            return self.handle_bank_exit(&myself, exit, state).await;
        }
        if state.coordinator.as_ref().is_some_and(|coordinator| coordinator.get_id() == id) {
            return self.handle_coordinator_exit(&myself, exit, state).await;
        }
        let atm_id = state.atms.iter().find(|(_, entry)| entry.actor.get_id() == id).map(|(atm_id, _)| atm_id.clone());
        if let Some(atm_id) = atm_id {
            return self.handle_atm_exit(&myself, atm_id, exit, state).await;
        }

        event!(Level::DEBUG, event = supervisor::CHILD_TERMINATED, actor = ?cell.get_name(), message = "stale_child");
        Ok(())
    }

    async fn post_stop(&self, _myself: ActorRef<Self::Msg>, state: &mut Self::State) -> Result<(), ActorProcessingErr> {
        event!(Level::DEBUG, event = supervisor::SUPERVISOR_STOPPED, system = %state.config.system_name);
        Ok(())
    }
}

impl Supervisor {
    async fn handle_start(
        &self,
        myself: &ActorRef<SupervisorMessage>,
        state: &mut SupervisorState
    ) -> Result<(), BankingError> {
        if state.running {
            return Ok(());
        }
        event!(Level::DEBUG, event = supervisor::CHILDREN_SPAWNING, system = %state.config.system_name);

        state.bank_restarts = RestartBudget::lifetime(state.config.supervision.bank_max_restarts);
        state.running = true;

        if let Err(e) = Self::spawn_children(myself, state).await {
            event!(Level::ERROR, event = supervisor::CHILDREN_SPAWN_FAILED, error = %e);
            self.handle_stop(state);
            return Err(BankingError::from(e));
        }

        event!(Level::DEBUG, event = supervisor::CHILDREN_SPAWNED, atms = %state.atms.len());
        event!(Level::INFO, event = supervisor::SYSTEM_STARTED, system = %state.config.system_name);
        Ok(())
    }

    async fn spawn_children(
        myself: &ActorRef<SupervisorMessage>,
        state: &mut SupervisorState
    ) -> Result<(), SpawnErr> {
        Self::spawn_bank(myself, state).await?;
        Self::spawn_coordinator(myself, state).await?;

        let atm = &state.config.atm;
        let (atm_id, location, cash) = (atm.default_id.clone(), atm.default_location.clone(), atm.default_cash);
        Self::spawn_atm(myself, state, atm_id, location, cash, None).await
    }

    /// Stop every child. References are cleared first so their termination
    /// events are recognized as stale and never trigger a restart.
    fn handle_stop(&self, state: &mut SupervisorState) {
        state.running = false;
        state.bank_status = ComponentStatus::Stopped;
        state.coordinator_status = ComponentStatus::Stopped;

        if let Some(bank) = state.bank.take() {
            bank.stop(None);
        }
        if let Some(coordinator) = state.coordinator.take() {
            coordinator.stop(None);
        }
        for (_, entry) in state.atms.drain() {
            entry.actor.stop(None);
        }

        event!(Level::INFO, event = supervisor::SYSTEM_STOPPED, system = %state.config.system_name);
    }

    async fn handle_command(
        &self,
        myself: &ActorRef<SupervisorMessage>,
        text: String,
        reply: RpcReplyPort<CommandResult>,
        state: &mut SupervisorState
    ) {
        let command = match text.parse::<ShorthandCommand>() {
            Ok(command) => command,
            Err(e) => {
                event!(Level::INFO, event = supervisor::REQUEST_REJECTED, command = %text, error = %e);
                respond(reply, Err(e), supervisor::REPLY_FAILED);
                return;
            }
        };

        event!(Level::DEBUG, event = supervisor::REQUEST_ROUTED, command = %text);
        match command {
            ShorthandCommand::Bank(command) => match &state.bank {
                Some(bank) => Self::forward(bank, BankMessage::Execute { command, reply }),
                None => respond(reply, Err(bank_unavailable()), supervisor::REPLY_FAILED)
            },
            ShorthandCommand::Status => {
                respond(reply, Ok(CommandOutcome::SystemStatus(Self::status(state))), supervisor::REPLY_FAILED)
            }
            ShorthandCommand::CreateAtm { atm_id, location, initial_cash } => {
                let created = self.create_atm(myself, atm_id, location, initial_cash, state).await;
                respond(reply, created, supervisor::REPLY_FAILED);
            }
            ShorthandCommand::Atm { atm_id, command } => self.route_atm_command(atm_id, command, reply, state)
        }
    }

    fn route_atm_command(
        &self,
        atm_id: String,
        command: AtmCommand,
        reply: RpcReplyPort<CommandResult>,
        state: &SupervisorState
    ) {
        match state.atms.get(&atm_id) {
            Some(entry) => Self::forward(&entry.actor, AtmMessage::Command { command, reply }),
            None => respond(reply, Err(BankingError::AtmNotFound(atm_id)), supervisor::REPLY_FAILED)
        }
    }

    async fn create_atm(
        &self,
        myself: &ActorRef<SupervisorMessage>,
        atm_id: String,
        location: String,
        initial_cash: Option<Decimal>,
        state: &mut SupervisorState
    ) -> CommandResult {
        if !state.running {
            return Err(BankingError::Unavailable("Banking system".to_string()));
        }
        if state.atms.contains_key(&atm_id) {
            return Err(BankingError::Spawn(format!("ATM {atm_id} already exists")));
        }

        let cash = initial_cash.unwrap_or(state.config.atm.initial_cash);
        Self::spawn_atm(myself, state, atm_id.clone(), location.clone(), cash, None).await?;
        event!(Level::INFO, event = supervisor::CHILDREN_SPAWNED, atm_id = %atm_id, location = %location);

        Ok(CommandOutcome::AtmCreated { atm_id, location })
    }

    async fn ask_coordinator<T, F>(&self, state: &SupervisorState, builder: F) -> Result<T, BankingError>
    where
        T: Send + 'static,
        F: FnOnce(RpcReplyPort<T>) -> CoordinatorMessage
    {
        match &state.coordinator {
            Some(coordinator) => ask(coordinator, builder, state.config.ask_timeout())
                .await
                .map_err(|e| BankingError::from_ask("Transaction coordinator", e)),
            None => Err(coordinator_unavailable())
        }
    }

    fn status(state: &SupervisorState) -> SystemStatus {
        SystemStatus {
            bank:                state.bank_status,
            transactions:        state.coordinator_status,
            atms:                state.atms.len(),
            bank_restarts:       state.bank_restarts.total(),
            transfers_routed:    state.transfers_routed,
            transfers_completed: state.transfers_completed,
            transfers_failed:    state.transfers_failed
        }
    }

    /// Deliver a request to a child; on failure the reply port is dropped and
    /// the requester's ask resolves as unavailable.
    fn forward<M: Message>(actor: &ActorRef<M>, message: M) {
        if let Err(e) = actor.cast(message) {
            event!(Level::WARN, event = supervisor::REQUEST_REJECTED, actor = ?actor.get_name(), error = %e);
        }
    }

    async fn spawn_bank(myself: &ActorRef<SupervisorMessage>, state: &mut SupervisorState) -> Result<(), SpawnErr> {
        state.bank_generation += 1;
        let name = child_name(&myself.get_cell(), &format!("bank-{}", state.bank_generation));
        let args = BankArgs { config: state.config.clone(), owner: Some(myself.clone()) };
        let (bank, _handle) = Actor::spawn_linked(name, Bank, args, myself.get_cell()).await?;

        state.bank = Some(bank);
        state.bank_status = ComponentStatus::Running;
        Ok(())
    }

    async fn spawn_coordinator(
        myself: &ActorRef<SupervisorMessage>,
        state: &mut SupervisorState
    ) -> Result<(), SpawnErr> {
        state.coordinator_generation += 1;
        let name = child_name(&myself.get_cell(), &format!("transactions-{}", state.coordinator_generation));
        let args = CoordinatorArgs {
            bank:        state.bank.clone(),
            owner:       Some(myself.clone()),
            ask_timeout: state.config.ask_timeout()
        };
        let (coordinator, _handle) =
            Actor::spawn_linked(name, TransactionCoordinator, args, myself.get_cell()).await?;

        state.coordinator = Some(coordinator);
        state.coordinator_status = ComponentStatus::Running;
        Ok(())
    }

    /// Spawn (or respawn, keeping the restart budget of `previous`) one ATM
    async fn spawn_atm(
        myself: &ActorRef<SupervisorMessage>,
        state: &mut SupervisorState,
        atm_id: String,
        location: String,
        initial_cash: Decimal,
        previous: Option<AtmEntry>
    ) -> Result<(), SpawnErr> {
        let restarts = match previous {
            Some(entry) => entry.restarts,
            None => state.strategy.budget()
        };
        state.atm_generation += 1;
        let name = child_name(&myself.get_cell(), &format!("atm-{atm_id}-{}", state.atm_generation));
        let args = AtmArgs {
            state:       AtmState::new(atm_id.clone(), location.clone(), initial_cash),
            bank:        state.bank.clone(),
            settings:    state.config.atm.clone(),
            ask_timeout: state.config.ask_timeout()
        };
        let (actor, _handle) = Actor::spawn_linked(name, Atm, args, myself.get_cell()).await?;

        state.atms.insert(atm_id, AtmEntry { actor, location, initial_cash, restarts });
        Ok(())
    }

    fn broadcast_bank(state: &SupervisorState) {
        if let Some(coordinator) = &state.coordinator {
            Self::forward(coordinator, CoordinatorMessage::BankChanged(state.bank.clone()));
        }
        for entry in state.atms.values() {
            Self::forward(&entry.actor, AtmMessage::BankChanged(state.bank.clone()));
        }
    }

    /// Any bank termination is restarted under a fresh name until the lifetime
    /// budget is spent; unrecognized faults are escalated.
    async fn handle_bank_exit(
        &self,
        myself: &ActorRef<SupervisorMessage>,
        exit: ChildExit,
        state: &mut SupervisorState
    ) -> Result<(), ActorProcessingErr> {
        state.bank = None;
        match exit {
            ChildExit::Failed(err) if state.strategy.decide(&err) == Directive::Escalate => {
                return self.escalate("bank", err, state);
            }
            ChildExit::Failed(err) => {
                event!(Level::WARN, event = supervisor::CHILD_FAILED, child = "bank", error = %err);
            }
            ChildExit::Stopped { reason } => {
                event!(Level::WARN, event = supervisor::CHILD_TERMINATED, child = "bank", reason = ?reason);
            }
        }

        if state.bank_restarts.try_acquire() {
            match Self::spawn_bank(myself, state).await {
                Ok(()) => {
                    event!(Level::INFO, event = supervisor::CHILD_RESTARTED,
                           child = "bank", restarts = %state.bank_restarts.total());
                }
                Err(e) => {
                    event!(Level::ERROR, event = supervisor::CHILDREN_SPAWN_FAILED, child = "bank", error = %e);
                    state.bank_status = ComponentStatus::Down;
                }
            }
        } else {
            event!(Level::ERROR, event = supervisor::CHILD_DOWN,
                   child = "bank", restarts = %state.bank_restarts.total());
            state.bank_status = ComponentStatus::Down;
        }

        Self::broadcast_bank(state);
        Ok(())
    }

    /// A stopped coordinator always comes back; a failed one follows the strategy.
    async fn handle_coordinator_exit(
        &self,
        myself: &ActorRef<SupervisorMessage>,
        exit: ChildExit,
        state: &mut SupervisorState
    ) -> Result<(), ActorProcessingErr> {
        state.coordinator = None;
        let directive = match exit {
            ChildExit::Stopped { reason } => {
                event!(Level::WARN, event = supervisor::CHILD_TERMINATED, child = "transactions", reason = ?reason);
                Directive::Restart
            }
            ChildExit::Failed(err) => {
                event!(Level::WARN, event = supervisor::CHILD_FAILED, child = "transactions", error = %err);
                match state.strategy.resolve(&err, &mut state.coordinator_restarts) {
                    Directive::Escalate => return self.escalate("transactions", err, state),
                    directive => directive
                }
            }
        };

        if directive == Directive::Restart {
            match Self::spawn_coordinator(myself, state).await {
                Ok(()) => event!(Level::INFO, event = supervisor::CHILD_RESTARTED, child = "transactions"),
                Err(e) => {
                    event!(Level::ERROR, event = supervisor::CHILDREN_SPAWN_FAILED, child = "transactions", error = %e);
                    state.coordinator_status = ComponentStatus::Down;
                }
            }
        } else {
            event!(Level::ERROR, event = supervisor::CHILD_DOWN, child = "transactions");
            state.coordinator_status = ComponentStatus::Down;
        }
        Ok(())
    }

    /// A stopped ATM is forgotten; a failed one follows the strategy.
    async fn handle_atm_exit(
        &self,
        myself: &ActorRef<SupervisorMessage>,
        atm_id: String,
        exit: ChildExit,
        state: &mut SupervisorState
    ) -> Result<(), ActorProcessingErr> {
        let Some(mut entry) = state.atms.remove(&atm_id) else {
            return Ok(());
        };

        let err = match exit {
            ChildExit::Stopped { reason } => {
                event!(Level::INFO, event = supervisor::CHILD_TERMINATED, child = %atm_id, reason = ?reason);
                return Ok(());
            }
            ChildExit::Failed(err) => err
        };

        event!(Level::WARN, event = supervisor::CHILD_FAILED, child = %atm_id, error = %err);
        match state.strategy.resolve(&err, &mut entry.restarts) {
            Directive::Restart => {
                let (location, cash) = (entry.location.clone(), entry.initial_cash);
                match Self::spawn_atm(myself, state, atm_id.clone(), location, cash, Some(entry)).await {
                    Ok(()) => event!(Level::INFO, event = supervisor::CHILD_RESTARTED, child = %atm_id),
                    Err(e) => {
                        event!(Level::ERROR, event = supervisor::CHILDREN_SPAWN_FAILED, child = %atm_id, error = %e);
                    }
                }
                Ok(())
            }
            Directive::Escalate => self.escalate(&atm_id, err, state),
            Directive::Resume | Directive::Stop => {
                event!(Level::WARN, event = supervisor::CHILD_DOWN, child = %atm_id);
                Ok(())
            }
        }
    }

    /// Tear the system down and fail the supervisor itself.
    fn escalate(
        &self,
        child: &str,
        err: ActorProcessingErr,
        state: &mut SupervisorState
    ) -> Result<(), ActorProcessingErr> {
        event!(Level::ERROR, event = supervisor::FAULT_ESCALATED, child = %child, error = %err);
        self.handle_stop(state);
        Err(err)
    }
}

fn bank_unavailable() -> BankingError {
    BankingError::Unavailable("Bank".to_string())
}

fn coordinator_unavailable() -> BankingError {
    BankingError::Unavailable("Transaction coordinator".to_string())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{actor::atm::tests::MisreportingBank, domain::atm::AtmRequest};

    const TIMEOUT: Duration = Duration::from_secs(1);

    async fn start(name: &str) -> ActorRef<SupervisorMessage> {
        Supervisor::spawn_system(BankingConfig::default().named(name)).await.unwrap()
    }

    async fn status(supervisor: &ActorRef<SupervisorMessage>) -> SystemStatus {
        ask(supervisor, |reply| SupervisorMessage::GetStatus { reply }, TIMEOUT).await.unwrap()
    }

    async fn children(supervisor: &ActorRef<SupervisorMessage>) -> SystemChildren {
        ask(supervisor, |reply| SupervisorMessage::GetChildren { reply }, TIMEOUT).await.unwrap()
    }

    async fn command(supervisor: &ActorRef<SupervisorMessage>, text: &str) -> CommandResult {
        ask(supervisor, |reply| SupervisorMessage::Command { text: text.to_string(), reply }, TIMEOUT).await.unwrap()
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    #[tokio::test]
    async fn start_spawns_every_child() {
        let supervisor = start("supervisor-test-start").await;

        let status = status(&supervisor).await;
        assert_eq!(status.bank, ComponentStatus::Running);
        assert_eq!(status.transactions, ComponentStatus::Running);
        assert_eq!(status.atms, 1);
        assert_eq!(status.bank_restarts, 0);

        let children = children(&supervisor).await;
        assert!(children.bank.is_some());
        assert!(children.coordinator.is_some());
        assert!(children.atms.contains_key("default"));

        match command(&supervisor, "status").await {
            Ok(CommandOutcome::SystemStatus(reported)) => assert_eq!(reported.bank, ComponentStatus::Running),
            other => panic!("unexpected status reply {other:?}")
        }

        supervisor.stop(None);
    }

    #[tokio::test]
    async fn bank_restarts_three_times_then_stays_down() {
        let supervisor = start("supervisor-test-bank-budget").await;

        for restart in 1..=3 {
            let bank = children(&supervisor).await.bank.unwrap();
            bank.stop(None);
            settle().await;

            let status = status(&supervisor).await;
            assert_eq!(status.bank, ComponentStatus::Running);
            assert_eq!(status.bank_restarts, restart);
            assert_ne!(children(&supervisor).await.bank.unwrap().get_id(), bank.get_id());
        }

        children(&supervisor).await.bank.unwrap().stop(None);
        settle().await;

        let status = status(&supervisor).await;
        assert_eq!(status.bank, ComponentStatus::Down);
        assert_eq!(status.bank_restarts, 3);
        assert!(children(&supervisor).await.bank.is_none());
        assert_eq!(command(&supervisor, "balance:1001").await, Err(bank_unavailable()));

        supervisor.stop(None);
    }

    #[tokio::test]
    async fn coordinator_always_restarts() {
        let supervisor = start("supervisor-test-coordinator").await;

        for _ in 0..5 {
            children(&supervisor).await.coordinator.unwrap().stop(None);
            settle().await;
        }

        assert_eq!(status(&supervisor).await.transactions, ComponentStatus::Running);
        supervisor.stop(None);
    }

    #[tokio::test]
    async fn stopped_atm_is_forgotten() {
        let supervisor = start("supervisor-test-atm").await;

        children(&supervisor).await.atms["default"].stop(None);
        settle().await;
        assert_eq!(status(&supervisor).await.atms, 0);

        let response = ask(
            &supervisor,
            |reply| SupervisorMessage::Atm {
                atm_id: None,
                request: AtmRequest::balance_inquiry("1001", "secret"),
                reply
            },
            TIMEOUT
        )
        .await
        .unwrap();
        assert_eq!(response.message, "No ATM available");

        supervisor.stop(None);
    }

    #[tokio::test]
    async fn faulted_atm_is_restarted_fresh() {
        let supervisor = start("supervisor-test-atm-fault").await;
        let atm = children(&supervisor).await.atms["default"].clone();
        let (misreporting, _) = Actor::spawn(None, MisreportingBank, ()).await.unwrap();
        atm.cast(AtmMessage::BankChanged(Some(misreporting.clone()))).unwrap();

        let response = ask(
            &supervisor,
            |reply| SupervisorMessage::Atm {
                atm_id: None,
                request: AtmRequest::withdraw("1001", "secret", Decimal::from(20)),
                reply
            },
            TIMEOUT * 3
        )
        .await
        .unwrap();
        assert!(!response.success);
        settle().await;

        let restarted = children(&supervisor).await.atms["default"].clone();
        assert_ne!(restarted.get_id(), atm.get_id());
        match command(&supervisor, "atm:default:status").await {
            Ok(CommandOutcome::AtmStatus(state)) => assert_eq!(state.transaction_count, 0),
            other => panic!("unexpected ATM status {other:?}")
        }
        assert_eq!(status(&supervisor).await.bank, ComponentStatus::Running);

        misreporting.stop(None);
        supervisor.stop(None);
    }

    #[tokio::test]
    async fn atms_are_created_and_operated_by_command() {
        let supervisor = start("supervisor-test-create-atm").await;

        assert_eq!(
            command(&supervisor, "create-atm:lobby:Lobby:2500").await,
            Ok(CommandOutcome::AtmCreated { atm_id: "lobby".to_string(), location: "Lobby".to_string() })
        );
        assert!(command(&supervisor, "create-atm:lobby:Lobby").await.is_err());

        match command(&supervisor, "atm:lobby:refill:500").await {
            Ok(CommandOutcome::AtmRefilled(atm)) => assert_eq!(atm.cash_available, Decimal::from(3000)),
            other => panic!("unexpected refill reply {other:?}")
        }
        assert_eq!(
            command(&supervisor, "atm:nowhere:status").await,
            Err(BankingError::AtmNotFound("nowhere".to_string()))
        );
        assert_eq!(status(&supervisor).await.atms, 2);

        supervisor.stop(None);
    }

    #[tokio::test]
    async fn stop_then_start_rebuilds_the_system() {
        let supervisor = start("supervisor-test-restart").await;

        supervisor.cast(SupervisorMessage::Stop).unwrap();
        settle().await;
        let stopped = status(&supervisor).await;
        assert_eq!(stopped.bank, ComponentStatus::Stopped);
        assert_eq!(stopped.atms, 0);
        assert_eq!(command(&supervisor, "deposit:1001:5").await, Err(bank_unavailable()));

        ask(&supervisor, |reply| SupervisorMessage::Start { reply }, TIMEOUT).await.unwrap().unwrap();
        let running = status(&supervisor).await;
        assert_eq!(running.bank, ComponentStatus::Running);
        assert_eq!(running.bank_restarts, 0);

        supervisor.stop(None);
    }

    #[tokio::test]
    async fn start_right_after_stop_succeeds() {
        let supervisor = start("supervisor-test-quick-restart").await;

        supervisor.cast(SupervisorMessage::Stop).unwrap();
        let started = ask(&supervisor, |reply| SupervisorMessage::Start { reply }, TIMEOUT).await.unwrap();
        assert_eq!(started, Ok(()));

        let running = status(&supervisor).await;
        assert_eq!(running.bank, ComponentStatus::Running);
        assert_eq!(running.transactions, ComponentStatus::Running);
        assert_eq!(running.atms, 1);
        assert!(children(&supervisor).await.atms.contains_key("default"));

        supervisor.stop(None);
    }

    #[tokio::test]
    async fn malformed_commands_are_answered() {
        let supervisor = start("supervisor-test-malformed").await;

        for text in ["deposit:1001", "withdraw:x:y", "atm:default", "launch:rockets"] {
            assert!(matches!(command(&supervisor, text).await, Err(BankingError::InvalidCommandFormat { .. })));
        }
        assert_eq!(status(&supervisor).await.bank, ComponentStatus::Running);

        supervisor.stop(None);
    }
}
