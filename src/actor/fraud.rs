//! FraudEngine Actor - streaming fraud monitoring
//!
//! Child of the bank. Runs every settled transfer through a `FraudDetector`
//! and reports each alert back to the bank, which decides on enforcement.

use chrono::Utc;
use ractor::{Actor, ActorProcessingErr, ActorRef};
use tracing::{Level, event};

use crate::{
    actor::message::{BankMessage, FraudMessage},
    config::FraudSettings,
    domain::{constant::fraud, fraud::FraudDetector},
    runtime::respond
};

pub struct FraudEngineState {
    detector: FraudDetector,
    /// Owner that receives every alert
    bank:     Option<ActorRef<BankMessage>>
}

pub struct FraudEngine;

#[async_trait::async_trait]
impl Actor for FraudEngine {
    type Arguments = (FraudSettings, Option<ActorRef<BankMessage>>);
    type Msg = FraudMessage;
    type State = FraudEngineState;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        (settings, bank): Self::Arguments
    ) -> Result<Self::State, ActorProcessingErr> {
        event!(Level::DEBUG, event = fraud::ENGINE_STARTED);

        Ok(FraudEngineState { detector: FraudDetector::new(settings), bank })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State
    ) -> Result<(), ActorProcessingErr> {
        match message {
            FraudMessage::Monitor(transaction) => {
                let alerts = state.detector.analyze(&transaction);
                event!(Level::DEBUG, event = fraud::TRANSACTION_MONITORED,
                       transaction_id = %transaction.id, alerts = %alerts.len());

                for alert in alerts {
                    event!(Level::WARN, event = fraud::ALERT_RAISED,
                           account_number = %alert.account_number, severity = ?alert.severity, reason = %alert.reason);
                    if let Some(bank) = &state.bank
                        && let Err(e) = bank.cast(BankMessage::FraudDetected(alert))
                    {
                        event!(Level::ERROR, event = fraud::ALERT_RAISED, error = %e, message = "owner_unreachable");
                    }
                }
            }
            FraudMessage::GetAlerts { account_number, reply } => {
                respond(reply, state.detector.alerts_for(&account_number), fraud::REPLY_FAILED);
            }
            FraudMessage::GetStats { reply } => {
                respond(reply, state.detector.stats(Utc::now()), fraud::REPLY_FAILED);
            }
        }
        Ok(())
    }
}
