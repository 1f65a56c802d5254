//! Bounded request/response on top of ractor's `call`

use std::time::Duration;

use ractor::{ActorRef, Message, RpcReplyPort, rpc::CallResult};
use thiserror::Error;
use tracing::{Level, event};

/// Why an ask produced no reply
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AskError {
    /// The recipient did not answer in time; its work is not cancelled
    #[error("no reply within {0:?}")]
    Timeout(Duration),
    /// The recipient dropped the reply port without answering
    #[error("reply port dropped")]
    Dropped,
    /// The message could not be delivered
    #[error("recipient unreachable: {0}")]
    Unreachable(String)
}

/// Send a request built around a fresh reply port and wait at most `timeout`.
pub async fn ask<TMsg, TReply, F>(actor: &ActorRef<TMsg>, builder: F, timeout: Duration) -> Result<TReply, AskError>
where
    TMsg: Message,
    TReply: Send + 'static,
    F: FnOnce(RpcReplyPort<TReply>) -> TMsg
{
    match actor.call(builder, Some(timeout)).await {
        Ok(CallResult::Success(reply)) => Ok(reply),
        Ok(CallResult::Timeout) => Err(AskError::Timeout(timeout)),
        Ok(CallResult::SenderError) => Err(AskError::Dropped),
        Err(e) => Err(AskError::Unreachable(e.to_string()))
    }
}

/// Answer a reply port, logging (never failing) when the asker is gone.
pub fn respond<T>(reply: RpcReplyPort<T>, value: T, event_name: &'static str)
where
    T: Send + 'static
{
    if reply.send(value).is_err() {
        event!(Level::DEBUG, event = event_name, message = "requester_gone");
    }
}
