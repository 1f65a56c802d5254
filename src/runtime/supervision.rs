//! Supervision: fault classification, directives and restart budgets
//!
//! ractor stops an actor whose handler returns `Err` and reports the failure to
//! its linked parent. The parent then consults its `SupervisionStrategy`:
//!
//! - `Resume` is applied on the child side (`absorb`): the strategy is handed
//!   to the child at spawn, which swallows the fault and keeps its state.
//! - `Restart`, `Stop` and `Escalate` are applied by the parent in
//!   `handle_supervisor_evt`; a `Restart` that exceeds the `RestartBudget`
//!   becomes `Stop`.

use std::{
    collections::VecDeque,
    time::{Duration, Instant}
};

use ractor::{ActorCell, ActorProcessingErr, SupervisionEvent};
use thiserror::Error;
use tracing::{Level, event};

/// Faults an actor may raise on purpose. Anything else is unrecognized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// A collaborator answered outside its protocol
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A message reached an actor that has no role in it
    #[error("misrouted message: {0}")]
    Misrouted(String)
}

/// A child failure as seen by its parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultKind {
    Known(Fault),
    Unknown(String)
}

impl FaultKind {
    pub fn classify(err: &ActorProcessingErr) -> Self {
        match err.downcast_ref::<Fault>() {
            Some(fault) => FaultKind::Known(fault.clone()),
            None => FaultKind::Unknown(err.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Drop the failing message, keep the child and its state
    Resume,
    /// Replace the child with a fresh instance
    Restart,
    /// Let the child stay terminated
    Stop,
    /// Fail the parent as well
    Escalate
}

pub type Decider = fn(&FaultKind) -> Directive;

/// One-for-one strategy: each child is judged on its own faults
#[derive(Debug, Clone)]
pub struct SupervisionStrategy {
    decider:     Decider,
    max_retries: u32,
    within:      Option<Duration>
}

impl SupervisionStrategy {
    pub fn one_for_one(max_retries: u32, within: Option<Duration>, decider: Decider) -> Self {
        Self { decider, max_retries, within }
    }

    pub fn decide(&self, err: &ActorProcessingErr) -> Directive {
        (self.decider)(&FaultKind::classify(err))
    }

    /// Fresh budget sized by this strategy, one per supervised child
    pub fn budget(&self) -> RestartBudget {
        RestartBudget::new(self.max_retries, self.within)
    }

    /// Parent side: the directive to apply, with `Restart` charged to `budget`.
    pub fn resolve(&self, err: &ActorProcessingErr, budget: &mut RestartBudget) -> Directive {
        match self.decide(err) {
            Directive::Restart if !budget.try_acquire() => Directive::Stop,
            directive => directive
        }
    }

    /// Child side: swallow faults this strategy resumes, pass the rest on.
    pub fn absorb(&self, actor: &str, result: Result<(), ActorProcessingErr>) -> Result<(), ActorProcessingErr> {
        match result {
            Err(err) if self.decide(&err) == Directive::Resume => {
                event!(Level::WARN, event = "fault.resumed", actor = %actor, error = %err);
                Ok(())
            }
            other => other
        }
    }
}

/// At most `max_retries` restarts within a sliding window (or ever, without one)
#[derive(Debug, Clone)]
pub struct RestartBudget {
    max_retries: u32,
    within:      Option<Duration>,
    restarts:    VecDeque<Instant>,
    total:       u32
}

impl RestartBudget {
    pub fn new(max_retries: u32, within: Option<Duration>) -> Self {
        Self { max_retries, within, restarts: VecDeque::new(), total: 0 }
    }

    pub fn lifetime(max_retries: u32) -> Self {
        Self::new(max_retries, None)
    }

    pub fn try_acquire(&mut self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    pub fn try_acquire_at(&mut self, now: Instant) -> bool {
        if let Some(window) = self.within {
            while let Some(oldest) = self.restarts.front() {
                if now.saturating_duration_since(*oldest) < window {
                    break;
                }
                self.restarts.pop_front();
            }
        }

        if self.restarts.len() as u32 >= self.max_retries {
            return false;
        }

        self.restarts.push_back(now);
        self.total += 1;
        true
    }

    /// Restarts granted over the budget's lifetime
    pub fn total(&self) -> u32 {
        self.total
    }
}

/// How a linked child went away
#[derive(Debug)]
pub enum ChildExit {
    Stopped { reason: Option<String> },
    Failed(ActorProcessingErr)
}

/// Reduce a supervision event to a child termination, ignoring the rest.
pub fn child_exit(message: SupervisionEvent) -> Option<(ActorCell, ChildExit)> {
    match message {
        SupervisionEvent::ActorTerminated(cell, _, reason) => Some((cell, ChildExit::Stopped { reason })),
        SupervisionEvent::ActorFailed(cell, err) => Some((cell, ChildExit::Failed(err))),
        _ => None
    }
}

/// Hierarchical actor name; names are global in ractor, so children carry their parent's prefix.
pub fn child_name(parent: &ActorCell, child: &str) -> Option<String> {
    parent.get_name().map(|name| format!("{name}/{child}"))
}
