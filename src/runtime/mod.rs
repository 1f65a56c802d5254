//! Actor runtime helpers layered over ractor

pub mod ask;
pub mod supervision;

pub use ask::{AskError, ask, respond};
pub use supervision::{
    ChildExit, Decider, Directive, Fault, FaultKind, RestartBudget, SupervisionStrategy, child_exit, child_name
};
