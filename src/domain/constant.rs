//! Domain Events - Structured events for internal monitoring and debugging

/// Counterparty used for deposits and withdrawals
pub const EXTERNAL_ACCOUNT: &str = "EXTERNAL";

/// Supervisor Actor Events
pub mod supervisor {
    pub const SUPERVISOR_STARTED: &str = "supervisor.started";
    pub const SUPERVISOR_STOPPED: &str = "supervisor.stopped";
    pub const CHILDREN_SPAWNING: &str = "children.spawning";
    pub const CHILDREN_SPAWNED: &str = "children.spawned";
    pub const CHILDREN_SPAWN_FAILED: &str = "children.spawn_failed";
    pub const CHILD_TERMINATED: &str = "child.terminated";
    pub const CHILD_FAILED: &str = "child.failed";
    pub const CHILD_RESTARTED: &str = "child.restarted";
    pub const CHILD_DOWN: &str = "child.down";
    pub const FAULT_ESCALATED: &str = "fault.escalated";
    pub const SYSTEM_STARTED: &str = "system.started";
    pub const SYSTEM_STOPPED: &str = "system.stopped";
    pub const REQUEST_ROUTED: &str = "request.routed";
    pub const REQUEST_REJECTED: &str = "request.rejected";
    pub const TRANSFER_OBSERVED: &str = "transfer.observed";
    pub const REPLY_FAILED: &str = "reply.failed";
}

/// Bank Registry Actor Events
pub mod bank {
    pub const BANK_STARTED: &str = "bank.started";
    pub const BANK_STOPPED: &str = "bank.stopped";
    pub const ACCOUNT_CREATED: &str = "account.created";
    pub const ACCOUNT_CREATION_FAILED: &str = "account.creation_failed";
    pub const ACCOUNT_REMOVED: &str = "account.removed";
    pub const COMMAND_ROUTED: &str = "command.routed";
    pub const COMMAND_REJECTED: &str = "command.rejected";
    pub const TRANSFER_ROUTED: &str = "transfer.routed";
    pub const TRANSFER_REJECTED: &str = "transfer.rejected";
    pub const FRAUD_REPORTED: &str = "fraud.reported";
    pub const FRAUD_ENFORCED: &str = "fraud.enforced";
    pub const FRAUD_ENGINE_RESTARTED: &str = "fraud_engine.restarted";
    pub const REPLY_FAILED: &str = "reply.failed";
}

/// Account Actor Events
pub mod account {
    pub const ACCOUNT_STARTED: &str = "account.started";
    pub const DEPOSITED: &str = "account.deposited";
    pub const WITHDRAWN: &str = "account.withdrawn";
    pub const DEBITED: &str = "transfer.debited";
    pub const CREDITED: &str = "transfer.credited";
    pub const OPERATION_REJECTED: &str = "operation.rejected";
    pub const CREDIT_UNDELIVERED: &str = "transfer.credit_undelivered";
    pub const MISROUTED: &str = "transfer.misrouted";
    pub const FROZEN: &str = "account.frozen";
    pub const UNFROZEN: &str = "account.unfrozen";
    pub const AUTHENTICATED: &str = "account.authenticated";
    pub const REPLY_FAILED: &str = "reply.failed";
}

/// Transaction Coordinator Actor Events
pub mod coordinator {
    pub const COORDINATOR_STARTED: &str = "coordinator.started";
    pub const TRANSFER_PENDING: &str = "transfer.pending";
    pub const TRANSFER_COMPLETED: &str = "transfer.completed";
    pub const TRANSFER_FAILED: &str = "transfer.failed";
    pub const OUTCOME_IGNORED: &str = "outcome.ignored";
    pub const BANK_CHANGED: &str = "bank.changed";
    pub const REPLY_FAILED: &str = "reply.failed";
}

/// Fraud Engine Actor Events
pub mod fraud {
    pub const ENGINE_STARTED: &str = "fraud.started";
    pub const TRANSACTION_MONITORED: &str = "transaction.monitored";
    pub const ALERT_RAISED: &str = "alert.raised";
    pub const REPLY_FAILED: &str = "reply.failed";
}

/// ATM Gateway Actor Events
pub mod atm {
    pub const ATM_STARTED: &str = "atm.started";
    pub const ATM_STOPPED: &str = "atm.stopped";
    pub const REQUEST_RECEIVED: &str = "request.received";
    pub const REQUEST_REJECTED: &str = "request.rejected";
    pub const AUTHENTICATION_FAILED: &str = "authentication.failed";
    pub const OPERATION_COMPLETED: &str = "operation.completed";
    pub const OPERATION_FAILED: &str = "operation.failed";
    pub const REFILLED: &str = "atm.refilled";
    pub const BANK_CHANGED: &str = "bank.changed";
    pub const REPLY_FAILED: &str = "reply.failed";
}
