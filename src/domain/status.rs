//! Supervisor-level view of the system

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentStatus {
    /// Child is alive
    Running,
    /// Restart budget exhausted; stays absent until the system is restarted
    Down,
    /// Not started, or stopped on request
    Stopped
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ComponentStatus::Running => "Running",
            ComponentStatus::Down => "Down",
            ComponentStatus::Stopped => "Stopped"
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub bank:                ComponentStatus,
    pub transactions:        ComponentStatus,
    pub atms:                usize,
    pub bank_restarts:       u32,
    pub transfers_routed:    u64,
    pub transfers_completed: u64,
    pub transfers_failed:    u64
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Banking System Status - Bank: {}, Transactions: {}, ATMs: {}, Restarts: {}, \
             Transfers routed/completed/failed: {}/{}/{}",
            self.bank,
            self.transactions,
            self.atms,
            self.bank_restarts,
            self.transfers_routed,
            self.transfers_completed,
            self.transfers_failed
        )
    }
}
