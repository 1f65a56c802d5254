//! Streaming fraud heuristics
//!
//! `FraudDetector` keeps per-account history and runs four independent rules
//! against each settled transfer. Rules see the history as it was *before* the
//! transfer; the transfer is recorded only after all of them ran.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Timelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{config::FraudSettings, domain::transaction::Transaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FraudSeverity {
    Low,
    Medium,
    High,
    Critical
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FraudAlert {
    pub account_number: String,
    pub reason:         String,
    pub amount:         Decimal,
    pub detected_at:    DateTime<Utc>,
    pub severity:       FraudSeverity
}

impl FraudAlert {
    fn raise(transaction: &Transaction, reason: String, severity: FraudSeverity) -> Self {
        Self {
            account_number: transaction.from_account.clone(),
            reason,
            amount: transaction.amount,
            detected_at: Utc::now(),
            severity
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FraudStats {
    pub total_alerts:       usize,
    pub high_or_above:      usize,
    pub critical:           usize,
    pub last_24_hours:      usize,
    pub monitored_accounts: usize
}

pub struct FraudDetector {
    settings:         FraudSettings,
    history:          HashMap<String, Vec<Transaction>>,
    last_transaction: HashMap<String, DateTime<Utc>>,
    alerts:           Vec<FraudAlert>
}

impl FraudDetector {
    pub fn new(settings: FraudSettings) -> Self {
        Self { settings, history: HashMap::new(), last_transaction: HashMap::new(), alerts: Vec::new() }
    }

    /// Evaluate one settled transfer. Deposits and withdrawals are exempt.
    pub fn analyze(&mut self, transaction: &Transaction) -> Vec<FraudAlert> {
        if transaction.is_external() {
            return Vec::new();
        }

        let alerts: Vec<FraudAlert> = [
            self.check_large_amount(transaction),
            self.check_frequency(transaction),
            self.check_timing(transaction),
            self.check_rapid_succession(transaction)
        ]
        .into_iter()
        .flatten()
        .collect();

        self.record(transaction);
        self.alerts.extend(alerts.iter().cloned());
        alerts
    }

    /// Alerts for one account, newest first
    pub fn alerts_for(&self, account_number: &str) -> Vec<FraudAlert> {
        let mut alerts: Vec<FraudAlert> =
            self.alerts.iter().rev().filter(|alert| alert.account_number == account_number).cloned().collect();
        alerts.sort_by(|a, b| b.detected_at.cmp(&a.detected_at));
        alerts
    }

    pub fn stats(&self, now: DateTime<Utc>) -> FraudStats {
        let since = now - Duration::hours(24);
        FraudStats {
            total_alerts:       self.alerts.len(),
            high_or_above:      self.alerts.iter().filter(|a| a.severity >= FraudSeverity::High).count(),
            critical:           self.alerts.iter().filter(|a| a.severity == FraudSeverity::Critical).count(),
            last_24_hours:      self.alerts.iter().filter(|a| a.detected_at > since).count(),
            monitored_accounts: self.history.len()
        }
    }

    fn check_large_amount(&self, transaction: &Transaction) -> Option<FraudAlert> {
        if transaction.amount <= self.settings.large_amount {
            return None;
        }
        let severity = if transaction.amount > self.settings.critical_amount {
            FraudSeverity::Critical
        } else {
            FraudSeverity::High
        };
        Some(FraudAlert::raise(transaction, format!("Large transaction: {}", transaction.amount), severity))
    }

    fn check_frequency(&self, transaction: &Transaction) -> Option<FraudAlert> {
        let window_start = transaction.timestamp - Duration::seconds(self.settings.frequency_window_secs as i64);
        let prior = self
            .history
            .get(&transaction.from_account)
            .map(|history| {
                history
                    .iter()
                    .filter(|t| t.from_account == transaction.from_account && t.timestamp > window_start)
                    .count()
            })
            .unwrap_or(0);
        let count = prior + 1;

        if count <= self.settings.frequency_high {
            return None;
        }
        let severity =
            if count > self.settings.frequency_critical { FraudSeverity::Critical } else { FraudSeverity::High };
        Some(FraudAlert::raise(
            transaction,
            format!(
                "High frequency transactions: {count} in {} minutes",
                self.settings.frequency_window_secs / 60
            ),
            severity
        ))
    }

    fn check_timing(&self, transaction: &Transaction) -> Option<FraudAlert> {
        if transaction.timestamp.hour() >= self.settings.quiet_hours_end {
            return None;
        }
        Some(FraudAlert::raise(
            transaction,
            format!("Unusual timing: transaction at {}", transaction.timestamp.format("%H:%M")),
            FraudSeverity::Medium
        ))
    }

    fn check_rapid_succession(&self, transaction: &Transaction) -> Option<FraudAlert> {
        let last = self.last_transaction.get(&transaction.from_account)?;
        let gap = transaction.timestamp.signed_duration_since(*last);
        if gap >= Duration::milliseconds(self.settings.rapid_succession_ms as i64) {
            return None;
        }
        let seconds = gap.num_milliseconds() as f64 / 1000.0;
        Some(FraudAlert::raise(
            transaction,
            format!("Rapid succession transactions: {seconds:.1} seconds apart"),
            FraudSeverity::High
        ))
    }

    fn record(&mut self, transaction: &Transaction) {
        self.history.entry(transaction.from_account.clone()).or_default().push(transaction.clone());
        self.history.entry(transaction.to_account.clone()).or_default().push(transaction.clone());
        self.last_transaction.insert(transaction.from_account.clone(), transaction.timestamp);
    }
}
