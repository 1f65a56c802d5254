use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration
};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::fraud::FraudSeverity;

/// Runtime configuration of the banking system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankingConfig {
    /// Prefix of every actor name spawned by one supervisor
    pub system_name:    String,
    /// Upper bound for every ask between actors
    pub ask_timeout_ms: u64,
    pub accounts:       AccountSettings,
    pub atm:            AtmSettings,
    pub fraud:          FraudSettings,
    pub supervision:    SupervisionSettings
}

impl Default for BankingConfig {
    fn default() -> Self {
        Self {
            system_name:    "banking".to_string(),
            ask_timeout_ms: 5_000,
            accounts:       AccountSettings::default(),
            atm:            AtmSettings::default(),
            fraud:          FraudSettings::default(),
            supervision:    SupervisionSettings::default()
        }
    }
}

impl BankingConfig {
    pub fn ask_timeout(&self) -> Duration {
        Duration::from_millis(self.ask_timeout_ms)
    }

    /// Same settings under a different actor-name prefix
    pub fn named(mut self, system_name: impl Into<String>) -> Self {
        self.system_name = system_name.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountSettings {
    /// Account numbers are assigned strictly above this value
    pub number_floor: u64
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self { number_floor: 1000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtmSettings {
    /// Per-transaction withdrawal ceiling
    pub withdrawal_limit: Decimal,
    /// Cash level restored by `refill`
    pub refill_amount:    Decimal,
    /// Drawer cash of ATMs created without an explicit amount
    pub initial_cash:     Decimal,
    pub default_id:       String,
    pub default_location: String,
    /// Drawer cash of the ATM created on start
    pub default_cash:     Decimal
}

impl Default for AtmSettings {
    fn default() -> Self {
        Self {
            withdrawal_limit: Decimal::from(1_000),
            refill_amount:    Decimal::from(50_000),
            initial_cash:     Decimal::from(50_000),
            default_id:       "default".to_string(),
            default_location: "Main Branch".to_string(),
            default_cash:     Decimal::from(100_000)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FraudSettings {
    /// Transfers above this are High
    pub large_amount:          Decimal,
    /// Transfers above this are Critical
    pub critical_amount:       Decimal,
    pub frequency_window_secs: u64,
    /// More outgoing transfers than this in the window is High
    pub frequency_high:        usize,
    /// More outgoing transfers than this in the window is Critical
    pub frequency_critical:    usize,
    /// Transfers before this UTC hour are unusual
    pub quiet_hours_end:       u32,
    /// Gap below which two transfers from one account are rapid
    pub rapid_succession_ms:   u64,
    /// Alerts at or above this severity freeze the account
    pub freeze_at:             FraudSeverity
}

impl Default for FraudSettings {
    fn default() -> Self {
        Self {
            large_amount:          Decimal::from(10_000),
            critical_amount:       Decimal::from(50_000),
            frequency_window_secs: 30 * 60,
            frequency_high:        10,
            frequency_critical:    20,
            quiet_hours_end:       6,
            rapid_succession_ms:   5_000,
            freeze_at:             FraudSeverity::High
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisionSettings {
    /// Lifetime cap on bank registry restarts
    pub bank_max_restarts:   u32,
    /// Fault-driven restarts allowed per child within `retry_window_secs`
    pub max_retries:         u32,
    pub retry_window_secs:   u64,
    /// Bound on waiting for children during a stop
    pub shutdown_timeout_ms: u64
}

impl Default for SupervisionSettings {
    fn default() -> Self {
        Self { bank_max_restarts: 3, max_retries: 3, retry_window_secs: 60, shutdown_timeout_ms: 2_000 }
    }
}

impl SupervisionSettings {
    pub fn retry_window(&self) -> Duration {
        Duration::from_secs(self.retry_window_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

/// Get the project directories for cross-platform config path resolution
pub fn get_project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "actor-bank").context("Failed to determine project directories")
}

/// Get the configuration directory path
pub fn get_config_dir() -> Result<PathBuf> {
    let project_dirs = get_project_dirs()?;
    Ok(project_dirs.config_dir().to_path_buf())
}

/// Get the config file path
pub fn get_config_file_path() -> Result<PathBuf> {
    let config_dir = get_config_dir()?;
    Ok(config_dir.join("config.yaml"))
}

/// Load configuration from the default location, falling back to defaults
pub fn load_config() -> Result<BankingConfig> {
    load_config_from(&get_config_file_path()?)
}

/// Load configuration from a file; a missing file yields defaults
pub fn load_config_from(path: &Path) -> Result<BankingConfig> {
    if !path.exists() {
        return Ok(BankingConfig::default());
    }

    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Save configuration to a file, creating parent directories
pub fn save_config_to(config: &BankingConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }

    let content = serde_yaml::to_string(config).context("Failed to serialize config")?;

    fs::write(path, content).with_context(|| format!("Failed to write config file: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config, BankingConfig::default());
        assert_eq!(config.ask_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let yaml = "ask_timeout_ms: 250\natm:\n  withdrawal_limit: 400\nfraud:\n  freeze_at: Critical\n";
        fs::write(&path, yaml).unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.ask_timeout_ms, 250);
        assert_eq!(config.atm.withdrawal_limit, Decimal::from(400));
        assert_eq!(config.atm.default_id, "default");
        assert_eq!(config.fraud.freeze_at, FraudSeverity::Critical);
        assert_eq!(config.supervision.bank_max_restarts, 3);
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let config = BankingConfig::default().named("branch-7");

        save_config_to(&config, &path).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), config);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "ask_timeout_ms: [not, a, number]").unwrap();
        assert!(load_config_from(&path).is_err());
    }
}
