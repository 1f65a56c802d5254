//! Textual shorthand commands
//!
//! `deposit:<acct>:<amount>` and friends are parsed once into a closed set of
//! typed commands. Anything that does not parse becomes an
//! `InvalidCommandFormat` reply value.

use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{atm::AtmState, error::BankingError, status::SystemStatus};

const DEPOSIT_USAGE: &str = "deposit:accountNumber:amount";
const WITHDRAW_USAGE: &str = "withdraw:accountNumber:amount";
const BALANCE_USAGE: &str = "balance:accountNumber";
const FREEZE_USAGE: &str = "freeze:accountNumber:reason";
const UNFREEZE_USAGE: &str = "unfreeze:accountNumber";
const CREATE_ATM_USAGE: &str = "create-atm:id:location[:initialCash]";
const ATM_USAGE: &str = "atm:id:status|refill|refill:amount";

/// Commands handled by the bank registry and routed to one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BankCommand {
    Deposit { account_number: String, amount: Decimal, description: String },
    Withdraw { account_number: String, amount: Decimal, description: String },
    Balance { account_number: String },
    Freeze { account_number: String, reason: String },
    Unfreeze { account_number: String }
}

impl BankCommand {
    pub fn deposit(account_number: impl Into<String>, amount: Decimal) -> Self {
        BankCommand::Deposit { account_number: account_number.into(), amount, description: "Deposit".to_string() }
    }

    pub fn withdraw(account_number: impl Into<String>, amount: Decimal) -> Self {
        BankCommand::Withdraw {
            account_number: account_number.into(),
            amount,
            description: "Withdrawal".to_string()
        }
    }

    pub fn balance(account_number: impl Into<String>) -> Self {
        BankCommand::Balance { account_number: account_number.into() }
    }

    pub fn account_number(&self) -> &str {
        match self {
            BankCommand::Deposit { account_number, .. }
            | BankCommand::Withdraw { account_number, .. }
            | BankCommand::Balance { account_number }
            | BankCommand::Freeze { account_number, .. }
            | BankCommand::Unfreeze { account_number } => account_number
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BankCommand::Deposit { .. } => "deposit",
            BankCommand::Withdraw { .. } => "withdraw",
            BankCommand::Balance { .. } => "balance",
            BankCommand::Freeze { .. } => "freeze",
            BankCommand::Unfreeze { .. } => "unfreeze"
        }
    }
}

/// Operational subcommands of one ATM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AtmCommand {
    Status,
    Refill,
    RefillBy(Decimal)
}

/// Every shorthand the supervisor understands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShorthandCommand {
    Bank(BankCommand),
    Status,
    CreateAtm { atm_id: String, location: String, initial_cash: Option<Decimal> },
    Atm { atm_id: String, command: AtmCommand }
}

impl FromStr for ShorthandCommand {
    type Err = BankingError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        let (verb, rest) = input.split_once(':').unwrap_or((input, ""));

        match verb {
            "status" if rest.is_empty() => Ok(ShorthandCommand::Status),
            "deposit" => {
                let (account_number, amount) = account_and_amount(rest, "deposit", DEPOSIT_USAGE)?;
                Ok(ShorthandCommand::Bank(BankCommand::deposit(account_number, amount)))
            }
            "withdraw" => {
                let (account_number, amount) = account_and_amount(rest, "withdraw", WITHDRAW_USAGE)?;
                Ok(ShorthandCommand::Bank(BankCommand::withdraw(account_number, amount)))
            }
            "balance" => {
                let account_number = single_account(rest, "balance", BALANCE_USAGE)?;
                Ok(ShorthandCommand::Bank(BankCommand::balance(account_number)))
            }
            "freeze" => match rest.split_once(':') {
                Some((account_number, reason)) if !account_number.is_empty() && !reason.is_empty() => {
                    Ok(ShorthandCommand::Bank(BankCommand::Freeze {
                        account_number: account_number.to_string(),
                        reason:         reason.to_string()
                    }))
                }
                _ => Err(BankingError::invalid_format("freeze", FREEZE_USAGE))
            },
            "unfreeze" => {
                let account_number = single_account(rest, "unfreeze", UNFREEZE_USAGE)?;
                Ok(ShorthandCommand::Bank(BankCommand::Unfreeze { account_number }))
            }
            "create-atm" => parse_create_atm(rest),
            "atm" => parse_atm(rest),
            _ => Err(BankingError::invalid_format("unknown", &format!("unrecognized command '{input}'")))
        }
    }
}

fn account_and_amount(rest: &str, command: &str, usage: &str) -> Result<(String, Decimal), BankingError> {
    let parts: Vec<&str> = rest.split(':').collect();
    match parts.as_slice() {
        [account_number, amount] if !account_number.is_empty() => {
            let amount = parse_amount(amount, command, usage)?;
            Ok((account_number.to_string(), amount))
        }
        _ => Err(BankingError::invalid_format(command, usage))
    }
}

fn single_account(rest: &str, command: &str, usage: &str) -> Result<String, BankingError> {
    if rest.is_empty() || rest.contains(':') {
        return Err(BankingError::invalid_format(command, usage));
    }
    Ok(rest.to_string())
}

fn parse_amount(raw: &str, command: &str, usage: &str) -> Result<Decimal, BankingError> {
    Decimal::from_str(raw.trim()).map_err(|_| BankingError::invalid_format(command, usage))
}

fn parse_create_atm(rest: &str) -> Result<ShorthandCommand, BankingError> {
    let parts: Vec<&str> = rest.split(':').collect();
    let (atm_id, location, cash) = match parts.as_slice() {
        [atm_id, location] => (atm_id, location, None),
        [atm_id, location, cash] => (atm_id, location, Some(parse_amount(cash, "create-atm", CREATE_ATM_USAGE)?)),
        _ => return Err(BankingError::invalid_format("create-atm", CREATE_ATM_USAGE))
    };
    if atm_id.is_empty() || location.is_empty() {
        return Err(BankingError::invalid_format("create-atm", CREATE_ATM_USAGE));
    }
    Ok(ShorthandCommand::CreateAtm { atm_id: atm_id.to_string(), location: location.to_string(), initial_cash: cash })
}

fn parse_atm(rest: &str) -> Result<ShorthandCommand, BankingError> {
    let Some((atm_id, subcommand)) = rest.split_once(':') else {
        return Err(BankingError::invalid_format("atm", ATM_USAGE));
    };
    if atm_id.is_empty() {
        return Err(BankingError::invalid_format("atm", ATM_USAGE));
    }
    let command = match subcommand.split_once(':') {
        None if subcommand == "status" => AtmCommand::Status,
        None if subcommand == "refill" => AtmCommand::Refill,
        Some(("refill", amount)) => AtmCommand::RefillBy(parse_amount(amount, "atm refill", ATM_USAGE)?),
        _ => return Err(BankingError::invalid_format("atm", ATM_USAGE))
    };
    Ok(ShorthandCommand::Atm { atm_id: atm_id.to_string(), command })
}

/// Successful reply to a shorthand or account-level command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandOutcome {
    Balance(Decimal),
    AccountFrozen { reason: String },
    AccountUnfrozen,
    SystemStatus(SystemStatus),
    AtmCreated { atm_id: String, location: String },
    AtmStatus(AtmState),
    AtmRefilled(AtmState)
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandOutcome::Balance(balance) => write!(f, "Balance: {balance}"),
            CommandOutcome::AccountFrozen { reason } => write!(f, "Account frozen: {reason}"),
            CommandOutcome::AccountUnfrozen => f.write_str("Account unfrozen"),
            CommandOutcome::SystemStatus(status) => write!(f, "{status}"),
            CommandOutcome::AtmCreated { atm_id, location } => write!(f, "ATM {atm_id} created at {location}"),
            CommandOutcome::AtmStatus(atm) => write!(f, "{atm}"),
            CommandOutcome::AtmRefilled(atm) => {
                write!(f, "ATM {} refilled - Cash available: {}", atm.id, atm.cash_available)
            }
        }
    }
}

pub type CommandResult = Result<CommandOutcome, BankingError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<ShorthandCommand, BankingError> {
        input.parse()
    }

    #[test]
    fn parses_account_commands() {
        assert_eq!(
            parse("deposit:1001:500").unwrap(),
            ShorthandCommand::Bank(BankCommand::deposit("1001", Decimal::from(500)))
        );
        assert_eq!(
            parse("withdraw:1001:12.50").unwrap(),
            ShorthandCommand::Bank(BankCommand::withdraw("1001", Decimal::new(1250, 2)))
        );
        assert_eq!(parse("balance:1001").unwrap(), ShorthandCommand::Bank(BankCommand::balance("1001")));
        assert_eq!(
            parse("unfreeze:1001").unwrap(),
            ShorthandCommand::Bank(BankCommand::Unfreeze { account_number: "1001".to_string() })
        );
    }

    #[test]
    fn freeze_reason_keeps_its_colons() {
        let command = parse("freeze:1001:Fraud detected: large transfer").unwrap();
        assert_eq!(
            command,
            ShorthandCommand::Bank(BankCommand::Freeze {
                account_number: "1001".to_string(),
                reason:         "Fraud detected: large transfer".to_string()
            })
        );
    }

    #[test]
    fn parses_supervisor_commands() {
        assert_eq!(parse("status").unwrap(), ShorthandCommand::Status);
        assert_eq!(
            parse("create-atm:lobby:Lobby").unwrap(),
            ShorthandCommand::CreateAtm {
                atm_id:       "lobby".to_string(),
                location:     "Lobby".to_string(),
                initial_cash: None
            }
        );
        assert_eq!(
            parse("create-atm:lobby:Lobby:2500").unwrap(),
            ShorthandCommand::CreateAtm {
                atm_id:       "lobby".to_string(),
                location:     "Lobby".to_string(),
                initial_cash: Some(Decimal::from(2500))
            }
        );
        assert_eq!(
            parse("atm:default:status").unwrap(),
            ShorthandCommand::Atm { atm_id: "default".to_string(), command: AtmCommand::Status }
        );
        assert_eq!(
            parse("atm:default:refill").unwrap(),
            ShorthandCommand::Atm { atm_id: "default".to_string(), command: AtmCommand::Refill }
        );
        assert_eq!(
            parse("atm:default:refill:750").unwrap(),
            ShorthandCommand::Atm { atm_id: "default".to_string(), command: AtmCommand::RefillBy(Decimal::from(750)) }
        );
    }

    #[test]
    fn malformed_commands_are_typed_errors() {
        for input in [
            "deposit:1001",
            "deposit:1001:abc",
            "deposit::5",
            "withdraw:1001:5:extra",
            "balance:",
            "balance:1001:5",
            "freeze:1001",
            "unfreeze:",
            "create-atm:only-id",
            "create-atm:x:y:lots",
            "atm:default",
            "atm:default:explode",
            "atm:default:refill:many",
            "status:now",
            "transfer:1:2:3",
            ""
        ] {
            match parse(input) {
                Err(BankingError::InvalidCommandFormat { .. }) => {}
                other => panic!("{input:?} should be rejected, got {other:?}")
            }
        }
    }

    #[test]
    fn usage_is_part_of_the_message() {
        let err = parse("deposit:1001").unwrap_err();
        assert_eq!(err.to_string(), "Invalid deposit command format: deposit:accountNumber:amount");
    }
}
