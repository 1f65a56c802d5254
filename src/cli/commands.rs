//! CLI command handlers

use std::{fmt::Display, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    client::BankingClient,
    config::{self, BankingConfig},
    domain::{account::AccountType, command::CommandOutcome, error::BankingError}
};

/// Fraud alerts are raised asynchronously after a transfer settles
const FRAUD_SETTLE: Duration = Duration::from_millis(200);

/// Handle the init-config command - write the default configuration
pub async fn handle_init_config(path: Option<PathBuf>) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => config::get_config_file_path()?
    };

    config::save_config_to(&BankingConfig::default(), &path).context("Failed to write default configuration")?;
    println!("Default configuration written to {}", path.display());

    Ok(())
}

/// Handle the exec command - run shorthand commands in order
pub async fn handle_exec(client: &BankingClient, commands: &[String], json: bool) -> Result<()> {
    for text in commands {
        report_outcome(json, text, &client.command(text).await);
    }
    Ok(())
}

/// Handle the demo command - run every canned scenario against a fresh system
pub async fn handle_demo(client: &BankingClient, json: bool) -> Result<()> {
    basic_operations(client, json).await?;
    transfer_scenario(client, json).await?;
    atm_scenario(client, json).await?;
    fraud_scenario(client, json).await?;
    account_management(client, json).await?;
    Ok(())
}

async fn basic_operations(client: &BankingClient, json: bool) -> Result<()> {
    heading("Basic account operations");

    let created = client.create_account("John Doe", AccountType::Checking, Decimal::from(1_000)).await?;
    let account = created.account_number.as_str();
    println!("Created account {account} with balance {}", created.balance);

    for (label, result) in [
        ("deposit 500", client.deposit(account, Decimal::from(500)).await),
        ("withdraw 200", client.withdraw(account, Decimal::from(200)).await),
        ("withdraw 5000", client.withdraw(account, Decimal::from(5_000)).await),
        ("balance", client.balance(account).await)
    ] {
        report_outcome(json, label, &result);
    }
    Ok(())
}

async fn transfer_scenario(client: &BankingClient, json: bool) -> Result<()> {
    heading("Transfers");

    let from = client.create_account("Alice Smith", AccountType::Checking, Decimal::from(2_000)).await?;
    let to = client.create_account("Bob Johnson", AccountType::Savings, Decimal::from(500)).await?;

    let completed = client.transfer(&from.account_number, &to.account_number, Decimal::from(300), "Rent share").await?;
    report(json, "transfer 300", &completed, &completed.message);
    let failed = client.transfer(&from.account_number, &to.account_number, Decimal::from(9_000), "Too much").await?;
    report(json, "transfer 9000", &failed, &failed.message);

    let history = client.transaction_history(&from.account_number).await?;
    report(json, "transaction history", &history, format!("{} transfer(s)", history.len()));
    let stats = client.transaction_stats().await?;
    report(
        json,
        "transaction stats",
        &stats,
        format!("total {}, completed {}, failed {}", stats.total, stats.completed, stats.failed)
    );
    Ok(())
}

async fn atm_scenario(client: &BankingClient, json: bool) -> Result<()> {
    heading("ATM");

    let created = client.create_account("Carol White", AccountType::Checking, Decimal::from(3_000)).await?;
    let (account, credential) = (created.account_number.as_str(), created.credential.expose());

    let responses = [
        ("ATM withdraw 200", client.atm_withdraw(None, account, credential, Decimal::from(200)).await?),
        ("ATM deposit 100", client.atm_deposit(None, account, credential, Decimal::from(100)).await?),
        ("ATM balance", client.atm_balance_inquiry(None, account, credential).await?),
        ("ATM withdraw over limit", client.atm_withdraw(None, account, credential, Decimal::from(1_500)).await?),
        ("ATM wrong credential", client.atm_balance_inquiry(None, account, "0000").await?)
    ];
    for (label, response) in &responses {
        let text = match response.balance {
            Some(balance) => format!("{} (balance {balance})", response.message),
            None => response.message.clone()
        };
        report(json, label, response, text);
    }

    report_outcome(json, "atm:default:status", &client.command("atm:default:status").await);
    Ok(())
}

async fn fraud_scenario(client: &BankingClient, json: bool) -> Result<()> {
    heading("Fraud detection");

    let spender = client.create_account("Dave Brown", AccountType::Business, Decimal::from(60_000)).await?;
    let payee = client.create_account("Eve Green", AccountType::Checking, Decimal::ZERO).await?;

    let response =
        client.transfer(&spender.account_number, &payee.account_number, Decimal::from(15_000), "Equipment").await?;
    report(json, "transfer 15000", &response, &response.message);
    tokio::time::sleep(FRAUD_SETTLE).await;

    let alerts = client.fraud_alerts(&spender.account_number).await?;
    for alert in &alerts {
        report(json, "fraud alert", alert, format!("{:?}: {}", alert.severity, alert.reason));
    }
    report_outcome(json, "withdraw after alert", &client.withdraw(&spender.account_number, Decimal::from(10)).await);

    let stats = client.fraud_stats().await?;
    let summary = format!("{} alert(s), {} high or above", stats.total_alerts, stats.high_or_above);
    report(json, "fraud stats", &stats, summary);
    Ok(())
}

async fn account_management(client: &BankingClient, json: bool) -> Result<()> {
    heading("Account management");

    let created = client.create_account("Frank Black", AccountType::Savings, Decimal::from(750)).await?;
    let account = created.account_number.as_str();

    report_outcome(json, "freeze", &client.freeze(account, "Lost card").await);
    report_outcome(json, "deposit while frozen", &client.deposit(account, Decimal::from(50)).await);
    report_outcome(json, "unfreeze", &client.unfreeze(account).await);

    let info = client.account_info(account).await?;
    let summary = format!("{} {:?} balance {}", info.customer_name, info.account_type, info.balance);
    report(json, "account info", &info, summary);

    let accounts = client.all_accounts().await?;
    report(json, "accounts", &accounts, format!("{} account(s)", accounts.len()));

    let status = client.status().await?;
    report(json, "status", &status, &status);
    Ok(())
}

fn heading(title: &str) {
    println!();
    println!("=== {title} ===");
}

fn report_outcome(json: bool, label: &str, result: &Result<CommandOutcome, BankingError>) {
    match result {
        Ok(outcome) => report(json, label, result, outcome),
        Err(e) => report(json, label, result, e)
    }
}

fn report<T: Serialize, D: Display>(json: bool, label: &str, value: &T, text: D) {
    if !json {
        println!("{label}: {text}");
        return;
    }
    match serde_json::to_string(value) {
        Ok(encoded) => println!("{encoded}"),
        Err(e) => eprintln!("{label}: failed to encode reply: {e}")
    }
}
