mod common;

use anyhow::Result;
use chrono::{DateTime, Utc};
use common::{parse_date, seed_account, seed_customer, test_service};
use saldo::application::{AppError, LedgerService, MovementDraft};
use saldo::domain::{AccountId, AccountKind, Cents, MovementKind};
use saldo::io::Exporter;

/// Backdate a movement through the generic create path, which stores the
/// supplied resulting balance as-is.
async fn backdated_movement(
    service: &LedgerService,
    account_id: AccountId,
    kind: MovementKind,
    value_cents: Cents,
    date: &str,
    balance_cents: Cents,
) -> Result<()> {
    service
        .create_movement(MovementDraft {
            account_id,
            kind,
            value_cents,
            timestamp: parse_date(date),
            balance_cents,
        })
        .await?;
    Ok(())
}

fn full_january() -> (DateTime<Utc>, DateTime<Utc>) {
    (parse_date("2024-01-01"), parse_date("2024-01-31"))
}

#[tokio::test]
async fn test_statement_groups_movements_by_account_key() -> Result<()> {
    let (service, _temp) = test_service().await?;
    seed_customer(&service, 1, "Jose Lema").await?;
    let savings = seed_account(&service, 1, "478758", AccountKind::Savings, 100000).await?;
    let checking = seed_account(&service, 1, "225487", AccountKind::Checking, 10000).await?;

    backdated_movement(&service, savings.id, MovementKind::Credit, 50000, "2024-01-10", 150000).await?;
    backdated_movement(&service, savings.id, MovementKind::Debit, 20000, "2024-01-12", 130000).await?;
    backdated_movement(&service, checking.id, MovementKind::Debit, 5000, "2024-01-15", 5000).await?;

    let (from, to) = full_january();
    let statement = service.account_statement(1, from, to).await?;

    assert_eq!(statement.customer.name, "Jose Lema");
    assert_eq!(statement.accounts.len(), 2);
    assert_eq!(statement.accounts["478758-SAVINGS"].len(), 2);
    assert_eq!(statement.accounts["225487-CHECKING"].len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_statement_empty_range_yields_empty_lists() -> Result<()> {
    let (service, _temp) = test_service().await?;
    seed_customer(&service, 1, "Jose Lema").await?;
    let account = seed_account(&service, 1, "478758", AccountKind::Savings, 100000).await?;
    backdated_movement(&service, account.id, MovementKind::Credit, 50000, "2024-01-10", 150000).await?;

    // A range before any movement is not an error
    let statement = service
        .account_statement(1, parse_date("2023-06-01"), parse_date("2023-06-30"))
        .await?;

    assert_eq!(statement.accounts.len(), 1);
    assert!(statement.accounts["478758-SAVINGS"].is_empty());

    Ok(())
}

#[tokio::test]
async fn test_statement_unknown_customer() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let (from, to) = full_january();
    let result = service.account_statement(42, from, to).await;
    assert!(matches!(result, Err(AppError::CustomerNotFound(42))));

    Ok(())
}

#[tokio::test]
async fn test_statement_excludes_deleted_accounts() -> Result<()> {
    let (service, _temp) = test_service().await?;
    seed_customer(&service, 1, "Jose Lema").await?;
    let kept = seed_account(&service, 1, "478758", AccountKind::Savings, 100000).await?;
    let dropped = seed_account(&service, 1, "225487", AccountKind::Checking, 10000).await?;
    backdated_movement(&service, kept.id, MovementKind::Credit, 50000, "2024-01-10", 150000).await?;
    backdated_movement(&service, dropped.id, MovementKind::Debit, 5000, "2024-01-10", 5000).await?;

    service.delete_account(dropped.id).await?;

    let (from, to) = full_january();
    let statement = service.account_statement(1, from, to).await?;

    assert_eq!(statement.accounts.len(), 1);
    assert!(statement.accounts.contains_key("478758-SAVINGS"));

    Ok(())
}

#[tokio::test]
async fn test_statement_range_is_inclusive_and_ascending() -> Result<()> {
    let (service, _temp) = test_service().await?;
    seed_customer(&service, 1, "Jose Lema").await?;
    let account = seed_account(&service, 1, "478758", AccountKind::Savings, 100000).await?;

    backdated_movement(&service, account.id, MovementKind::Credit, 10000, "2024-01-05", 110000).await?;
    backdated_movement(&service, account.id, MovementKind::Debit, 5000, "2024-01-10", 105000).await?;
    backdated_movement(&service, account.id, MovementKind::Credit, 2000, "2024-01-15", 107000).await?;

    // Both boundary days are part of the range
    let statement = service
        .account_statement(1, parse_date("2024-01-05"), parse_date("2024-01-15"))
        .await?;
    let lines = &statement.accounts["478758-SAVINGS"];
    assert_eq!(lines.len(), 3);
    assert!(lines.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

    // Stored balances are read back, never re-derived
    assert_eq!(lines[0].balance_cents, 110000);
    assert_eq!(lines[2].balance_cents, 107000);

    // Tightening the range drops the boundary movements
    let inner = service
        .account_statement(1, parse_date("2024-01-06"), parse_date("2024-01-14"))
        .await?;
    assert_eq!(inner.accounts["478758-SAVINGS"].len(), 1);
    assert_eq!(inner.accounts["478758-SAVINGS"][0].balance_cents, 105000);

    Ok(())
}

#[tokio::test]
async fn test_statement_serializes_with_account_keys() -> Result<()> {
    let (service, _temp) = test_service().await?;
    seed_customer(&service, 1, "Jose Lema").await?;
    let account = seed_account(&service, 1, "478758", AccountKind::Savings, 100000).await?;
    backdated_movement(&service, account.id, MovementKind::Credit, 50000, "2024-01-10", 150000).await?;

    let (from, to) = full_january();
    let statement = service.account_statement(1, from, to).await?;
    let json = serde_json::to_value(&statement)?;

    assert_eq!(json["customer"]["name"], "Jose Lema");
    assert!(json["accounts"]["478758-SAVINGS"].is_array());
    assert_eq!(json["accounts"]["478758-SAVINGS"][0]["kind"], "CREDIT");

    Ok(())
}

#[tokio::test]
async fn test_export_csv_layout() -> Result<()> {
    let (service, _temp) = test_service().await?;
    seed_customer(&service, 1, "Jose Lema").await?;
    let savings = seed_account(&service, 1, "478758", AccountKind::Savings, 100000).await?;
    // An account with no movements falls back to its initial balance
    seed_account(&service, 1, "225487", AccountKind::Checking, 10000).await?;

    backdated_movement(&service, savings.id, MovementKind::Credit, 50000, "2024-01-10", 150000).await?;
    backdated_movement(&service, savings.id, MovementKind::Debit, 20000, "2024-01-12", 130000).await?;

    let (from, to) = full_january();
    let exporter = Exporter::new(&service);
    let mut buffer = Vec::new();
    let rows = exporter
        .export_statement_csv(1, from, to, &mut buffer)
        .await?;
    let document = String::from_utf8(buffer)?;

    assert_eq!(rows, 2);
    assert!(document.contains("Customer:,Jose Lema"));
    assert!(document.contains("Identification:,ID-1"));
    assert!(document.contains("Period:,2024-01-01 to 2024-01-31"));
    assert!(document.contains("Account: 478758 - SAVINGS | Balance: 1300.00"));
    assert!(document.contains("Account: 225487 - CHECKING | Balance: 100.00"));
    assert!(document.contains("Date,Kind,Value,Balance"));
    assert!(document.contains("2024-01-10 00:00,CREDIT,500.00,1500.00"));
    assert!(document.contains("2024-01-12 00:00,DEBIT,200.00,1300.00"));

    Ok(())
}
