// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use saldo::application::LedgerService;
use saldo::domain::{Account, AccountKind, Cents, EntityStatus};
use saldo::events::CustomerCreated;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a date string into DateTime<Utc> at the start of the day
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Seed the customer projection the way the registry would: through a
/// creation event.
pub async fn seed_customer(service: &LedgerService, id: i64, name: &str) -> Result<()> {
    let sync = service.customer_sync();
    sync.on_created(&CustomerCreated {
        customer_id: id,
        name: name.to_string(),
        identification: format!("ID-{}", id),
        status: EntityStatus::Active,
    })
    .await?;
    Ok(())
}

/// Open an account for a customer with the given initial balance.
pub async fn seed_account(
    service: &LedgerService,
    customer_id: i64,
    number: &str,
    kind: AccountKind,
    initial_balance_cents: Cents,
) -> Result<Account> {
    Ok(service
        .create_account(number.to_string(), kind, initial_balance_cents, customer_id)
        .await?)
}
