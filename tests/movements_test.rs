mod common;

use anyhow::Result;
use chrono::Utc;
use common::{seed_account, test_service};
use saldo::application::{AppError, MovementDraft};
use saldo::domain::{AccountKind, MovementKind};
use uuid::Uuid;

#[tokio::test]
async fn test_current_balance_absent_without_movements() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let account = seed_account(&service, 1, "478758", AccountKind::Savings, 100000).await?;

    assert_eq!(service.current_balance(account.id).await?, None);

    // The effective balance falls back to the initial balance
    let entry = service.resolve_balance(account.id).await?;
    assert_eq!(entry.balance_cents, 100000);

    Ok(())
}

#[tokio::test]
async fn test_register_credit_uses_initial_balance_as_base() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let account = seed_account(&service, 1, "478758", AccountKind::Savings, 100000).await?;

    let record = service
        .register_movement(account.id, MovementKind::Credit, 50000)
        .await?;

    assert_eq!(record.movement.balance_cents, 150000);
    assert_eq!(record.movement.value_cents, 50000);
    assert_eq!(record.account_number, "478758");
    assert_eq!(service.current_balance(account.id).await?, Some(150000));

    Ok(())
}

#[tokio::test]
async fn test_credit_debit_and_overdraft_sequence() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let account = seed_account(&service, 1, "478758", AccountKind::Savings, 100000).await?;

    // 1000.00 + 500.00 credit
    let credit = service
        .register_movement(account.id, MovementKind::Credit, 50000)
        .await?;
    assert_eq!(credit.movement.balance_cents, 150000);

    // 1500.00 - 200.00 debit
    let debit = service
        .register_movement(account.id, MovementKind::Debit, 20000)
        .await?;
    assert_eq!(debit.movement.balance_cents, 130000);

    // A 1500.00 debit would overdraw the 1300.00 balance
    let result = service
        .register_movement(account.id, MovementKind::Debit, 150000)
        .await;
    match result {
        Err(AppError::InsufficientBalance {
            account_number,
            balance_cents,
            requested_cents,
        }) => {
            assert_eq!(account_number, "478758");
            assert_eq!(balance_cents, 130000);
            assert_eq!(requested_cents, 150000);
        }
        other => panic!("expected InsufficientBalance, got {other:?}"),
    }

    // The failed debit wrote nothing; the balance still resolves to 1300.00
    assert_eq!(service.current_balance(account.id).await?, Some(130000));
    assert_eq!(service.list_movements().await?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_register_rejects_non_positive_value() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let account = seed_account(&service, 1, "478758", AccountKind::Savings, 100000).await?;

    for value in [0, -10000] {
        let result = service
            .register_movement(account.id, MovementKind::Credit, value)
            .await;
        assert!(matches!(result, Err(AppError::InvalidValue(v)) if v == value));
    }

    // No write happened
    assert!(service.list_movements().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_debit_down_to_exact_zero_succeeds() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let account = seed_account(&service, 1, "478758", AccountKind::Checking, 5000).await?;

    let record = service
        .register_movement(account.id, MovementKind::Debit, 5000)
        .await?;
    assert_eq!(record.movement.balance_cents, 0);

    // But one cent more fails
    let result = service
        .register_movement(account.id, MovementKind::Debit, 1)
        .await;
    assert!(matches!(result, Err(AppError::InsufficientBalance { .. })));

    Ok(())
}

#[tokio::test]
async fn test_register_against_unknown_account() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let result = service
        .register_movement(Uuid::new_v4(), MovementKind::Credit, 1000)
        .await;
    assert!(matches!(result, Err(AppError::AccountNotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_register_on_deleted_account_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let account = seed_account(&service, 1, "478758", AccountKind::Savings, 100000).await?;
    service.delete_account(account.id).await?;

    let result = service
        .register_movement(account.id, MovementKind::Credit, 1000)
        .await;
    assert!(matches!(result, Err(AppError::AccountDeleted(_))));

    Ok(())
}

#[tokio::test]
async fn test_stored_balances_equal_signed_running_sum() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let initial = 100000;
    let account = seed_account(&service, 1, "478758", AccountKind::Savings, initial).await?;

    let registrations = [
        (MovementKind::Credit, 10000),
        (MovementKind::Debit, 2500),
        (MovementKind::Credit, 100),
        (MovementKind::Debit, 50000),
    ];
    for (kind, value) in registrations {
        service.register_movement(account.id, kind, value).await?;
    }

    let mut expected = initial;
    for record in service.list_movements().await? {
        let signed = match record.movement.kind {
            MovementKind::Credit => record.movement.value_cents,
            MovementKind::Debit => -record.movement.value_cents,
        };
        expected += signed;
        assert_eq!(record.movement.balance_cents, expected);
    }
    assert_eq!(service.current_balance(account.id).await?, Some(expected));

    Ok(())
}

#[tokio::test]
async fn test_generic_create_preserves_caller_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let account = seed_account(&service, 1, "478758", AccountKind::Savings, 100000).await?;

    // The generic path persists the supplied resulting balance as-is
    let record = service
        .create_movement(MovementDraft {
            account_id: account.id,
            kind: MovementKind::Credit,
            value_cents: 100,
            timestamp: Utc::now(),
            balance_cents: 999900,
        })
        .await?;
    assert_eq!(record.movement.balance_cents, 999900);

    // The resolver reads stored balances, so registration continues from it
    let next = service
        .register_movement(account.id, MovementKind::Credit, 100)
        .await?;
    assert_eq!(next.movement.balance_cents, 1000000);

    Ok(())
}

#[tokio::test]
async fn test_generic_create_rejects_non_positive_value() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let account = seed_account(&service, 1, "478758", AccountKind::Savings, 100000).await?;

    let result = service
        .create_movement(MovementDraft {
            account_id: account.id,
            kind: MovementKind::Debit,
            value_cents: 0,
            timestamp: Utc::now(),
            balance_cents: 100000,
        })
        .await;
    assert!(matches!(result, Err(AppError::InvalidValue(0))));

    Ok(())
}

#[tokio::test]
async fn test_update_requires_existing_movement() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let account = seed_account(&service, 1, "478758", AccountKind::Savings, 100000).await?;

    let result = service
        .update_movement(
            Uuid::new_v4(),
            MovementDraft {
                account_id: account.id,
                kind: MovementKind::Credit,
                value_cents: 1000,
                timestamp: Utc::now(),
                balance_cents: 101000,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::MovementNotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_update_replaces_wholesale_under_same_identity() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let account = seed_account(&service, 1, "478758", AccountKind::Savings, 100000).await?;

    let original = service
        .register_movement(account.id, MovementKind::Credit, 50000)
        .await?;

    let updated = service
        .update_movement(
            original.movement.id,
            MovementDraft {
                account_id: account.id,
                kind: MovementKind::Debit,
                value_cents: 7500,
                timestamp: Utc::now(),
                balance_cents: 92500,
            },
        )
        .await?;

    assert_eq!(updated.movement.id, original.movement.id);
    assert_eq!(updated.movement.sequence, original.movement.sequence);
    assert_eq!(updated.movement.kind, MovementKind::Debit);
    assert_eq!(updated.movement.balance_cents, 92500);

    // Re-read confirms the replacement, and there is still a single record
    let reread = service.get_movement(original.movement.id).await?;
    assert_eq!(reread.movement.value_cents, 7500);
    assert_eq!(service.list_movements().await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_delete_requires_existing_movement() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let result = service.delete_movement(Uuid::new_v4()).await;
    assert!(matches!(result, Err(AppError::MovementNotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_delete_leaves_later_stored_balances_untouched() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let account = seed_account(&service, 1, "478758", AccountKind::Savings, 100000).await?;

    let first = service
        .register_movement(account.id, MovementKind::Credit, 50000)
        .await?;
    service
        .register_movement(account.id, MovementKind::Debit, 20000)
        .await?;
    service
        .register_movement(account.id, MovementKind::Credit, 10000)
        .await?;

    service.delete_movement(first.movement.id).await?;

    // Later movements still carry balances derived from the deleted credit
    let remaining = service.list_movements().await?;
    assert_eq!(remaining.len(), 2);
    assert_eq!(remaining[0].movement.balance_cents, 130000);
    assert_eq!(remaining[1].movement.balance_cents, 140000);

    // The replay check surfaces the now-broken chain
    let reports = service.check_integrity().await?;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].account.id, account.id);
    assert!(!reports[0].mismatches.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_integrity_clean_ledger_reports_nothing() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let account = seed_account(&service, 1, "478758", AccountKind::Savings, 100000).await?;

    service
        .register_movement(account.id, MovementKind::Credit, 50000)
        .await?;
    service
        .register_movement(account.id, MovementKind::Debit, 20000)
        .await?;

    assert!(service.check_integrity().await?.is_empty());

    Ok(())
}
