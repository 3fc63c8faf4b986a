mod common;

use anyhow::Result;
use common::{fund, test_services};
use saldo::application::AppError;
use saldo::domain::{AccountKind, Direction, EntryReason};

#[tokio::test]
async fn test_missing_account_reads_as_zero() -> Result<()> {
    let (services, _temp) = test_services().await?;

    let balance = services.ledger.balance("nobody").await?;
    assert_eq!(balance, 0, "unknown accounts read as empty, not as errors");

    Ok(())
}

#[tokio::test]
async fn test_credit_lazily_creates_account() -> Result<()> {
    let (services, _temp) = test_services().await?;

    let entry = services
        .ledger
        .apply_entry("alice", 500, EntryReason::Adjustment, None)
        .await?;

    assert_eq!(entry.amount, 500);
    assert_eq!(entry.direction, Direction::Credit);
    assert!(entry.seq > 0, "repository assigns the sequence number");

    let account = services.ledger.account("alice").await?;
    assert_eq!(account.kind, AccountKind::User);
    assert_eq!(account.balance, 500);
    assert_eq!(account.version, 1);

    Ok(())
}

#[tokio::test]
async fn test_zero_amount_is_rejected() -> Result<()> {
    let (services, _temp) = test_services().await?;

    let result = services
        .ledger
        .apply_entry("alice", 0, EntryReason::Adjustment, None)
        .await;

    assert!(matches!(result, Err(AppError::InvalidAmount(_))));
    Ok(())
}

#[tokio::test]
async fn test_debit_below_zero_leaves_no_trace() -> Result<()> {
    let (services, _temp) = test_services().await?;
    fund(&services, "alice", 300).await?;

    let result = services
        .ledger
        .apply_entry("alice", -500, EntryReason::Adjustment, None)
        .await;

    match result {
        Err(AppError::InsufficientFunds {
            account,
            balance,
            required,
        }) => {
            assert_eq!(account, "alice");
            assert_eq!(balance, 300);
            assert_eq!(required, 500);
        }
        other => panic!("expected InsufficientFunds, got {:?}", other),
    }

    // Balance untouched and no entry appended beyond the funding deposit
    assert_eq!(services.ledger.balance("alice").await?, 300);
    let entries = services.ledger.entries_for("alice", 50).await?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].reason, EntryReason::Deposit);

    Ok(())
}

#[tokio::test]
async fn test_debit_to_exactly_zero_is_allowed() -> Result<()> {
    let (services, _temp) = test_services().await?;
    fund(&services, "alice", 300).await?;

    services
        .ledger
        .apply_entry("alice", -300, EntryReason::Adjustment, None)
        .await?;

    assert_eq!(services.ledger.balance("alice").await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_entries_newest_first_with_limit() -> Result<()> {
    let (services, _temp) = test_services().await?;

    for amount in [100, 200, 300, 400] {
        services
            .ledger
            .apply_entry("alice", amount, EntryReason::Adjustment, None)
            .await?;
    }

    let entries = services.ledger.entries_for("alice", 2).await?;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].amount, 400, "newest entry first");
    assert_eq!(entries[1].amount, 300);
    assert!(entries[0].seq > entries[1].seq);

    Ok(())
}

#[tokio::test]
async fn test_version_bumps_on_every_mutation() -> Result<()> {
    let (services, _temp) = test_services().await?;

    fund(&services, "alice", 1000).await?;
    services
        .ledger
        .apply_entry("alice", -250, EntryReason::Adjustment, None)
        .await?;
    services
        .ledger
        .apply_entry("alice", 50, EntryReason::Adjustment, None)
        .await?;

    let account = services.ledger.account("alice").await?;
    assert_eq!(account.balance, 800);
    assert_eq!(account.version, 3);

    Ok(())
}

#[tokio::test]
async fn test_treasury_may_run_negative() -> Result<()> {
    let (services, _temp) = test_services().await?;

    fund(&services, "alice", 5000).await?;

    let treasury = services.ledger.account("treasury").await?;
    assert_eq!(treasury.kind, AccountKind::System);
    assert_eq!(
        treasury.balance, -5000,
        "deposits are funded by the treasury going negative"
    );

    Ok(())
}
