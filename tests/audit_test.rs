mod common;

use anyhow::Result;
use common::{fund, seed_product, test_services};
use saldo::domain::EntryReason;
use saldo::io::Exporter;

#[tokio::test]
async fn test_audit_is_healthy_after_mixed_activity() -> Result<()> {
    let (services, _temp) = test_services().await?;
    fund(&services, "alice", 1000).await?;
    fund(&services, "bob", 500).await?;
    services
        .transfers
        .transfer("alice", "bob", 250, EntryReason::Transfer)
        .await?;
    services.transfers.withdraw("bob", 100).await?;

    let product = seed_product(&services, "seller", "Widget", 300, 5).await?;
    services.orders.create_order("alice", &product.id, 1).await?;

    let report = services.ledger.audit().await?;

    assert!(report.is_healthy(), "issues: {:?}", report.issues);
    // 4 funding/withdrawal movements + 1 transfer + 1 settlement, 2 legs each
    assert_eq!(report.transfer_count, 5);
    assert_eq!(report.entry_count, 10);

    Ok(())
}

#[tokio::test]
async fn test_audit_detects_tampered_balance() -> Result<()> {
    let (services, _temp) = test_services().await?;
    fund(&services, "alice", 1000).await?;

    // Corrupt the stored balance behind the ledger's back
    sqlx::query("UPDATE accounts SET balance = 9999 WHERE id = 'alice'")
        .execute(services.repo.pool())
        .await?;

    let report = services.ledger.audit().await?;
    assert!(!report.is_healthy());
    assert!(report
        .issues
        .iter()
        .any(|issue| issue.to_string().contains("alice")));

    Ok(())
}

#[tokio::test]
async fn test_export_entries_csv() -> Result<()> {
    let (services, _temp) = test_services().await?;
    fund(&services, "alice", 1000).await?;
    services
        .transfers
        .transfer("alice", "bob", 250, EntryReason::Transfer)
        .await?;

    let exporter = Exporter::new(&services);
    let mut buffer = Vec::new();
    let count = exporter.export_entries_csv(&mut buffer).await?;

    assert_eq!(count, 4);
    let csv = String::from_utf8(buffer)?;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 5, "header plus one line per entry");
    assert!(lines[0].starts_with("seq,id,account,amount"));
    assert!(csv.contains("alice"));
    assert!(csv.contains("treasury"));

    Ok(())
}

#[tokio::test]
async fn test_export_balances_csv() -> Result<()> {
    let (services, _temp) = test_services().await?;
    fund(&services, "alice", 1000).await?;

    let exporter = Exporter::new(&services);
    let mut buffer = Vec::new();
    let count = exporter.export_balances_csv(&mut buffer).await?;

    // alice plus the seeded treasury
    assert_eq!(count, 2);
    let csv = String::from_utf8(buffer)?;
    assert!(csv.contains("alice,user,1000"));
    assert!(csv.contains("treasury,system,-1000"));

    Ok(())
}

#[tokio::test]
async fn test_export_orders_csv() -> Result<()> {
    let (services, _temp) = test_services().await?;
    fund(&services, "alice", 1000).await?;
    let product = seed_product(&services, "seller", "Widget", 300, 5).await?;
    services.orders.create_order("alice", &product.id, 2).await?;

    let exporter = Exporter::new(&services);
    let mut buffer = Vec::new();
    let count = exporter.export_orders_csv(&mut buffer).await?;

    assert_eq!(count, 1);
    let csv = String::from_utf8(buffer)?;
    assert!(csv.contains("COMPLETED"));
    assert!(csv.contains("600"));

    Ok(())
}

#[tokio::test]
async fn test_export_full_json_snapshot() -> Result<()> {
    let (services, _temp) = test_services().await?;
    fund(&services, "alice", 1000).await?;
    let product = seed_product(&services, "seller", "Widget", 300, 5).await?;
    services.orders.create_order("alice", &product.id, 1).await?;

    let exporter = Exporter::new(&services);
    let mut buffer = Vec::new();
    let snapshot = exporter.export_full_json(&mut buffer).await?;

    assert_eq!(snapshot.accounts.len(), 3);
    assert_eq!(snapshot.entries.len(), 4);
    assert_eq!(snapshot.orders.len(), 1);
    assert_eq!(snapshot.products.len(), 1);

    // The written JSON parses back into the same shape
    let parsed: serde_json::Value = serde_json::from_slice(&buffer)?;
    assert_eq!(parsed["accounts"].as_array().unwrap().len(), 3);
    assert_eq!(parsed["orders"][0]["status"], "COMPLETED");

    Ok(())
}
