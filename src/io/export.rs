use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::Services;
use crate::domain::{Account, LedgerEntry, Order, Product};

/// Database snapshot for full export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub accounts: Vec<Account>,
    pub entries: Vec<LedgerEntry>,
    pub orders: Vec<Order>,
    pub products: Vec<Product>,
}

/// Exporter for converting ledger data to various formats
pub struct Exporter<'a> {
    services: &'a Services,
}

impl<'a> Exporter<'a> {
    pub fn new(services: &'a Services) -> Self {
        Self { services }
    }

    /// Export the full entry log to CSV, oldest first
    pub async fn export_entries_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let entries = self.services.repo.list_entries().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        // Write header
        csv_writer.write_record([
            "seq",
            "id",
            "account",
            "amount",
            "direction",
            "reason",
            "transfer_id",
            "related_id",
            "created_at",
        ])?;

        let mut count = 0;
        for entry in &entries {
            csv_writer.write_record([
                entry.seq.to_string(),
                entry.id.to_string(),
                entry.account_id.clone(),
                entry.amount.to_string(),
                entry.direction.to_string(),
                entry.reason.to_string(),
                entry.transfer_id.to_string(),
                entry.related_id.map(|id| id.to_string()).unwrap_or_default(),
                entry.created_at.to_rfc3339(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export stored balances to CSV
    pub async fn export_balances_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let accounts = self.services.repo.list_accounts().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        // Write header
        csv_writer.write_record(["account", "kind", "balance", "version"])?;

        let mut count = 0;
        for account in &accounts {
            csv_writer.write_record([
                account.id.clone(),
                account.kind.to_string(),
                account.balance.to_string(),
                account.version.to_string(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export orders to CSV, oldest first
    pub async fn export_orders_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let orders = self.services.repo.list_orders().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        // Write header
        csv_writer.write_record([
            "id",
            "buyer",
            "seller",
            "product",
            "quantity",
            "unit_price",
            "total",
            "status",
            "created_at",
            "updated_at",
        ])?;

        let mut count = 0;
        for order in &orders {
            csv_writer.write_record([
                order.id.to_string(),
                order.buyer_id.clone(),
                order.seller_id.clone(),
                order.product_id.clone(),
                order.quantity.to_string(),
                order.unit_price.to_string(),
                order.total.to_string(),
                order.status.to_string(),
                order.created_at.to_rfc3339(),
                order.updated_at.to_rfc3339(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the full database as a JSON snapshot
    pub async fn export_full_json<W: Write>(&self, mut writer: W) -> Result<DatabaseSnapshot> {
        let accounts = self.services.repo.list_accounts().await?;
        let entries = self.services.repo.list_entries().await?;
        let orders = self.services.repo.list_orders().await?;
        let products = self.services.repo.list_products().await?;

        let snapshot = DatabaseSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            accounts,
            entries,
            orders,
            products,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
