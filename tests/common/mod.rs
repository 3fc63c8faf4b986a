// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use saldo::adapters::SqlInventory;
use saldo::application::Services;
use saldo::domain::{MinorUnits, Product};
use tempfile::TempDir;

/// Helper to create the wired services over a temporary database
pub async fn test_services() -> Result<(Services, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let services = Services::init(db_path.to_str().unwrap()).await?;
    Ok((services, temp_dir))
}

/// Fund an account out of the treasury
pub async fn fund(services: &Services, account: &str, amount: MinorUnits) -> Result<()> {
    services.transfers.deposit(account, amount).await?;
    Ok(())
}

/// Add a product to the catalog
pub async fn seed_product(
    services: &Services,
    seller: &str,
    name: &str,
    unit_price: MinorUnits,
    stock: i64,
) -> Result<Product> {
    let catalog = SqlInventory::new(services.repo.clone());
    catalog.create_product(seller, name, unit_price, stock).await
}

/// Current stock of a product
pub async fn stock_of(services: &Services, product_id: &str) -> Result<i64> {
    let product = services
        .repo
        .get_product(product_id)
        .await?
        .expect("product should exist");
    Ok(product.stock)
}
