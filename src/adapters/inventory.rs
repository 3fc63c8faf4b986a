use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{Inventory, MinorUnits, Product, ProductOffer};
use crate::storage::Repository;

/// Inventory backed by the local product catalog table.
pub struct SqlInventory {
    repo: Repository,
}

impl SqlInventory {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Add a product to the catalog.
    pub async fn create_product(
        &self,
        seller_id: &str,
        name: &str,
        unit_price: MinorUnits,
        stock: i64,
    ) -> Result<Product> {
        let product = Product::new(seller_id, name, unit_price, stock);
        self.repo.insert_product(&product).await?;
        Ok(product)
    }

    /// Get a product by ID.
    pub async fn get_product(&self, id: &str) -> Result<Option<Product>> {
        self.repo.get_product(id).await
    }

    /// List the whole catalog.
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        self.repo.list_products().await
    }
}

#[async_trait]
impl Inventory for SqlInventory {
    async fn stock_and_price(&self, product_id: &str) -> Result<Option<ProductOffer>> {
        Ok(self
            .repo
            .get_product(product_id)
            .await?
            .map(|product| ProductOffer {
                seller_id: product.seller_id,
                unit_price: product.unit_price,
                stock: product.stock,
            }))
    }

    async fn decrement_stock(&self, product_id: &str, quantity: i64) -> Result<bool> {
        self.repo.decrement_stock(product_id, quantity).await
    }

    async fn increment_stock(&self, product_id: &str, quantity: i64) -> Result<()> {
        self.repo.increment_stock(product_id, quantity).await
    }
}

/// In-memory inventory for tests and for embedders without a catalog table.
#[derive(Default)]
pub struct MemoryInventory {
    offers: Mutex<HashMap<String, ProductOffer>>,
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_offer(self, product_id: impl Into<String>, offer: ProductOffer) -> Self {
        self.offers().insert(product_id.into(), offer);
        self
    }

    pub fn stock_of(&self, product_id: &str) -> Option<i64> {
        self.offers().get(product_id).map(|offer| offer.stock)
    }

    fn offers(&self) -> MutexGuard<'_, HashMap<String, ProductOffer>> {
        self.offers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Inventory for MemoryInventory {
    async fn stock_and_price(&self, product_id: &str) -> Result<Option<ProductOffer>> {
        Ok(self.offers().get(product_id).cloned())
    }

    async fn decrement_stock(&self, product_id: &str, quantity: i64) -> Result<bool> {
        let mut offers = self.offers();
        match offers.get_mut(product_id) {
            Some(offer) if offer.stock >= quantity => {
                offer.stock -= quantity;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn increment_stock(&self, product_id: &str, quantity: i64) -> Result<()> {
        if let Some(offer) = self.offers().get_mut(product_id) {
            offer.stock += quantity;
        }
        Ok(())
    }
}
