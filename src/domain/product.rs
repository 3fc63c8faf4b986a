use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, MinorUnits};

/// A catalog listing: something a seller offers at a unit price, with a
/// finite stock count. Stock is decremented when an order reserves units
/// and restored when the order fails or is cancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub seller_id: AccountId,
    pub name: String,
    pub unit_price: MinorUnits,
    pub stock: i64,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn new(
        seller_id: impl Into<AccountId>,
        name: impl Into<String>,
        unit_price: MinorUnits,
        stock: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            seller_id: seller_id.into(),
            name: name.into(),
            unit_price,
            stock,
            created_at: Utc::now(),
        }
    }

    pub fn in_stock(&self, quantity: i64) -> bool {
        quantity > 0 && self.stock >= quantity
    }
}
