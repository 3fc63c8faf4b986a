use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, MinorUnits, Order, OrderId};

/// What the catalog currently offers for a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductOffer {
    pub seller_id: AccountId,
    pub unit_price: MinorUnits,
    pub stock: i64,
}

/// Stock management seam used by order settlement. The default adapter is
/// backed by the local catalog table; embedders can point it at a remote
/// inventory service instead.
#[async_trait]
pub trait Inventory: Send + Sync {
    /// Current offer for a product. `None` when the product is unknown.
    async fn stock_and_price(&self, product_id: &str) -> Result<Option<ProductOffer>>;

    /// Reserve `quantity` units. Returns `false` when stock is insufficient,
    /// in which case nothing was decremented.
    async fn decrement_stock(&self, product_id: &str, quantity: i64) -> Result<bool>;

    /// Return `quantity` units to stock, releasing a prior reservation.
    async fn increment_stock(&self, product_id: &str, quantity: i64) -> Result<()>;
}

/// Event emitted after an order settles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseEvent {
    pub event_type: String,
    pub user_id: AccountId,
    pub order_id: OrderId,
    pub product_id: String,
    pub amount: MinorUnits,
    pub quantity: i64,
    pub payment_method: String,
    pub occurred_at: DateTime<Utc>,
}

impl PurchaseEvent {
    pub fn purchase(order: &Order) -> Self {
        Self {
            event_type: "purchase".to_string(),
            user_id: order.buyer_id.clone(),
            order_id: order.id,
            product_id: order.product_id.clone(),
            amount: order.total,
            quantity: order.quantity,
            payment_method: "wallet".to_string(),
            occurred_at: Utc::now(),
        }
    }
}

/// Best-effort event reporting. Implementations must swallow their own
/// failures: recording an event can never fail or delay settlement.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn record(&self, event: PurchaseEvent);
}
