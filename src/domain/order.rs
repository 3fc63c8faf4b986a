use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, MinorUnits};

pub type OrderId = Uuid;

/// Order lifecycle. `Pending` is the only live state; the other three are
/// terminal and an order reaches exactly one of them, exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// Created, stock reserved, payment not yet settled.
    Pending,
    /// Payment settled. Funds moved from buyer to seller.
    Completed,
    /// Cancelled by the buyer. Funds refunded, stock restored.
    Cancelled,
    /// Payment failed. Stock restored, no funds moved.
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(OrderStatus::Pending),
            "COMPLETED" => Some(OrderStatus::Completed),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            "FAILED" => Some(OrderStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }

    /// Valid transitions go from `Pending` to any terminal state and nowhere
    /// else. Terminal states accept nothing.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(self, OrderStatus::Pending) && next.is_terminal()
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: AccountId,
    /// Seller and unit price are captured at creation time. Later catalog
    /// changes do not affect existing orders: a refund always goes back
    /// against the account that this order pays.
    pub seller_id: AccountId,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: MinorUnits,
    pub total: MinorUnits,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        buyer_id: impl Into<AccountId>,
        seller_id: impl Into<AccountId>,
        product_id: impl Into<String>,
        quantity: i64,
        unit_price: MinorUnits,
        total: MinorUnits,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            buyer_id: buyer_id.into(),
            seller_id: seller_id.into(),
            product_id: product_id.into(),
            quantity,
            unit_price,
            total,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_cancellable(&self) -> bool {
        self.status == OrderStatus::Pending
    }
}
