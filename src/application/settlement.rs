use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::domain::{
    order_total, AnalyticsSink, EntryReason, Inventory, Order, OrderId, OrderStatus, PurchaseEvent,
};
use crate::storage::Repository;

use super::{AppError, TransferCoordinator};

/// Drives the order lifecycle: reserve stock, settle payment, compensate on
/// failure. Talks to the catalog through the `Inventory` port and reports
/// settled purchases through the `AnalyticsSink` port.
pub struct OrderSettlement {
    repo: Repository,
    transfers: TransferCoordinator,
    inventory: Arc<dyn Inventory>,
    analytics: Arc<dyn AnalyticsSink>,
}

impl OrderSettlement {
    pub fn new(
        repo: Repository,
        transfers: TransferCoordinator,
        inventory: Arc<dyn Inventory>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Self {
        Self {
            repo,
            transfers,
            inventory,
            analytics,
        }
    }

    /// Create an order and settle it end to end. On success the returned
    /// order is `Completed`: stock was reserved and the buyer paid the
    /// seller in one atomic payment. When the payment fails the order lands
    /// in `Failed` with the reservation rolled back, and the payment error
    /// is surfaced as-is.
    pub async fn create_order(
        &self,
        buyer_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> Result<Order, AppError> {
        if quantity <= 0 {
            return Err(AppError::InvalidAmount(
                "Order quantity must be positive".to_string(),
            ));
        }

        let offer = self
            .inventory
            .stock_and_price(product_id)
            .await
            .map_err(AppError::Database)?;
        let Some(offer) = offer else {
            return Err(AppError::ProductUnavailable {
                product: product_id.to_string(),
                stock: 0,
                requested: quantity,
            });
        };
        if offer.stock < quantity {
            return Err(AppError::ProductUnavailable {
                product: product_id.to_string(),
                stock: offer.stock,
                requested: quantity,
            });
        }

        let total = order_total(offer.unit_price, quantity)
            .ok_or_else(|| AppError::InvalidAmount("Order total out of range".to_string()))?;

        let mut order = Order::new(
            buyer_id,
            &offer.seller_id,
            product_id,
            quantity,
            offer.unit_price,
            total,
        );
        self.repo.insert_order(&order).await?;

        // Reserve stock before touching money. The conditional decrement
        // closes the oversell race between concurrent orders. A faulting
        // port still pins the order to Failed before the error surfaces.
        let reserved = match self.inventory.decrement_stock(product_id, quantity).await {
            Ok(reserved) => reserved,
            Err(err) => {
                self.mark_failed(order.id).await;
                return Err(AppError::Database(err));
            }
        };
        if !reserved {
            self.mark_failed(order.id).await;
            return Err(AppError::ProductUnavailable {
                product: product_id.to_string(),
                stock: offer.stock,
                requested: quantity,
            });
        }

        match self
            .transfers
            .transfer_settling_order(
                buyer_id,
                &offer.seller_id,
                total,
                EntryReason::Transfer,
                order.id,
                OrderStatus::Completed,
            )
            .await
        {
            Ok(_) => {
                order.status = OrderStatus::Completed;
                order.updated_at = Utc::now();
                info!(
                    order = %order.id,
                    buyer = buyer_id,
                    product = product_id,
                    total,
                    "order completed"
                );
                self.publish_purchase(&order);
                Ok(order)
            }
            Err(err) => {
                // Unwind the reservation, pin the order to Failed, then
                // surface the payment error.
                if let Err(restore_err) = self.inventory.increment_stock(product_id, quantity).await
                {
                    warn!(order = %order.id, error = %restore_err, "failed to restore stock");
                }
                self.mark_failed(order.id).await;
                Err(err)
            }
        }
    }

    /// Cancel a pending order: refund the buyer from the seller, restore
    /// stock, and flip the order to `Cancelled`. Refund and status flip
    /// commit together. A failed refund leaves the order `Pending` with its
    /// reservation held, so cancelling can be retried.
    pub async fn cancel_order(&self, order_id: OrderId, buyer_id: &str) -> Result<Order, AppError> {
        let order = self
            .repo
            .get_order(order_id)
            .await?
            .filter(|o| o.buyer_id == buyer_id)
            .ok_or(AppError::OrderNotFound(order_id))?;

        if !order.is_cancellable() {
            return Err(AppError::OrderNotCancellable {
                order: order_id,
                status: order.status,
            });
        }

        // The refund runs seller -> buyer. The order carries the seller it
        // pays, so a reassigned catalog listing cannot misdirect the refund.
        self.transfers
            .transfer_settling_order(
                &order.seller_id,
                buyer_id,
                order.total,
                EntryReason::Refund,
                order_id,
                OrderStatus::Cancelled,
            )
            .await?;

        if let Err(err) = self
            .inventory
            .increment_stock(&order.product_id, order.quantity)
            .await
        {
            warn!(order = %order_id, error = %err, "failed to restore stock after cancel");
        }

        info!(order = %order_id, buyer = buyer_id, total = order.total, "order cancelled");

        let mut order = order;
        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();
        Ok(order)
    }

    /// Fetch an order, scoped to its buyer.
    pub async fn get_order(&self, order_id: OrderId, buyer_id: &str) -> Result<Order, AppError> {
        self.repo
            .get_order(order_id)
            .await?
            .filter(|o| o.buyer_id == buyer_id)
            .ok_or(AppError::OrderNotFound(order_id))
    }

    /// Orders for a buyer, newest first.
    pub async fn orders_for(&self, buyer_id: &str) -> Result<Vec<Order>, AppError> {
        Ok(self.repo.list_orders_for_buyer(buyer_id).await?)
    }

    /// Best effort: pin an order to `Failed` unless a terminal state
    /// already claimed it.
    async fn mark_failed(&self, order_id: OrderId) {
        if let Err(err) = self
            .repo
            .transition_order(order_id, OrderStatus::Pending, OrderStatus::Failed)
            .await
        {
            warn!(order = %order_id, error = %err, "failed to mark order failed");
        }
    }

    /// Fire-and-forget purchase reporting. The sink swallows its own
    /// failures; settlement never waits on it.
    fn publish_purchase(&self, order: &Order) {
        let sink = Arc::clone(&self.analytics);
        let event = PurchaseEvent::purchase(order);
        tokio::spawn(async move {
            sink.record(event).await;
        });
    }
}
