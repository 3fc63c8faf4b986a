use thiserror::Error;

use crate::domain::{AccountId, MinorUnits, OrderId, OrderStatus};
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Cannot transfer from an account to itself: {0}")]
    SelfTransfer(AccountId),

    #[error("Insufficient funds in account {account}: balance {balance}, required {required}")]
    InsufficientFunds {
        account: AccountId,
        balance: MinorUnits,
        required: MinorUnits,
    },

    #[error("Product {product} unavailable: {stock} in stock, {requested} requested")]
    ProductUnavailable {
        product: String,
        stock: i64,
        requested: i64,
    },

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Order {order} cannot be cancelled: status is {status}")]
    OrderNotCancellable { order: OrderId, status: OrderStatus },

    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Transfer failed: {0}")]
    TransferFailed(anyhow::Error),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    /// Classify a storage failure raised while applying a transfer: typed
    /// outcomes pass through, mechanical faults become `TransferFailed`.
    pub(crate) fn from_transfer_storage(err: StorageError) -> Self {
        match err {
            StorageError::Other(e) => AppError::TransferFailed(e),
            typed => typed.into(),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InsufficientFunds {
                account,
                balance,
                requested,
            } => AppError::InsufficientFunds {
                account,
                balance,
                required: requested,
            },
            StorageError::OrderStatusConflict { order, status } => {
                AppError::OrderNotCancellable { order, status }
            }
            StorageError::Other(e) => AppError::Database(e),
        }
    }
}
