use tracing::info;

use crate::domain::{
    EntryReason, LedgerEntry, MinorUnits, OrderId, OrderStatus, TransferId, TransferRecord,
    TREASURY_ACCOUNT,
};
use crate::storage::Repository;

use super::AppError;

/// Moves money between accounts. Every movement lands as a cross-linked
/// debit/credit pair sharing one transfer id; the two legs commit
/// atomically or not at all.
#[derive(Clone)]
pub struct TransferCoordinator {
    repo: Repository,
}

impl TransferCoordinator {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Move `amount` from one account to another. A rejected debit leaves
    /// no trace of either leg.
    pub async fn transfer(
        &self,
        from_account: &str,
        to_account: &str,
        amount: MinorUnits,
        reason: EntryReason,
    ) -> Result<TransferRecord, AppError> {
        let mut record = Self::build_record(from_account, to_account, amount, reason)?;
        self.repo
            .apply_transfer(&mut record)
            .await
            .map_err(AppError::from_transfer_storage)?;

        info!(
            transfer = %record.transfer_id,
            from = from_account,
            to = to_account,
            amount,
            reason = %reason,
            "transfer applied"
        );
        Ok(record)
    }

    /// Credit an account out of the treasury.
    pub async fn deposit(
        &self,
        account_id: &str,
        amount: MinorUnits,
    ) -> Result<TransferRecord, AppError> {
        self.transfer(TREASURY_ACCOUNT, account_id, amount, EntryReason::Deposit)
            .await
    }

    /// Move funds from an account back into the treasury.
    pub async fn withdraw(
        &self,
        account_id: &str,
        amount: MinorUnits,
    ) -> Result<TransferRecord, AppError> {
        self.transfer(account_id, TREASURY_ACCOUNT, amount, EntryReason::Withdrawal)
            .await
    }

    /// Transfer and flip an order out of `Pending` in the same transaction,
    /// so a settled payment and its order status cannot diverge. Fails
    /// without moving money if the order already left `Pending`.
    pub(crate) async fn transfer_settling_order(
        &self,
        from_account: &str,
        to_account: &str,
        amount: MinorUnits,
        reason: EntryReason,
        order_id: OrderId,
        to_status: OrderStatus,
    ) -> Result<TransferRecord, AppError> {
        let mut record = Self::build_record(from_account, to_account, amount, reason)?;
        self.repo
            .apply_transfer_settling_order(&mut record, order_id, to_status)
            .await
            .map_err(AppError::from_transfer_storage)?;

        info!(
            transfer = %record.transfer_id,
            order = %order_id,
            status = %to_status,
            amount,
            "transfer settled order"
        );
        Ok(record)
    }

    /// Both recorded legs of a transfer, debit first.
    pub async fn entries_for_transfer(
        &self,
        transfer_id: TransferId,
    ) -> Result<Vec<LedgerEntry>, AppError> {
        Ok(self.repo.entries_for_transfer(transfer_id).await?)
    }

    fn build_record(
        from_account: &str,
        to_account: &str,
        amount: MinorUnits,
        reason: EntryReason,
    ) -> Result<TransferRecord, AppError> {
        if amount <= 0 {
            return Err(AppError::InvalidAmount(
                "Transfer amount must be positive".to_string(),
            ));
        }
        if from_account == to_account {
            return Err(AppError::SelfTransfer(from_account.to_string()));
        }
        Ok(TransferRecord::new(from_account, to_account, amount, reason))
    }
}
