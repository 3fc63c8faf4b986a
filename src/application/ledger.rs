use tracing::debug;
use uuid::Uuid;

use crate::domain::{
    build_audit_report, Account, AuditReport, EntryReason, LedgerEntry, MinorUnits, TransferId,
};
use crate::storage::Repository;

use super::AppError;

/// The balance authority. Stored balances change only through here (or
/// through `TransferCoordinator`, which delegates to the same storage
/// primitives), so balance and entry log move in lockstep.
#[derive(Clone)]
pub struct AccountLedger {
    repo: Repository,
}

impl AccountLedger {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Current balance of an account. Accounts with no history read as 0.
    pub async fn balance(&self, account_id: &str) -> Result<MinorUnits, AppError> {
        Ok(self.repo.account_balance(account_id).await?.unwrap_or(0))
    }

    /// Get an account row, including its version token.
    pub async fn account(&self, account_id: &str) -> Result<Account, AppError> {
        self.repo
            .get_account(account_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(account_id.to_string()))
    }

    /// List all accounts.
    pub async fn list_accounts(&self) -> Result<Vec<Account>, AppError> {
        Ok(self.repo.list_accounts().await?)
    }

    /// Append a standalone posting, mutating the stored balance in the same
    /// transaction. A missing `transfer_id` mints a fresh one. Zero amounts
    /// are rejected; debits that would push a user account below zero fail
    /// without appending anything.
    pub async fn apply_entry(
        &self,
        account_id: &str,
        amount: MinorUnits,
        reason: EntryReason,
        transfer_id: Option<TransferId>,
    ) -> Result<LedgerEntry, AppError> {
        if amount == 0 {
            return Err(AppError::InvalidAmount(
                "Entry amount must be non-zero".to_string(),
            ));
        }

        let transfer_id = transfer_id.unwrap_or_else(Uuid::new_v4);
        let mut entry = LedgerEntry::new(account_id, amount, reason, transfer_id);
        self.repo.apply_entry(&mut entry).await?;

        debug!(account = account_id, amount, seq = entry.seq, "posting applied");
        Ok(entry)
    }

    /// Entries for an account, newest first.
    pub async fn entries_for(
        &self,
        account_id: &str,
        limit: i64,
    ) -> Result<Vec<LedgerEntry>, AppError> {
        Ok(self.repo.entries_for_account(account_id, limit).await?)
    }

    /// Cross-check every stored balance against the full entry log.
    pub async fn audit(&self) -> Result<AuditReport, AppError> {
        let accounts = self.repo.list_accounts().await?;
        let entries = self.repo.list_entries().await?;
        Ok(build_audit_report(&accounts, &entries))
    }
}
