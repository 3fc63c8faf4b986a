use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, MinorUnits};

pub type EntryId = Uuid;
pub type TransferId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Money leaving the account. The entry amount is negative.
    Debit,
    /// Money entering the account. The entry amount is positive.
    Credit,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Debit => "debit",
            Direction::Credit => "credit",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "debit" => Some(Direction::Debit),
            "credit" => Some(Direction::Credit),
            _ => None,
        }
    }

    /// The direction implied by a signed amount.
    pub fn of(amount: MinorUnits) -> Self {
        if amount < 0 {
            Direction::Debit
        } else {
            Direction::Credit
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why an entry exists. Carried verbatim into exports and audit output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryReason {
    Deposit,
    Withdrawal,
    Transfer,
    Refund,
    Adjustment,
}

impl EntryReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryReason::Deposit => "deposit",
            EntryReason::Withdrawal => "withdrawal",
            EntryReason::Transfer => "transfer",
            EntryReason::Refund => "refund",
            EntryReason::Adjustment => "adjustment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "deposit" => Some(EntryReason::Deposit),
            "withdrawal" => Some(EntryReason::Withdrawal),
            "transfer" => Some(EntryReason::Transfer),
            "refund" => Some(EntryReason::Refund),
            "adjustment" => Some(EntryReason::Adjustment),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable line in the ledger. Entries are write-once: corrections are
/// made by appending compensating entries, never by editing history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    /// Monotonically increasing sequence number for total ordering.
    pub seq: i64,
    pub account_id: AccountId,
    /// Signed amount in minor units. Negative for debits, positive for credits.
    pub amount: MinorUnits,
    pub direction: Direction,
    pub reason: EntryReason,
    /// Groups the two legs of a movement. Standalone postings get their own id.
    pub transfer_id: TransferId,
    /// The opposite leg of the same transfer, if one exists.
    pub related_id: Option<EntryId>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Create a standalone posting. Sequence number is assigned by the repository.
    pub fn new(
        account_id: impl Into<AccountId>,
        amount: MinorUnits,
        reason: EntryReason,
        transfer_id: TransferId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            seq: 0, // Will be set by repository
            account_id: account_id.into(),
            amount,
            direction: Direction::of(amount),
            reason,
            transfer_id,
            related_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_related(mut self, related_id: EntryId) -> Self {
        self.related_id = Some(related_id);
        self
    }
}

/// The two cross-linked legs of one movement: a debit on the source account
/// and a credit of the same magnitude on the destination account. The pair is
/// built in memory and persisted as a single transaction.
#[derive(Debug, Clone)]
pub struct TransferRecord {
    pub transfer_id: TransferId,
    pub debit: LedgerEntry,
    pub credit: LedgerEntry,
}

impl TransferRecord {
    pub fn new(
        from_account: impl Into<AccountId>,
        to_account: impl Into<AccountId>,
        amount: MinorUnits,
        reason: EntryReason,
    ) -> Self {
        assert!(amount > 0, "Transfer amount must be positive");
        let transfer_id = Uuid::new_v4();
        let mut debit = LedgerEntry::new(from_account, -amount, reason, transfer_id);
        let mut credit = LedgerEntry::new(to_account, amount, reason, transfer_id);
        debit.related_id = Some(credit.id);
        credit.related_id = Some(debit.id);
        Self {
            transfer_id,
            debit,
            credit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_of_signed_amount() {
        assert_eq!(Direction::of(-1), Direction::Debit);
        assert_eq!(Direction::of(1), Direction::Credit);
    }

    #[test]
    fn test_entry_reason_roundtrip() {
        for reason in [
            EntryReason::Deposit,
            EntryReason::Withdrawal,
            EntryReason::Transfer,
            EntryReason::Refund,
            EntryReason::Adjustment,
        ] {
            let s = reason.as_str();
            let parsed = EntryReason::from_str(s).unwrap();
            assert_eq!(reason, parsed);
        }
    }

    #[test]
    fn test_transfer_record_legs_balance() {
        let record = TransferRecord::new("alice", "bob", 5000, EntryReason::Transfer);

        assert_eq!(record.debit.amount, -5000);
        assert_eq!(record.credit.amount, 5000);
        assert_eq!(record.debit.amount + record.credit.amount, 0);
        assert_eq!(record.debit.direction, Direction::Debit);
        assert_eq!(record.credit.direction, Direction::Credit);
    }

    #[test]
    fn test_transfer_record_legs_are_cross_linked() {
        let record = TransferRecord::new("alice", "bob", 100, EntryReason::Transfer);

        assert_eq!(record.debit.transfer_id, record.transfer_id);
        assert_eq!(record.credit.transfer_id, record.transfer_id);
        assert_eq!(record.debit.related_id, Some(record.credit.id));
        assert_eq!(record.credit.related_id, Some(record.debit.id));
        assert_ne!(record.debit.id, record.credit.id);
    }

    #[test]
    #[should_panic(expected = "Transfer amount must be positive")]
    fn test_transfer_record_requires_positive_amount() {
        TransferRecord::new("alice", "bob", 0, EntryReason::Transfer);
    }
}
