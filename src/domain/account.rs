use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::money::MinorUnits;

/// Accounts are keyed by opaque identifiers supplied by the caller
/// (user ids, merchant ids). The ledger does not mint them.
pub type AccountId = String;

/// The system account that funds deposits and absorbs withdrawals.
/// Every external money movement is a transfer against this account.
pub const TREASURY_ACCOUNT: &str = "treasury";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Customer and merchant accounts. Balance must never go below zero.
    User,
    /// Ledger-internal counterparty accounts (the treasury). These hold
    /// the mirror side of deposits and withdrawals and may go negative.
    System,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::User => "user",
            AccountKind::System => "system",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(AccountKind::User),
            "system" => Some(AccountKind::System),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub kind: AccountKind,
    /// Stored balance in minor units. Kept in lockstep with the entry log:
    /// every mutation updates balance and appends an entry in one transaction.
    pub balance: MinorUnits,
    /// Bumped on every applied mutation. A cheap staleness token for readers.
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(id: impl Into<AccountId>, kind: AccountKind) -> Self {
        Self {
            id: id.into(),
            kind,
            balance: 0,
            version: 0,
            created_at: Utc::now(),
        }
    }

    /// Only system accounts may carry a negative balance.
    pub fn allows_negative(&self) -> bool {
        matches!(self.kind, AccountKind::System)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_kind_roundtrip() {
        for kind in [AccountKind::User, AccountKind::System] {
            let s = kind.as_str();
            let parsed = AccountKind::from_str(s).unwrap();
            assert_eq!(kind, parsed);
        }
    }

    #[test]
    fn test_user_accounts_disallow_negative() {
        let account = Account::new("alice", AccountKind::User);
        assert!(!account.allows_negative());
    }

    #[test]
    fn test_system_accounts_allow_negative() {
        let treasury = Account::new(TREASURY_ACCOUNT, AccountKind::System);
        assert!(treasury.allows_negative());
    }

    #[test]
    fn test_new_account_starts_empty() {
        let account = Account::new("bob", AccountKind::User);
        assert_eq!(account.balance, 0);
        assert_eq!(account.version, 0);
    }
}
