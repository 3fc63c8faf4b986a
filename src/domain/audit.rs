use std::collections::HashMap;

use serde::Serialize;

use super::{Account, AccountId, AccountKind, EntryId, LedgerEntry, MinorUnits, TransferId};

/// Derive the balance for a single account by replaying its entries.
/// The stored balance on the account row must always agree with this.
pub fn balance_from_entries(account_id: &str, entries: &[LedgerEntry]) -> MinorUnits {
    entries
        .iter()
        .filter(|e| e.account_id == account_id)
        .map(|e| e.amount)
        .sum()
}

/// Derive balances for every account mentioned in the entry log.
pub fn balances_from_entries(entries: &[LedgerEntry]) -> HashMap<AccountId, MinorUnits> {
    let mut balances: HashMap<AccountId, MinorUnits> = HashMap::new();
    for entry in entries {
        *balances.entry(entry.account_id.clone()).or_insert(0) += entry.amount;
    }
    balances
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AuditIssue {
    /// Stored balance disagrees with the replayed entry log.
    BalanceMismatch {
        account: AccountId,
        stored: MinorUnits,
        derived: MinorUnits,
    },
    /// Entries reference an account that has no row.
    MissingAccount {
        account: AccountId,
        derived: MinorUnits,
    },
    /// The legs grouped under one transfer id do not sum to zero.
    UnbalancedTransfer {
        transfer_id: TransferId,
        sum: MinorUnits,
    },
    /// A transfer has the wrong number of legs or broken cross-links.
    PairMismatch { transfer_id: TransferId },
    /// A standalone posting claims a related leg that is not in its group.
    DanglingRelatedEntry { entry: EntryId },
    /// A user account row carries a negative stored balance.
    NegativeUserBalance {
        account: AccountId,
        balance: MinorUnits,
    },
}

impl std::fmt::Display for AuditIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditIssue::BalanceMismatch {
                account,
                stored,
                derived,
            } => write!(
                f,
                "account {} stores balance {} but entries derive {}",
                account, stored, derived
            ),
            AuditIssue::MissingAccount { account, derived } => write!(
                f,
                "entries derive balance {} for account {} which has no row",
                derived, account
            ),
            AuditIssue::UnbalancedTransfer { transfer_id, sum } => {
                write!(f, "transfer {} legs sum to {} instead of 0", transfer_id, sum)
            }
            AuditIssue::PairMismatch { transfer_id } => {
                write!(f, "transfer {} has malformed legs", transfer_id)
            }
            AuditIssue::DanglingRelatedEntry { entry } => {
                write!(f, "entry {} references a missing related leg", entry)
            }
            AuditIssue::NegativeUserBalance { account, balance } => {
                write!(f, "user account {} has negative balance {}", account, balance)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub account_count: usize,
    pub entry_count: usize,
    pub transfer_count: usize,
    pub issues: Vec<AuditIssue>,
}

impl AuditReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Cross-check the stored state against the entry log.
///
/// Verifies, for the whole ledger:
/// - every stored balance equals the balance replayed from entries
/// - every transfer groups one or two legs; two-leg transfers sum to zero
///   and cross-link each other
/// - no user account row holds a negative balance
pub fn build_audit_report(accounts: &[Account], entries: &[LedgerEntry]) -> AuditReport {
    let mut issues = Vec::new();

    // Stored vs derived balances.
    let mut derived = balances_from_entries(entries);
    for account in accounts {
        let expected = derived.remove(&account.id).unwrap_or(0);
        if account.balance != expected {
            issues.push(AuditIssue::BalanceMismatch {
                account: account.id.clone(),
                stored: account.balance,
                derived: expected,
            });
        }
        if account.kind == AccountKind::User && account.balance < 0 {
            issues.push(AuditIssue::NegativeUserBalance {
                account: account.id.clone(),
                balance: account.balance,
            });
        }
    }
    // Whatever is left in the derived map has entries but no account row.
    for (account, balance) in derived {
        issues.push(AuditIssue::MissingAccount {
            account,
            derived: balance,
        });
    }

    // Pair structure per transfer id.
    let mut groups: HashMap<TransferId, Vec<&LedgerEntry>> = HashMap::new();
    for entry in entries {
        groups.entry(entry.transfer_id).or_default().push(entry);
    }
    let transfer_count = groups.len();
    for (transfer_id, legs) in &groups {
        match legs.as_slice() {
            [single] => {
                if single.related_id.is_some() {
                    issues.push(AuditIssue::DanglingRelatedEntry { entry: single.id });
                }
            }
            [a, b] => {
                let sum = a.amount + b.amount;
                if sum != 0 {
                    issues.push(AuditIssue::UnbalancedTransfer {
                        transfer_id: *transfer_id,
                        sum,
                    });
                }
                let linked = a.related_id == Some(b.id) && b.related_id == Some(a.id);
                if !linked {
                    issues.push(AuditIssue::PairMismatch {
                        transfer_id: *transfer_id,
                    });
                }
            }
            _ => {
                issues.push(AuditIssue::PairMismatch {
                    transfer_id: *transfer_id,
                });
            }
        }
    }

    AuditReport {
        account_count: accounts.len(),
        entry_count: entries.len(),
        transfer_count,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntryReason, TransferRecord};

    fn paired(from: &str, to: &str, amount: MinorUnits) -> (LedgerEntry, LedgerEntry) {
        let record = TransferRecord::new(from, to, amount, EntryReason::Transfer);
        (record.debit, record.credit)
    }

    fn account_with_balance(id: &str, kind: AccountKind, balance: MinorUnits) -> Account {
        let mut account = Account::new(id, kind);
        account.balance = balance;
        account
    }

    #[test]
    fn test_balance_from_entries_empty() {
        assert_eq!(balance_from_entries("alice", &[]), 0);
    }

    #[test]
    fn test_balance_from_entries_mixed() {
        let (d1, c1) = paired("treasury", "alice", 5000);
        let (d2, c2) = paired("alice", "bob", 1500);
        let entries = vec![d1, c1, d2, c2];

        assert_eq!(balance_from_entries("alice", &entries), 3500);
        assert_eq!(balance_from_entries("bob", &entries), 1500);
        assert_eq!(balance_from_entries("treasury", &entries), -5000);
    }

    #[test]
    fn test_paired_entries_sum_to_zero_per_account_set() {
        let (d1, c1) = paired("a", "b", 1000);
        let (d2, c2) = paired("b", "c", 500);
        let entries = vec![d1, c1, d2, c2];

        let total: MinorUnits = balances_from_entries(&entries).values().sum();
        assert_eq!(total, 0, "paired movements form a closed system");
    }

    #[test]
    fn test_healthy_report() {
        let (debit, credit) = paired("treasury", "alice", 800);
        let accounts = vec![
            account_with_balance("treasury", AccountKind::System, -800),
            account_with_balance("alice", AccountKind::User, 800),
        ];

        let report = build_audit_report(&accounts, &[debit, credit]);

        assert!(report.is_healthy(), "issues: {:?}", report.issues);
        assert_eq!(report.account_count, 2);
        assert_eq!(report.entry_count, 2);
        assert_eq!(report.transfer_count, 1);
    }

    #[test]
    fn test_detects_balance_mismatch() {
        let (debit, credit) = paired("treasury", "alice", 800);
        let accounts = vec![
            account_with_balance("treasury", AccountKind::System, -800),
            account_with_balance("alice", AccountKind::User, 900), // Tampered
        ];

        let report = build_audit_report(&accounts, &[debit, credit]);

        assert!(report.issues.iter().any(|i| matches!(
            i,
            AuditIssue::BalanceMismatch { account, stored: 900, derived: 800 } if account == "alice"
        )));
    }

    #[test]
    fn test_detects_missing_account_row() {
        let (debit, credit) = paired("treasury", "alice", 800);
        let accounts = vec![account_with_balance("treasury", AccountKind::System, -800)];

        let report = build_audit_report(&accounts, &[debit, credit]);

        assert!(report.issues.iter().any(|i| matches!(
            i,
            AuditIssue::MissingAccount { account, derived: 800 } if account == "alice"
        )));
    }

    #[test]
    fn test_detects_unbalanced_transfer() {
        let (debit, mut credit) = paired("alice", "bob", 500);
        credit.amount = 400; // Corrupted leg
        let accounts = vec![
            account_with_balance("alice", AccountKind::User, -500),
            account_with_balance("bob", AccountKind::User, 400),
        ];

        let report = build_audit_report(&accounts, &[debit, credit]);

        assert!(report.issues.iter().any(|i| matches!(
            i,
            AuditIssue::UnbalancedTransfer { sum: -100, .. }
        )));
    }

    #[test]
    fn test_detects_broken_cross_link() {
        let (debit, mut credit) = paired("alice", "bob", 500);
        credit.related_id = Some(credit.id); // Points at itself
        let accounts = vec![
            account_with_balance("alice", AccountKind::User, -500),
            account_with_balance("bob", AccountKind::User, 500),
        ];

        let report = build_audit_report(&accounts, &[debit, credit]);

        assert!(report
            .issues
            .iter()
            .any(|i| matches!(i, AuditIssue::PairMismatch { .. })));
    }

    #[test]
    fn test_standalone_posting_is_legal() {
        let entry = LedgerEntry::new("alice", 250, EntryReason::Adjustment, uuid::Uuid::new_v4());
        let accounts = vec![account_with_balance("alice", AccountKind::User, 250)];

        let report = build_audit_report(&accounts, &[entry]);

        assert!(report.is_healthy(), "issues: {:?}", report.issues);
    }

    #[test]
    fn test_detects_negative_user_balance() {
        let accounts = vec![account_with_balance("alice", AccountKind::User, -10)];

        let report = build_audit_report(&accounts, &[]);

        assert!(report.issues.iter().any(|i| matches!(
            i,
            AuditIssue::NegativeUserBalance { balance: -10, .. }
        )));
    }
}
