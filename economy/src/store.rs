//! Ledger storage boundary.
//!
//! The engine talks to its store through the [`Store`] / [`StoreTxn`] traits.
//! A transaction is a scoped object: writes are buffered and become visible
//! only on [`StoreTxn::commit`]; dropping the transaction on any other exit
//! path (early return, panic unwind) rolls everything back.
//!
//! [`MemoryStore`] is the in-process implementation. It serializes
//! transactions behind a single mutex, which gives the same single-writer
//! guarantee an immediate-mode relational transaction would: a transaction
//! reads the balances it will overwrite, so two racing spends against one
//! wallet are decided strictly one after the other.
//!
//! The store exposes no update or delete for ledger entries. Immutability of
//! the log is structural, not a convention.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use abyss_types::{Applied, LedgerEntry, TxKind, UserId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Handle to a transactional ledger store.
pub trait Store {
    type Txn<'a>: StoreTxn
    where
        Self: 'a;

    /// Open a transaction. Mutually exclusive with every other transaction on
    /// the same store.
    fn begin(&self) -> Result<Self::Txn<'_>, StoreError>;
}

/// One open store transaction.
///
/// Reads observe this transaction's own pending writes.
pub trait StoreTxn {
    /// Cached wallet balance (zero for users with no wallet yet).
    fn balance(&self, user: UserId) -> Result<i64, StoreError>;

    /// Overwrite the wallet projection for `user`.
    fn set_balance(&mut self, user: UserId, balance: i64) -> Result<(), StoreError>;

    /// Sum of all ledger amounts for `user` (the authoritative balance).
    fn sum_entries(&self, user: UserId) -> Result<i64, StoreError>;

    /// Append one ledger entry. Duplicate `(user, kind, reference_id)` is an
    /// idempotent no-op reported as [`Applied::Duplicate`]. `created_at` is
    /// stamped by the store.
    fn append(
        &mut self,
        user: UserId,
        amount: i64,
        kind: TxKind,
        description: &str,
        reference_id: Option<&str>,
    ) -> Result<Applied, StoreError>;

    /// All entries for `user`, in append order.
    fn entries(&self, user: UserId) -> Result<Vec<LedgerEntry>, StoreError>;

    /// Make the buffered writes durable. Consumes the transaction; without
    /// this call, nothing happened.
    fn commit(self) -> Result<(), StoreError>;
}

#[derive(Default)]
struct Inner {
    entries: Vec<LedgerEntry>,
    wallets: HashMap<UserId, i64>,
    // Uniqueness index over (user, kind, reference_id).
    references: HashSet<(UserId, TxKind, String)>,
}

/// In-process store backing the engine.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    clock: fn() -> u64,
}

fn system_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            clock: system_now,
        }
    }

    /// Store with a fixed clock, for deterministic timestamps in tests.
    pub fn with_clock(clock: fn() -> u64) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            clock,
        }
    }
}

impl Store for MemoryStore {
    type Txn<'a> = MemoryTxn<'a>;

    fn begin(&self) -> Result<Self::Txn<'_>, StoreError> {
        // A poisoned mutex means a writer panicked mid-transaction; its
        // pending writes were never applied, so the base state is intact.
        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(MemoryTxn {
            guard,
            clock: self.clock,
            pending_entries: Vec::new(),
            pending_balances: HashMap::new(),
            pending_references: HashSet::new(),
        })
    }
}

/// Transaction over [`MemoryStore`]. Holds the store lock for its lifetime.
pub struct MemoryTxn<'a> {
    guard: MutexGuard<'a, Inner>,
    clock: fn() -> u64,
    pending_entries: Vec<LedgerEntry>,
    pending_balances: HashMap<UserId, i64>,
    pending_references: HashSet<(UserId, TxKind, String)>,
}

impl StoreTxn for MemoryTxn<'_> {
    fn balance(&self, user: UserId) -> Result<i64, StoreError> {
        if let Some(balance) = self.pending_balances.get(&user) {
            return Ok(*balance);
        }
        Ok(self.guard.wallets.get(&user).copied().unwrap_or(0))
    }

    fn set_balance(&mut self, user: UserId, balance: i64) -> Result<(), StoreError> {
        self.pending_balances.insert(user, balance);
        Ok(())
    }

    fn sum_entries(&self, user: UserId) -> Result<i64, StoreError> {
        let committed: i64 = self
            .guard
            .entries
            .iter()
            .filter(|e| e.user_id == user)
            .map(|e| e.amount)
            .sum();
        let pending: i64 = self
            .pending_entries
            .iter()
            .filter(|e| e.user_id == user)
            .map(|e| e.amount)
            .sum();
        Ok(committed + pending)
    }

    fn append(
        &mut self,
        user: UserId,
        amount: i64,
        kind: TxKind,
        description: &str,
        reference_id: Option<&str>,
    ) -> Result<Applied, StoreError> {
        if let Some(reference) = reference_id.filter(|r| !r.is_empty()) {
            let key = (user, kind, reference.to_string());
            if self.guard.references.contains(&key) || self.pending_references.contains(&key) {
                return Ok(Applied::Duplicate);
            }
            self.pending_references.insert(key);
        }
        self.pending_entries.push(LedgerEntry {
            user_id: user,
            amount,
            kind,
            description: description.to_string(),
            reference_id: reference_id.filter(|r| !r.is_empty()).map(String::from),
            created_at: (self.clock)(),
        });
        Ok(Applied::Inserted)
    }

    fn entries(&self, user: UserId) -> Result<Vec<LedgerEntry>, StoreError> {
        Ok(self
            .guard
            .entries
            .iter()
            .chain(self.pending_entries.iter())
            .filter(|e| e.user_id == user)
            .cloned()
            .collect())
    }

    fn commit(mut self) -> Result<(), StoreError> {
        self.guard.entries.append(&mut self.pending_entries);
        self.guard.references.extend(self.pending_references.drain());
        for (user, balance) in self.pending_balances.drain() {
            self.guard.wallets.insert(user, balance);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abyss_types::Game;

    #[test]
    fn commit_makes_writes_visible() {
        let store = MemoryStore::with_clock(|| 42);
        let mut txn = store.begin().unwrap();
        let applied = txn
            .append(1, 100, TxKind::Reward, "test credit", Some("r:1"))
            .unwrap();
        assert!(applied.inserted());
        txn.set_balance(1, 100).unwrap();
        txn.commit().unwrap();

        let txn = store.begin().unwrap();
        assert_eq!(txn.balance(1).unwrap(), 100);
        let entries = txn.entries(1).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].created_at, 42);
    }

    #[test]
    fn drop_rolls_back() {
        let store = MemoryStore::new();
        {
            let mut txn = store.begin().unwrap();
            txn.append(1, 500, TxKind::Reward, "never committed", None)
                .unwrap();
            txn.set_balance(1, 500).unwrap();
            // dropped without commit
        }
        let txn = store.begin().unwrap();
        assert_eq!(txn.balance(1).unwrap(), 0);
        assert!(txn.entries(1).unwrap().is_empty());
    }

    #[test]
    fn duplicate_reference_is_skipped() {
        let store = MemoryStore::new();
        let mut txn = store.begin().unwrap();
        let kind = TxKind::Bet(Game::Blackjack);
        assert!(txn
            .append(1, -100, kind, "stake", Some("blackjack:r1:bet"))
            .unwrap()
            .inserted());
        assert_eq!(
            txn.append(1, -100, kind, "stake", Some("blackjack:r1:bet"))
                .unwrap(),
            Applied::Duplicate
        );
        txn.commit().unwrap();

        // Duplicate across transactions too.
        let mut txn = store.begin().unwrap();
        assert_eq!(
            txn.append(1, -100, kind, "stake", Some("blackjack:r1:bet"))
                .unwrap(),
            Applied::Duplicate
        );
        // Same reference under a different kind is a different key.
        assert!(txn
            .append(1, 100, TxKind::Payout(Game::Blackjack), "payout", Some("blackjack:r1:bet"))
            .unwrap()
            .inserted());
    }

    #[test]
    fn reads_observe_pending_writes() {
        let store = MemoryStore::new();
        let mut txn = store.begin().unwrap();
        txn.append(7, 250, TxKind::Reward, "credit", None).unwrap();
        assert_eq!(txn.sum_entries(7).unwrap(), 250);
        txn.set_balance(7, 250).unwrap();
        assert_eq!(txn.balance(7).unwrap(), 250);
    }
}
