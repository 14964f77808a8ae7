//! Ledger mutation helpers over the store boundary.
//!
//! Each helper opens one transaction and keeps the wallet projection aligned
//! with the log inside it: an append and its balance adjustment always land
//! together or not at all.

use abyss_types::{Applied, LedgerEntry, TxKind, UserId, INITIAL_GRANT_GOLD};
use thiserror::Error;

use crate::store::{Store, StoreError, StoreTxn};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("amount must be positive")]
    NonPositiveAmount,
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Append one entry and adjust the wallet inside an already-open transaction.
///
/// Duplicate `(user, kind, reference_id)` leaves the wallet untouched and
/// reports [`Applied::Duplicate`]. Zero amounts are allowed; settlement
/// payout legs may legitimately pay nothing.
pub(crate) fn apply_in(
    txn: &mut impl StoreTxn,
    user: UserId,
    amount: i64,
    kind: TxKind,
    description: &str,
    reference_id: Option<&str>,
) -> Result<Applied, StoreError> {
    let applied = txn.append(user, amount, kind, description, reference_id)?;
    if applied.inserted() && amount != 0 {
        let balance = txn.balance(user)?;
        txn.set_balance(user, balance + amount)?;
    }
    Ok(applied)
}

/// Append one entry in its own transaction (insert-or-skip).
pub fn apply<S: Store>(
    store: &S,
    user: UserId,
    amount: i64,
    kind: TxKind,
    description: &str,
    reference_id: Option<&str>,
) -> Result<Applied, StoreError> {
    let mut txn = store.begin()?;
    let applied = apply_in(&mut txn, user, amount, kind, description, reference_id)?;
    txn.commit()?;
    Ok(applied)
}

/// Cached wallet balance.
pub fn balance<S: Store>(store: &S, user: UserId) -> Result<i64, StoreError> {
    store.begin()?.balance(user)
}

/// Recompute the wallet by summing every ledger entry.
///
/// Used wherever staleness is suspected; returns the recomputed balance.
pub fn sync_wallet<S: Store>(store: &S, user: UserId) -> Result<i64, StoreError> {
    let mut txn = store.begin()?;
    let balance = txn.sum_entries(user)?;
    txn.set_balance(user, balance)?;
    txn.commit()?;
    Ok(balance)
}

/// All ledger entries for a user, oldest first.
pub fn entries<S: Store>(store: &S, user: UserId) -> Result<Vec<LedgerEntry>, StoreError> {
    store.begin()?.entries(user)
}

/// Grant the signup bonus exactly once per user.
pub fn initialize_user<S: Store>(store: &S, user: UserId) -> Result<Applied, StoreError> {
    let reference = format!("signup:{user}:initial_grant");
    apply(
        store,
        user,
        INITIAL_GRANT_GOLD as i64,
        TxKind::InitialGrant,
        "signup bonus",
        Some(&reference),
    )
}

/// Credit `amount` to a user.
pub fn add_funds<S: Store>(
    store: &S,
    user: UserId,
    amount: u64,
    kind: TxKind,
    description: &str,
    reference_id: Option<&str>,
) -> Result<Applied, LedgerError> {
    if amount == 0 {
        return Err(LedgerError::NonPositiveAmount);
    }
    Ok(apply(store, user, amount as i64, kind, description, reference_id)?)
}

/// Debit `amount` from a user, failing (and writing nothing) when the balance
/// inside the transaction does not cover it.
pub fn spend<S: Store>(
    store: &S,
    user: UserId,
    amount: u64,
    kind: TxKind,
    description: &str,
    reference_id: Option<&str>,
) -> Result<Applied, LedgerError> {
    if amount == 0 {
        return Err(LedgerError::NonPositiveAmount);
    }
    let mut txn = store.begin()?;
    if txn.balance(user)? < amount as i64 {
        return Err(LedgerError::InsufficientBalance);
    }
    let applied = apply_in(
        &mut txn,
        user,
        -(amount as i64),
        kind,
        description,
        reference_id,
    )?;
    txn.commit()?;
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use abyss_types::Game;

    #[test]
    fn initial_grant_applies_once() {
        let store = MemoryStore::new();
        assert!(initialize_user(&store, 1).unwrap().inserted());
        assert_eq!(initialize_user(&store, 1).unwrap(), Applied::Duplicate);
        assert_eq!(balance(&store, 1).unwrap(), INITIAL_GRANT_GOLD as i64);
        assert_eq!(entries(&store, 1).unwrap().len(), 1);
    }

    #[test]
    fn spend_rejects_overdraft() {
        let store = MemoryStore::new();
        initialize_user(&store, 1).unwrap();
        let err = spend(&store, 1, 2_000, TxKind::Purchase, "too much", None).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance));
        // Nothing written.
        assert_eq!(balance(&store, 1).unwrap(), 1_000);
        assert_eq!(entries(&store, 1).unwrap().len(), 1);
    }

    #[test]
    fn wallet_tracks_ledger_sum() {
        let store = MemoryStore::new();
        initialize_user(&store, 3).unwrap();
        add_funds(&store, 3, 500, TxKind::Reward, "bonus", None).unwrap();
        spend(&store, 3, 200, TxKind::Bet(Game::Multiplier), "stake", None).unwrap();
        let summed: i64 = entries(&store, 3).unwrap().iter().map(|e| e.amount).sum();
        assert_eq!(balance(&store, 3).unwrap(), summed);
        assert_eq!(sync_wallet(&store, 3).unwrap(), summed);
    }

    #[test]
    fn sync_wallet_repairs_drift() {
        let store = MemoryStore::new();
        initialize_user(&store, 4).unwrap();
        // Force the projection out of line with the log.
        {
            let mut txn = store.begin().unwrap();
            txn.set_balance(4, 9_999).unwrap();
            txn.commit().unwrap();
        }
        assert_eq!(balance(&store, 4).unwrap(), 9_999);
        assert_eq!(sync_wallet(&store, 4).unwrap(), 1_000);
        assert_eq!(balance(&store, 4).unwrap(), 1_000);
    }
}
