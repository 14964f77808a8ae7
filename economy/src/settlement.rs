//! Settlement protocol shared by every game.
//!
//! A round's financial effect is one "bet" leg and one "payout" leg (payout
//! may be zero), both keyed off the round id through the reference-id
//! convention, so each leg is insert-or-no-op under retry. Single-shot games
//! write both legs in one transaction; the card and wheel games take the
//! stake when it is wagered and pay out at settlement, each leg itself
//! idempotent.
//!
//! A uniqueness conflict on a leg means "already settled" and is reported as
//! `applied == false`, never as an error to retry destructively.

use abyss_types::{bet_leg_reference, round_reference, Game, SettleLeg, TxKind, UserId};
use thiserror::Error;
use tracing::{debug, warn};

use crate::ledger::apply_in;
use crate::store::{Store, StoreError, StoreTxn};

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a settlement call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SettleResult {
    /// False when the ledger already held the leg(s) for this round.
    pub applied: bool,
    /// Wallet balance as of this transaction.
    pub balance: i64,
}

/// Debit the stake and credit the payout for one round atomically.
///
/// Rolls back entirely when the pre-debit balance check fails; partial
/// application (debit without credit) is structurally impossible.
pub fn settle_round<S: Store>(
    store: &S,
    user: UserId,
    game: Game,
    round_id: &str,
    stake: u64,
    payout: u64,
) -> Result<SettleResult, SettlementError> {
    let mut txn = store.begin()?;
    if txn.balance(user)? < stake as i64 {
        warn!(user, game = game.as_str(), round_id, stake, "stake exceeds balance");
        return Err(SettlementError::InsufficientBalance);
    }
    let bet_reference = round_reference(game, round_id, SettleLeg::Bet);
    let bet_applied = apply_in(
        &mut txn,
        user,
        -(stake as i64),
        TxKind::Bet(game),
        &format!("{} stake", game.as_str()),
        Some(&bet_reference),
    )?;
    if !bet_applied.inserted() {
        // Already settled; the transaction drops unchanged.
        let balance = txn.balance(user)?;
        return Ok(SettleResult {
            applied: false,
            balance,
        });
    }
    let payout_reference = round_reference(game, round_id, SettleLeg::Payout);
    apply_in(
        &mut txn,
        user,
        payout as i64,
        TxKind::Payout(game),
        &format!("{} payout", game.as_str()),
        Some(&payout_reference),
    )?;
    let balance = txn.balance(user)?;
    txn.commit()?;
    debug!(
        user,
        game = game.as_str(),
        round_id,
        stake,
        payout,
        balance,
        "round settled"
    );
    Ok(SettleResult {
        applied: true,
        balance,
    })
}

/// Debit a round's stake (card game `start`; the payout leg follows at the
/// terminal transition).
pub fn debit_stake<S: Store>(
    store: &S,
    user: UserId,
    game: Game,
    round_id: &str,
    amount: u64,
) -> Result<SettleResult, SettlementError> {
    let reference = round_reference(game, round_id, SettleLeg::Bet);
    debit(store, user, game, round_id, amount, &reference)
}

/// Debit one bet within a round (wheel game `place_bet`).
pub fn debit_bet<S: Store>(
    store: &S,
    user: UserId,
    game: Game,
    round_id: &str,
    bet_id: &str,
    amount: u64,
) -> Result<SettleResult, SettlementError> {
    let reference = bet_leg_reference(game, round_id, SettleLeg::Bet, bet_id);
    debit(store, user, game, round_id, amount, &reference)
}

fn debit<S: Store>(
    store: &S,
    user: UserId,
    game: Game,
    round_id: &str,
    amount: u64,
    reference: &str,
) -> Result<SettleResult, SettlementError> {
    let mut txn = store.begin()?;
    if txn.balance(user)? < amount as i64 {
        return Err(SettlementError::InsufficientBalance);
    }
    let applied = apply_in(
        &mut txn,
        user,
        -(amount as i64),
        TxKind::Bet(game),
        &format!("{} stake", game.as_str()),
        Some(reference),
    )?;
    let balance = txn.balance(user)?;
    txn.commit()?;
    debug!(user, game = game.as_str(), round_id, amount, "stake debited");
    Ok(SettleResult {
        applied: applied.inserted(),
        balance,
    })
}

/// Credit a round's payout exactly once. Zero payouts still write their leg
/// so retries can tell "settled for nothing" from "not settled".
pub fn credit_payout<S: Store>(
    store: &S,
    user: UserId,
    game: Game,
    round_id: &str,
    amount: u64,
) -> Result<SettleResult, SettlementError> {
    let mut txn = store.begin()?;
    let reference = round_reference(game, round_id, SettleLeg::Payout);
    let applied = apply_in(
        &mut txn,
        user,
        amount as i64,
        TxKind::Payout(game),
        &format!("{} payout", game.as_str()),
        Some(&reference),
    )?;
    let balance = txn.balance(user)?;
    txn.commit()?;
    debug!(user, game = game.as_str(), round_id, amount, "payout credited");
    Ok(SettleResult {
        applied: applied.inserted(),
        balance,
    })
}

/// Refund individual bets (wheel `undo`/`clear`), all in one transaction.
pub fn refund_bets<S: Store>(
    store: &S,
    user: UserId,
    game: Game,
    round_id: &str,
    leg: SettleLeg,
    bets: &[(String, u64)],
) -> Result<SettleResult, SettlementError> {
    let mut txn = store.begin()?;
    let mut applied_any = false;
    for (bet_id, amount) in bets {
        let reference = bet_leg_reference(game, round_id, leg, bet_id);
        let applied = apply_in(
            &mut txn,
            user,
            *amount as i64,
            TxKind::Refund(game),
            &format!("{} bet refund", game.as_str()),
            Some(&reference),
        )?;
        applied_any |= applied.inserted();
    }
    let balance = txn.balance(user)?;
    txn.commit()?;
    debug!(
        user,
        game = game.as_str(),
        round_id,
        count = bets.len(),
        "bets refunded"
    );
    Ok(SettleResult {
        applied: applied_any,
        balance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger;
    use crate::store::MemoryStore;

    fn funded_store(user: UserId) -> MemoryStore {
        let store = MemoryStore::new();
        ledger::initialize_user(&store, user).unwrap();
        store
    }

    #[test]
    fn settle_round_is_atomic_and_idempotent() {
        let store = funded_store(1);
        let first = settle_round(&store, 1, Game::Multiplier, "r1", 100, 250).unwrap();
        assert!(first.applied);
        assert_eq!(first.balance, 1_150);

        let replay = settle_round(&store, 1, Game::Multiplier, "r1", 100, 250).unwrap();
        assert!(!replay.applied);
        assert_eq!(replay.balance, 1_150);
        assert_eq!(ledger::entries(&store, 1).unwrap().len(), 3);
    }

    #[test]
    fn settle_round_rejects_overdraft_without_writes() {
        let store = funded_store(1);
        let err = settle_round(&store, 1, Game::Cases, "r2", 5_000, 10_000).unwrap_err();
        assert!(matches!(err, SettlementError::InsufficientBalance));
        assert_eq!(ledger::balance(&store, 1).unwrap(), 1_000);
        assert_eq!(ledger::entries(&store, 1).unwrap().len(), 1);
    }

    #[test]
    fn zero_payout_leg_is_written() {
        let store = funded_store(1);
        settle_round(&store, 1, Game::Multiplier, "r3", 100, 0).unwrap();
        let entries = ledger::entries(&store, 1).unwrap();
        let payout = entries
            .iter()
            .find(|e| e.reference_id.as_deref() == Some("multiplier:r3:payout"))
            .unwrap();
        assert_eq!(payout.amount, 0);
        assert_eq!(ledger::balance(&store, 1).unwrap(), 900);
    }

    #[test]
    fn payout_credits_once() {
        let store = funded_store(2);
        let first = credit_payout(&store, 2, Game::Blackjack, "r4", 250).unwrap();
        assert!(first.applied);
        let second = credit_payout(&store, 2, Game::Blackjack, "r4", 250).unwrap();
        assert!(!second.applied);
        assert_eq!(second.balance, 1_250);
    }

    #[test]
    fn refunds_restore_exact_amounts() {
        let store = funded_store(3);
        debit_bet(&store, 3, Game::Roulette, "r5", "b1", 100).unwrap();
        debit_bet(&store, 3, Game::Roulette, "r5", "b2", 50).unwrap();
        assert_eq!(ledger::balance(&store, 3).unwrap(), 850);

        let bets = vec![("b1".to_string(), 100), ("b2".to_string(), 50)];
        let result =
            refund_bets(&store, 3, Game::Roulette, "r5", SettleLeg::Clear, &bets).unwrap();
        assert!(result.applied);
        assert_eq!(result.balance, 1_000);

        // Replaying the refund changes nothing.
        let replay =
            refund_bets(&store, 3, Game::Roulette, "r5", SettleLeg::Clear, &bets).unwrap();
        assert!(!replay.applied);
        assert_eq!(replay.balance, 1_000);
    }
}
