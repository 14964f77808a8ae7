use serde::Serialize;

use crate::{Game, UserId};

/// Transaction kind taxonomy for ledger entries.
///
/// Game-scoped kinds render as `<game>_bet`, `<game>_payout`,
/// `<game>_refund`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TxKind {
    InitialGrant,
    Reward,
    Purchase,
    Adjustment,
    DailyReward,
    Bet(Game),
    Payout(Game),
    Refund(Game),
}

impl TxKind {
    /// Stable string identifier as stored in the ledger.
    pub fn label(&self) -> String {
        match self {
            Self::InitialGrant => "initial_grant".to_string(),
            Self::Reward => "reward".to_string(),
            Self::Purchase => "purchase".to_string(),
            Self::Adjustment => "adjustment".to_string(),
            Self::DailyReward => "daily_reward".to_string(),
            Self::Bet(game) => format!("{}_bet", game.as_str()),
            Self::Payout(game) => format!("{}_payout", game.as_str()),
            Self::Refund(game) => format!("{}_refund", game.as_str()),
        }
    }
}

/// One immutable row of the financial log.
///
/// `amount` is a signed integer in minor units; debits are negative.
/// Once appended an entry is never updated or deleted — the store exposes no
/// operation that could.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerEntry {
    pub user_id: UserId,
    pub amount: i64,
    pub kind: TxKind,
    pub description: String,
    /// Unique per `(user_id, kind)` when present; duplicate inserts are
    /// reported as [`Applied::Duplicate`] and change nothing.
    pub reference_id: Option<String>,
    /// Unix seconds, stamped by the store at commit.
    pub created_at: u64,
}

/// Cached running balance, derived from the ledger.
///
/// Invariant: equal to the sum of the user's ledger amounts at every
/// quiescent point. Resynchronizable by full recomputation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Wallet {
    pub user_id: UserId,
    pub balance: i64,
}

/// Result of an insert-or-skip ledger append.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Applied {
    /// The entry was written and the wallet adjusted.
    Inserted,
    /// An entry with the same `(user, kind, reference_id)` already exists;
    /// nothing was written.
    Duplicate,
}

impl Applied {
    pub fn inserted(&self) -> bool {
        matches!(self, Applied::Inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_labels_follow_taxonomy() {
        assert_eq!(TxKind::InitialGrant.label(), "initial_grant");
        assert_eq!(TxKind::DailyReward.label(), "daily_reward");
        assert_eq!(TxKind::Bet(Game::Blackjack).label(), "blackjack_bet");
        assert_eq!(TxKind::Payout(Game::Roulette).label(), "roulette_payout");
        assert_eq!(TxKind::Refund(Game::Roulette).label(), "roulette_refund");
    }
}
