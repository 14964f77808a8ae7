use serde::Serialize;

/// The four mini-games sharing the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Game {
    Blackjack,
    Roulette,
    Multiplier,
    Cases,
}

impl Game {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blackjack => "blackjack",
            Self::Roulette => "roulette",
            Self::Multiplier => "multiplier",
            Self::Cases => "cases",
        }
    }
}

/// Mutating actions on the game surface. Used (with the caller-supplied key)
/// to address the idempotency cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Start,
    Hit,
    Stand,
    PlaceBet,
    Undo,
    Clear,
    Lock,
    Spin,
    Settle,
    Play,
    Open,
    Claim,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Hit => "hit",
            Self::Stand => "stand",
            Self::PlaceBet => "place_bet",
            Self::Undo => "undo",
            Self::Clear => "clear",
            Self::Lock => "lock",
            Self::Spin => "spin",
            Self::Settle => "settle",
            Self::Play => "play",
            Self::Open => "open",
            Self::Claim => "claim",
        }
    }
}

/// Legs of a settlement as they appear in ledger reference ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettleLeg {
    Bet,
    Payout,
    Refund,
    Undo,
    Clear,
}

impl SettleLeg {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bet => "bet",
            Self::Payout => "payout",
            Self::Refund => "refund",
            Self::Undo => "undo",
            Self::Clear => "clear",
        }
    }
}

/// Reference id for a round-level settlement leg: `<game>:<round_id>:<leg>`.
///
/// The reference id is the ledger-level idempotency key; inserting the same
/// leg twice is a no-op at the store.
pub fn round_reference(game: Game, round_id: &str, leg: SettleLeg) -> String {
    format!("{}:{}:{}", game.as_str(), round_id, leg.as_str())
}

/// Reference id for a per-bet leg within a round (wheel game places and
/// refunds individual bets): `<game>:<round_id>:<leg>:<bet_id>`.
pub fn bet_leg_reference(game: Game, round_id: &str, leg: SettleLeg, bet_id: &str) -> String {
    format!(
        "{}:{}:{}:{}",
        game.as_str(),
        round_id,
        leg.as_str(),
        bet_id
    )
}
