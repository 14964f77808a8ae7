use serde::Serialize;
use thiserror::Error;

/// Error taxonomy surfaced by every game action.
///
/// These are expected, caller-recoverable conditions, not faults: each reply
/// carries the current state snapshot alongside the code so a caller can
/// resynchronize without guessing. An idempotent replay is a tag on the
/// reply, not a member of this enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    #[error("unauthorized")]
    Unauthorized,
    #[error("invalid payload")]
    InvalidPayload,
    #[error("idempotency key required")]
    MissingIdempotency,
    #[error("bet below minimum")]
    InvalidBetMin,
    #[error("bet above maximum")]
    InvalidBetMax,
    #[error("invalid bet selection")]
    InvalidSelection,
    #[error("aggregate stake above round maximum")]
    MaxTotalBet,
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("action not legal in current phase")]
    InvalidState,
    #[error("a round is already in progress")]
    RoundInProgress,
    #[error("deck exhausted")]
    DeckExhausted,
    #[error("no bets placed")]
    NoBets,
    #[error("no result to settle")]
    NoResult,
    #[error("unknown case id")]
    InvalidCase,
    #[error("settlement failed")]
    SettlementFailed,
}

impl ErrorCode {
    /// Stable wire identifier for this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::InvalidPayload => "invalid_payload",
            Self::MissingIdempotency => "missing_idempotency",
            Self::InvalidBetMin => "invalid_bet_min",
            Self::InvalidBetMax => "invalid_bet_max",
            Self::InvalidSelection => "invalid_selection",
            Self::MaxTotalBet => "max_total_bet",
            Self::InsufficientBalance => "insufficient_balance",
            Self::InvalidState => "invalid_state",
            Self::RoundInProgress => "round_in_progress",
            Self::DeckExhausted => "deck_exhausted",
            Self::NoBets => "no_bets",
            Self::NoResult => "no_result",
            Self::InvalidCase => "invalid_case",
            Self::SettlementFailed => "settlement_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_snake_case() {
        let json = serde_json::to_string(&ErrorCode::InsufficientBalance).unwrap();
        assert_eq!(json, "\"insufficient_balance\"");
        assert_eq!(
            json.trim_matches('"'),
            ErrorCode::InsufficientBalance.as_str()
        );
    }

    #[test]
    fn display_is_human_readable() {
        assert_eq!(
            ErrorCode::RoundInProgress.to_string(),
            "a round is already in progress"
        );
    }
}
