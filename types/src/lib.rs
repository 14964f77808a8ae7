//! Common types for the abyss economy core.
//!
//! Defines the ledger data model, the game/action taxonomy, the error
//! taxonomy, and the constants shared by the engine and its callers.

mod constants;
mod error;
mod game;
mod ledger;

pub use constants::*;
pub use error::ErrorCode;
pub use game::{bet_leg_reference, round_reference, ActionKind, Game, SettleLeg};
pub use ledger::{Applied, LedgerEntry, TxKind, Wallet};

/// Identifies a user. Identity resolution (sessions, tokens) happens outside
/// this core; callers hand in an already-resolved id.
pub type UserId = u64;
