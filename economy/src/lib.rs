//! Abyss economy engine.
//!
//! This crate contains the in-process virtual-currency core: an append-only
//! ledger with a wallet projection, idempotent settlement, and the four
//! mini-games (blackjack, roulette, multiplier, loot cases) plus daily
//! rewards that move money through it.
//!
//! ## Money invariants
//! - Every balance change is a ledger entry; the wallet is a projection and
//!   can always be recomputed by summing the log.
//! - Settlement legs carry reference ids; inserting the same leg twice is a
//!   no-op, so every money path is safe to retry.
//! - Stakes are checked and debited inside one transaction; partial
//!   settlement (debit without its payout leg) cannot be committed.
//!
//! The primary entrypoint is [`Engine`].
//!
//! ## Playing a round (example)
//! ```rust,ignore
//! use abyss_economy::Engine;
//!
//! let engine = Engine::new();
//! engine.register_user(42)?;
//! let reply = engine.multiplier_play(42, 100, "round-1")?;
//! assert!(reply.ok);
//! // Retrying with the same key replays the stored reply.
//! let replay = engine.multiplier_play(42, 100, "round-1")?;
//! assert!(replay.replayed);
//! # Ok::<(), abyss_economy::StoreError>(())
//! ```

pub mod casino;
pub mod engine;
pub mod hooks;
pub mod idempotency;
pub mod ledger;
pub mod rewards;
pub mod rng;
pub mod session;
pub mod settlement;
pub mod store;

pub use engine::{ActionReply, ClaimReply, Engine, EngineConfig, GameView};
pub use hooks::{Hooks, NoopHooks};
pub use ledger::LedgerError;
pub use settlement::{SettleResult, SettlementError};
pub use store::{MemoryStore, Store, StoreError, StoreTxn};

#[cfg(any(test, feature = "mocks"))]
pub use hooks::RecordingHooks;
