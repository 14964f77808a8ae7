//! Game state machines.
//!
//! Each game is a pure state machine over its round type; all money movement
//! goes through [`crate::settlement`], driven by the engine.

pub mod blackjack;
pub(crate) mod cards;
pub mod cases;
pub(crate) mod history;
pub mod multiplier;
pub mod roulette;
