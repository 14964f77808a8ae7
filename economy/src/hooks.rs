//! Write-only collaborators notified after successful settlement.
//!
//! Neither sink participates in financial correctness: results feed
//! leaderboards, XP feeds the leveling system. Failures here must never roll
//! back a committed settlement.

use abyss_types::{Game, UserId};

pub trait Hooks: Send + Sync {
    /// Record a settled round for leaderboards. `net_delta` is payout minus
    /// stake.
    fn record_game_result(&self, _user: UserId, _game: Game, _net_delta: i64) {}

    /// Award XP for play activity.
    fn award_xp(&self, _user: UserId, _amount: u64, _reason: &str) {}
}

/// Default no-op sinks.
pub struct NoopHooks;

impl Hooks for NoopHooks {}

#[cfg(any(test, feature = "mocks"))]
pub use recording::RecordingHooks;

#[cfg(any(test, feature = "mocks"))]
mod recording {
    use std::sync::{Mutex, PoisonError};

    use super::*;

    /// Test double that captures every notification.
    #[derive(Default)]
    pub struct RecordingHooks {
        pub results: Mutex<Vec<(UserId, Game, i64)>>,
        pub xp: Mutex<Vec<(UserId, u64, String)>>,
    }

    impl Hooks for RecordingHooks {
        fn record_game_result(&self, user: UserId, game: Game, net_delta: i64) {
            self.results
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((user, game, net_delta));
        }

        fn award_xp(&self, user: UserId, amount: u64, reason: &str) {
            self.xp
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((user, amount, reason.to_string()));
        }
    }
}
