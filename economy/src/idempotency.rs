//! Idempotency cache for mutating game actions.
//!
//! Keyed by `(user, game, action, key)`; stores the final reply of the first
//! execution and hands it back verbatim on replay. Entries are written only
//! after the owning ledger transaction has committed (or definitively
//! failed), so a crash between commit and cache write merely costs the
//! literal replay — a retried caller recomputes a reply from the same
//! committed ledger state, which is still financially correct.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use abyss_types::{ActionKind, Game, UserId};

type Key = (UserId, Game, ActionKind, String);

/// Stored-reply cache. `V` is the engine's reply type.
pub struct IdempotencyCache<V: Clone> {
    inner: Mutex<HashMap<Key, V>>,
}

impl<V: Clone> Default for IdempotencyCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> IdempotencyCache<V> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Previously stored reply for this action, if any.
    pub fn lookup(&self, user: UserId, game: Game, action: ActionKind, key: &str) -> Option<V> {
        let map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.get(&(user, game, action, key.to_string())).cloned()
    }

    /// Store the outcome of a completed action. First write wins; a reply is
    /// never recomputed once stored.
    pub fn store(&self, user: UserId, game: Game, action: ActionKind, key: &str, value: V) {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.entry((user, game, action, key.to_string()))
            .or_insert(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_write_wins() {
        let cache: IdempotencyCache<u32> = IdempotencyCache::new();
        assert!(cache
            .lookup(1, Game::Blackjack, ActionKind::Start, "k1")
            .is_none());
        cache.store(1, Game::Blackjack, ActionKind::Start, "k1", 10);
        cache.store(1, Game::Blackjack, ActionKind::Start, "k1", 99);
        assert_eq!(
            cache.lookup(1, Game::Blackjack, ActionKind::Start, "k1"),
            Some(10)
        );
    }

    #[test]
    fn keys_are_scoped_per_user_game_action() {
        let cache: IdempotencyCache<u32> = IdempotencyCache::new();
        cache.store(1, Game::Roulette, ActionKind::Spin, "k", 1);
        assert!(cache.lookup(2, Game::Roulette, ActionKind::Spin, "k").is_none());
        assert!(cache.lookup(1, Game::Blackjack, ActionKind::Spin, "k").is_none());
        assert!(cache.lookup(1, Game::Roulette, ActionKind::Settle, "k").is_none());
    }
}
