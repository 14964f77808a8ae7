//! Session store for live game rounds.
//!
//! One slot per `(user, game)` pair, guarded by its own lock held only for
//! the duration of a single state transition. Two users never contend on the
//! same lock; the same user's retried or double-submitted calls serialize
//! here before they ever reach the ledger. Each game manager gets its own
//! injected instance rather than sharing module-level state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use abyss_types::UserId;

/// Keyed slot map. `R` is the game's round (or slot) state.
pub struct SessionStore<R> {
    slots: Mutex<HashMap<UserId, Arc<Mutex<R>>>>,
}

impl<R: Default> Default for SessionStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Default> SessionStore<R> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Run `f` with exclusive access to this user's slot, creating an initial
    /// slot on first use.
    pub fn with<T>(&self, user: UserId, f: impl FnOnce(&mut R) -> T) -> T {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(user).or_default())
        };
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}
