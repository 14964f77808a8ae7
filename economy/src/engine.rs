//! Game engine facade.
//!
//! One entry point per player action. Every action runs under the user's
//! per-game session lock, moves money only through the settlement helpers,
//! and replies with a full state snapshot plus the wallet balance so callers
//! can always resynchronize. Money-mutating actions require an idempotency
//! key; the reply of the first execution is cached and replayed verbatim
//! (tagged `replayed`) for retries.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::info;

use abyss_types::{
    ActionKind, ErrorCode, Game, LedgerEntry, SettleLeg, TxKind, UserId, XP_PER_ROUND,
};

use crate::casino::blackjack::{BlackjackConfig, BlackjackRound, BlackjackSnapshot, Phase};
use crate::casino::cases::{self, CaseOpening, CaseSlot};
use crate::casino::multiplier::{MultiplierConfig, MultiplierRound, MultiplierRoundView, MultiplierSlot};
use crate::casino::roulette::{
    BetKind, Phase as RoulettePhase, RouletteConfig, RouletteRound, RouletteSnapshot,
};
use crate::hooks::{Hooks, NoopHooks};
use crate::idempotency::IdempotencyCache;
use crate::ledger::{self, LedgerError};
use crate::rewards::{DailyRewards, RewardStateView};
use crate::rng::GameRng;
use crate::session::SessionStore;
use crate::settlement::{self, SettlementError};
use crate::store::{MemoryStore, Store, StoreError};

const SECONDS_PER_DAY: u64 = 86_400;

fn system_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Clone, Debug, Default)]
pub struct EngineConfig {
    pub blackjack: BlackjackConfig,
    pub roulette: RouletteConfig,
    pub multiplier: MultiplierConfig,
}

/// State snapshot carried on every reply.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum GameView {
    Blackjack(BlackjackSnapshot),
    Roulette(RouletteSnapshot),
    Multiplier(MultiplierStateView),
    Cases(CaseStateView),
}

#[derive(Clone, Debug, Serialize)]
pub struct MultiplierStateView {
    pub in_progress: bool,
    pub current: Option<MultiplierRoundView>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CaseStateView {
    pub opening: Option<CaseOpening>,
}

/// Reply to a game action. `ok == false` pairs with an [`ErrorCode`]; the
/// snapshot and balance are current either way.
#[derive(Clone, Debug, Serialize)]
pub struct ActionReply {
    pub ok: bool,
    pub error: Option<ErrorCode>,
    pub state: GameView,
    pub balance: i64,
    /// Set when this reply came from the idempotency cache.
    pub replayed: bool,
}

impl ActionReply {
    fn success(state: GameView, balance: i64) -> Self {
        Self {
            ok: true,
            error: None,
            state,
            balance,
            replayed: false,
        }
    }

    fn failure(code: ErrorCode, state: GameView, balance: i64) -> Self {
        Self {
            ok: false,
            error: Some(code),
            state,
            balance,
            replayed: false,
        }
    }
}

/// Reply to a daily-reward claim.
#[derive(Clone, Debug, Serialize)]
pub struct ClaimReply {
    pub ok: bool,
    pub error: Option<ErrorCode>,
    pub claimed_amount: u64,
    pub balance: i64,
    pub state: RewardStateView,
}

/// The in-process economy: ledger-backed wallets, four games, daily rewards.
pub struct Engine<S: Store = MemoryStore> {
    store: S,
    config: EngineConfig,
    rng: Mutex<GameRng>,
    clock: fn() -> u64,
    hooks: Box<dyn Hooks>,
    cache: IdempotencyCache<ActionReply>,
    blackjack: SessionStore<BlackjackRound>,
    roulette: SessionStore<RouletteRound>,
    multiplier: SessionStore<MultiplierSlot>,
    cases: SessionStore<CaseSlot>,
    rewards: DailyRewards,
}

impl Default for Engine<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine<MemoryStore> {
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }
}

impl<S: Store> Engine<S> {
    pub fn with_store(store: S) -> Self {
        Self {
            store,
            config: EngineConfig::default(),
            rng: Mutex::new(GameRng::from_entropy()),
            clock: system_now,
            hooks: Box::new(NoopHooks),
            cache: IdempotencyCache::new(),
            blackjack: SessionStore::new(),
            roulette: SessionStore::new(),
            multiplier: SessionStore::new(),
            cases: SessionStore::new(),
            rewards: DailyRewards::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Deterministic randomness, for tests and replay analysis.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(GameRng::from_seed(seed));
        self
    }

    pub fn with_hooks(mut self, hooks: Box<dyn Hooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_clock(mut self, clock: fn() -> u64) -> Self {
        self.clock = clock;
        self
    }

    fn rng(&self) -> MutexGuard<'_, GameRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ---- wallet ----

    /// Grant the signup bonus (once) and return the balance.
    pub fn register_user(&self, user: UserId) -> Result<i64, StoreError> {
        let applied = ledger::initialize_user(&self.store, user)?;
        if applied.inserted() {
            info!(user, "user initialized");
        }
        ledger::balance(&self.store, user)
    }

    pub fn balance(&self, user: UserId) -> Result<i64, StoreError> {
        ledger::balance(&self.store, user)
    }

    pub fn entries(&self, user: UserId) -> Result<Vec<LedgerEntry>, StoreError> {
        ledger::entries(&self.store, user)
    }

    /// Recompute the wallet from the log.
    pub fn sync_wallet(&self, user: UserId) -> Result<i64, StoreError> {
        ledger::sync_wallet(&self.store, user)
    }

    // ---- idempotency plumbing ----

    /// Lookup-or-execute for one action. Called inside the user's session
    /// lock, so a racing retry with the same key observes either the cached
    /// reply or the lock, never a second execution. Callers reject empty
    /// keys before reaching here.
    fn run_cached(
        &self,
        user: UserId,
        game: Game,
        action: ActionKind,
        key: &str,
        run: impl FnOnce() -> Result<ActionReply, StoreError>,
    ) -> Result<ActionReply, StoreError> {
        if let Some(mut reply) = self.cache.lookup(user, game, action, key) {
            reply.replayed = true;
            return Ok(reply);
        }
        let reply = run()?;
        // Cache final outcomes only: successes and the definitive money
        // failure. Validation errors stay uncached so a corrected retry under
        // the same key can succeed.
        if reply.ok || reply.error == Some(ErrorCode::InsufficientBalance) {
            self.cache.store(user, game, action, key, reply.clone());
        }
        Ok(reply)
    }

    // ---- blackjack ----

    fn blackjack_reply(
        &self,
        user: UserId,
        round: &BlackjackRound,
        code: ErrorCode,
    ) -> Result<ActionReply, StoreError> {
        let balance = ledger::balance(&self.store, user)?;
        Ok(ActionReply::failure(
            code,
            GameView::Blackjack(round.snapshot()),
            balance,
        ))
    }

    /// Credit the finished round's payout exactly once; returns the balance.
    fn settle_blackjack(
        &self,
        user: UserId,
        round: &mut BlackjackRound,
    ) -> Result<i64, StoreError> {
        if round.settled {
            return ledger::balance(&self.store, user);
        }
        let payout = round.payout();
        let result = settlement::credit_payout(
            &self.store,
            user,
            Game::Blackjack,
            &round.round_id,
            payout,
        )
        .map_err(|e| match e {
            SettlementError::Store(e) => e,
            SettlementError::InsufficientBalance => {
                StoreError::Unavailable("payout credit rejected".into())
            }
        })?;
        round.settled = true;
        if result.applied {
            self.hooks
                .record_game_result(user, Game::Blackjack, payout as i64 - round.bet as i64);
            self.hooks.award_xp(user, XP_PER_ROUND, "blackjack round");
        }
        Ok(result.balance)
    }

    pub fn blackjack_start(
        &self,
        user: UserId,
        bet: u64,
        key: &str,
    ) -> Result<ActionReply, StoreError> {
        if key.trim().is_empty() {
            return self
                .blackjack
                .with(user, |round| self.blackjack_reply(user, round, ErrorCode::MissingIdempotency));
        }
        self.blackjack.with(user, |round| {
            self.run_cached(user, Game::Blackjack, ActionKind::Start, key, || {
                if round.in_progress() {
                    return self.blackjack_reply(user, round, ErrorCode::RoundInProgress);
                }
                if bet < self.config.blackjack.min_bet {
                    return self.blackjack_reply(user, round, ErrorCode::InvalidBetMin);
                }
                if bet > self.config.blackjack.max_bet {
                    return self.blackjack_reply(user, round, ErrorCode::InvalidBetMax);
                }
                let round_id = self.rng().token_hex(10);
                match settlement::debit_stake(&self.store, user, Game::Blackjack, &round_id, bet) {
                    Ok(_) => {}
                    Err(SettlementError::InsufficientBalance) => {
                        return self.blackjack_reply(user, round, ErrorCode::InsufficientBalance);
                    }
                    Err(SettlementError::Store(e)) => return Err(e),
                }
                let dealt = {
                    let mut rng = self.rng();
                    round.deal(round_id, bet, &mut rng)
                };
                let balance = match dealt {
                    Ok(()) if round.phase == Phase::Finished => {
                        self.settle_blackjack(user, round)?
                    }
                    Ok(()) => ledger::balance(&self.store, user)?,
                    // Exhaustion mid-deal pushes; refund through the payout leg.
                    Err(_) => self.settle_blackjack(user, round)?,
                };
                Ok(ActionReply::success(
                    GameView::Blackjack(round.snapshot()),
                    balance,
                ))
            })
        })
    }

    pub fn blackjack_hit(&self, user: UserId, key: &str) -> Result<ActionReply, StoreError> {
        if key.trim().is_empty() {
            return self
                .blackjack
                .with(user, |round| self.blackjack_reply(user, round, ErrorCode::MissingIdempotency));
        }
        self.blackjack.with(user, |round| {
            self.run_cached(user, Game::Blackjack, ActionKind::Hit, key, || {
                match round.hit(&self.config.blackjack) {
                    Ok(()) => {}
                    Err(ErrorCode::DeckExhausted) => {
                        let balance = self.settle_blackjack(user, round)?;
                        return Ok(ActionReply::failure(
                            ErrorCode::DeckExhausted,
                            GameView::Blackjack(round.snapshot()),
                            balance,
                        ));
                    }
                    Err(code) => return self.blackjack_reply(user, round, code),
                }
                let balance = if round.phase == Phase::Finished {
                    self.settle_blackjack(user, round)?
                } else {
                    ledger::balance(&self.store, user)?
                };
                Ok(ActionReply::success(
                    GameView::Blackjack(round.snapshot()),
                    balance,
                ))
            })
        })
    }

    pub fn blackjack_stand(&self, user: UserId, key: &str) -> Result<ActionReply, StoreError> {
        if key.trim().is_empty() {
            return self
                .blackjack
                .with(user, |round| self.blackjack_reply(user, round, ErrorCode::MissingIdempotency));
        }
        self.blackjack.with(user, |round| {
            self.run_cached(user, Game::Blackjack, ActionKind::Stand, key, || {
                if let Err(code) = round.stand(&self.config.blackjack) {
                    return self.blackjack_reply(user, round, code);
                }
                let balance = self.settle_blackjack(user, round)?;
                Ok(ActionReply::success(
                    GameView::Blackjack(round.snapshot()),
                    balance,
                ))
            })
        })
    }

    pub fn blackjack_state(&self, user: UserId) -> BlackjackSnapshot {
        self.blackjack.with(user, |round| round.snapshot())
    }

    // ---- roulette ----

    fn roulette_reply(
        &self,
        user: UserId,
        round: &RouletteRound,
        code: ErrorCode,
    ) -> Result<ActionReply, StoreError> {
        let balance = ledger::balance(&self.store, user)?;
        Ok(ActionReply::failure(
            code,
            GameView::Roulette(round.snapshot()),
            balance,
        ))
    }

    /// A finished (or never-started) slot rolls into a fresh round.
    fn ensure_roulette_round(&self, round: &mut RouletteRound) {
        if matches!(round.phase, RoulettePhase::Idle | RoulettePhase::Finished) {
            let round_id = self.rng().token_hex(10);
            round.begin(round_id);
        }
    }

    pub fn roulette_start(&self, user: UserId, key: &str) -> Result<ActionReply, StoreError> {
        if key.trim().is_empty() {
            return self
                .roulette
                .with(user, |round| self.roulette_reply(user, round, ErrorCode::MissingIdempotency));
        }
        self.roulette.with(user, |round| {
            self.run_cached(user, Game::Roulette, ActionKind::Start, key, || {
                if round.in_progress() {
                    return self.roulette_reply(user, round, ErrorCode::RoundInProgress);
                }
                let round_id = self.rng().token_hex(10);
                round.begin(round_id);
                let balance = ledger::balance(&self.store, user)?;
                Ok(ActionReply::success(
                    GameView::Roulette(round.snapshot()),
                    balance,
                ))
            })
        })
    }

    pub fn roulette_place_bet(
        &self,
        user: UserId,
        kind: BetKind,
        selection: Vec<u8>,
        amount: u64,
        key: &str,
    ) -> Result<ActionReply, StoreError> {
        if key.trim().is_empty() {
            return self
                .roulette
                .with(user, |round| self.roulette_reply(user, round, ErrorCode::MissingIdempotency));
        }
        self.roulette.with(user, |round| {
            self.run_cached(user, Game::Roulette, ActionKind::PlaceBet, key, || {
                self.ensure_roulette_round(round);
                let bet_id = self.rng().token_hex(8);
                if let Err(code) =
                    round.place_bet(bet_id.clone(), kind, selection, amount, &self.config.roulette)
                {
                    return self.roulette_reply(user, round, code);
                }
                match settlement::debit_bet(
                    &self.store,
                    user,
                    Game::Roulette,
                    &round.round_id,
                    &bet_id,
                    amount,
                ) {
                    Ok(result) => Ok(ActionReply::success(
                        GameView::Roulette(round.snapshot()),
                        result.balance,
                    )),
                    Err(SettlementError::InsufficientBalance) => {
                        round.bets.pop();
                        self.roulette_reply(user, round, ErrorCode::InsufficientBalance)
                    }
                    Err(SettlementError::Store(e)) => {
                        round.bets.pop();
                        Err(e)
                    }
                }
            })
        })
    }

    pub fn roulette_undo(&self, user: UserId, key: &str) -> Result<ActionReply, StoreError> {
        if key.trim().is_empty() {
            return self
                .roulette
                .with(user, |round| self.roulette_reply(user, round, ErrorCode::MissingIdempotency));
        }
        self.roulette.with(user, |round| {
            self.run_cached(user, Game::Roulette, ActionKind::Undo, key, || {
                let bet = match round.undo() {
                    Ok(bet) => bet,
                    Err(code) => return self.roulette_reply(user, round, code),
                };
                let balance = match bet {
                    None => ledger::balance(&self.store, user)?,
                    Some(bet) => {
                        let refunds = vec![(bet.bet_id.clone(), bet.amount)];
                        match settlement::refund_bets(
                            &self.store,
                            user,
                            Game::Roulette,
                            &round.round_id,
                            SettleLeg::Undo,
                            &refunds,
                        ) {
                            Ok(result) => result.balance,
                            Err(SettlementError::Store(e)) => {
                                round.bets.push(bet);
                                return Err(e);
                            }
                            Err(SettlementError::InsufficientBalance) => {
                                round.bets.push(bet);
                                return self
                                    .roulette_reply(user, round, ErrorCode::SettlementFailed);
                            }
                        }
                    }
                };
                Ok(ActionReply::success(
                    GameView::Roulette(round.snapshot()),
                    balance,
                ))
            })
        })
    }

    pub fn roulette_clear(&self, user: UserId, key: &str) -> Result<ActionReply, StoreError> {
        if key.trim().is_empty() {
            return self
                .roulette
                .with(user, |round| self.roulette_reply(user, round, ErrorCode::MissingIdempotency));
        }
        self.roulette.with(user, |round| {
            self.run_cached(user, Game::Roulette, ActionKind::Clear, key, || {
                let bets = match round.clear() {
                    Ok(bets) => bets,
                    Err(code) => return self.roulette_reply(user, round, code),
                };
                let balance = if bets.is_empty() {
                    ledger::balance(&self.store, user)?
                } else {
                    let refunds: Vec<(String, u64)> =
                        bets.iter().map(|b| (b.bet_id.clone(), b.amount)).collect();
                    match settlement::refund_bets(
                        &self.store,
                        user,
                        Game::Roulette,
                        &round.round_id,
                        SettleLeg::Clear,
                        &refunds,
                    ) {
                        Ok(result) => result.balance,
                        Err(SettlementError::Store(e)) => {
                            round.bets = bets;
                            return Err(e);
                        }
                        Err(SettlementError::InsufficientBalance) => {
                            round.bets = bets;
                            return self.roulette_reply(user, round, ErrorCode::SettlementFailed);
                        }
                    }
                };
                Ok(ActionReply::success(
                    GameView::Roulette(round.snapshot()),
                    balance,
                ))
            })
        })
    }

    pub fn roulette_lock(&self, user: UserId, key: &str) -> Result<ActionReply, StoreError> {
        if key.trim().is_empty() {
            return self
                .roulette
                .with(user, |round| self.roulette_reply(user, round, ErrorCode::MissingIdempotency));
        }
        self.roulette.with(user, |round| {
            self.run_cached(user, Game::Roulette, ActionKind::Lock, key, || {
                if let Err(code) = round.lock() {
                    return self.roulette_reply(user, round, code);
                }
                let balance = ledger::balance(&self.store, user)?;
                Ok(ActionReply::success(
                    GameView::Roulette(round.snapshot()),
                    balance,
                ))
            })
        })
    }

    pub fn roulette_spin(&self, user: UserId, key: &str) -> Result<ActionReply, StoreError> {
        if key.trim().is_empty() {
            return self
                .roulette
                .with(user, |round| self.roulette_reply(user, round, ErrorCode::MissingIdempotency));
        }
        self.roulette.with(user, |round| {
            self.run_cached(user, Game::Roulette, ActionKind::Spin, key, || {
                let spun = {
                    let mut rng = self.rng();
                    round.spin(&mut rng, &self.config.roulette)
                };
                if let Err(code) = spun {
                    return self.roulette_reply(user, round, code);
                }
                let balance = ledger::balance(&self.store, user)?;
                Ok(ActionReply::success(
                    GameView::Roulette(round.snapshot()),
                    balance,
                ))
            })
        })
    }

    pub fn roulette_settle(&self, user: UserId, key: &str) -> Result<ActionReply, StoreError> {
        if key.trim().is_empty() {
            return self
                .roulette
                .with(user, |round| self.roulette_reply(user, round, ErrorCode::MissingIdempotency));
        }
        self.roulette.with(user, |round| {
            self.run_cached(user, Game::Roulette, ActionKind::Settle, key, || {
                let totals = match round.settle() {
                    Ok(totals) => totals,
                    Err(code) => return self.roulette_reply(user, round, code),
                };
                let result = settlement::credit_payout(
                    &self.store,
                    user,
                    Game::Roulette,
                    &round.round_id,
                    totals.total_payout,
                )
                .map_err(|e| match e {
                    SettlementError::Store(e) => e,
                    SettlementError::InsufficientBalance => {
                        StoreError::Unavailable("payout credit rejected".into())
                    }
                })?;
                if result.applied {
                    self.hooks
                        .record_game_result(user, Game::Roulette, totals.net_delta);
                    self.hooks.award_xp(user, XP_PER_ROUND, "roulette round");
                }
                Ok(ActionReply::success(
                    GameView::Roulette(round.snapshot()),
                    result.balance,
                ))
            })
        })
    }

    pub fn roulette_state(&self, user: UserId) -> RouletteSnapshot {
        self.roulette.with(user, |round| round.snapshot())
    }

    // ---- multiplier ----

    fn multiplier_view(slot: &MultiplierSlot) -> MultiplierStateView {
        MultiplierStateView {
            in_progress: slot.in_progress,
            current: slot.current.as_ref().map(|r| r.snapshot()),
        }
    }

    fn multiplier_reply(
        &self,
        user: UserId,
        slot: &MultiplierSlot,
        code: ErrorCode,
    ) -> Result<ActionReply, StoreError> {
        let balance = ledger::balance(&self.store, user)?;
        Ok(ActionReply::failure(
            code,
            GameView::Multiplier(Self::multiplier_view(slot)),
            balance,
        ))
    }

    pub fn multiplier_play(
        &self,
        user: UserId,
        bet: u64,
        key: &str,
    ) -> Result<ActionReply, StoreError> {
        if key.trim().is_empty() {
            return self.multiplier.with(user, |slot| {
                self.multiplier_reply(user, slot, ErrorCode::MissingIdempotency)
            });
        }
        self.multiplier.with(user, |slot| {
            self.run_cached(user, Game::Multiplier, ActionKind::Play, key, || {
                // A play that never cleared its marker blocks new plays.
                if slot.in_progress {
                    return self.multiplier_reply(user, slot, ErrorCode::RoundInProgress);
                }
                slot.in_progress = true;
                let reply = self.multiplier_play_locked(user, slot, bet);
                slot.in_progress = false;
                reply
            })
        })
    }

    fn multiplier_play_locked(
        &self,
        user: UserId,
        slot: &mut MultiplierSlot,
        bet: u64,
    ) -> Result<ActionReply, StoreError> {
        let round_id = self.rng().token_hex(10);
        let played = {
            let mut rng = self.rng();
            MultiplierRound::play(round_id, bet, &self.config.multiplier, &mut rng)
        };
        let mut round = match played {
            Ok(round) => round,
            Err(code) => return self.multiplier_reply(user, slot, code),
        };
        match settlement::settle_round(
            &self.store,
            user,
            Game::Multiplier,
            &round.round_id,
            bet,
            round.payout,
        ) {
            Ok(result) => {
                round.finish();
                if result.applied {
                    self.hooks.record_game_result(
                        user,
                        Game::Multiplier,
                        round.payout as i64 - bet as i64,
                    );
                    self.hooks.award_xp(user, XP_PER_ROUND, "multiplier round");
                }
                slot.record(round);
                Ok(ActionReply::success(
                    GameView::Multiplier(Self::multiplier_view(slot)),
                    result.balance,
                ))
            }
            Err(SettlementError::InsufficientBalance) => {
                round.fail(ErrorCode::InsufficientBalance);
                slot.record(round);
                self.multiplier_reply(user, slot, ErrorCode::InsufficientBalance)
            }
            Err(SettlementError::Store(e)) => Err(e),
        }
    }

    pub fn multiplier_state(&self, user: UserId) -> MultiplierStateView {
        self.multiplier.with(user, |slot| Self::multiplier_view(slot))
    }

    pub fn multiplier_history(&self, user: UserId) -> Vec<MultiplierRoundView> {
        self.multiplier.with(user, |slot| {
            slot.history.items().iter().map(|r| r.snapshot()).collect()
        })
    }

    // ---- loot cases ----

    fn case_reply(
        &self,
        user: UserId,
        opening: Option<CaseOpening>,
        code: ErrorCode,
    ) -> Result<ActionReply, StoreError> {
        let balance = ledger::balance(&self.store, user)?;
        Ok(ActionReply::failure(
            code,
            GameView::Cases(CaseStateView { opening }),
            balance,
        ))
    }

    pub fn open_case(
        &self,
        user: UserId,
        case_id: &str,
        key: &str,
    ) -> Result<ActionReply, StoreError> {
        if key.trim().is_empty() {
            return self.case_reply(user, None, ErrorCode::MissingIdempotency);
        }
        // Scope the key to the case so "same key, different case" is a new
        // action rather than a replay.
        let cache_key = format!("{}:{}", case_id.trim().to_ascii_lowercase(), key);
        self.cases.with(user, |slot| {
            self.run_cached(user, Game::Cases, ActionKind::Open, &cache_key, || {
                let round_id = self.rng().token_hex(10);
                let opened = {
                    let mut rng = self.rng();
                    cases::open_case(case_id, round_id, &mut rng)
                };
                let (case, opening) = match opened {
                    Ok(pair) => pair,
                    Err(code) => return self.case_reply(user, None, code),
                };
                match settlement::settle_round(
                    &self.store,
                    user,
                    Game::Cases,
                    &opening.round_id,
                    case.price,
                    opening.payout,
                ) {
                    Ok(result) => {
                        if result.applied {
                            self.hooks.record_game_result(
                                user,
                                Game::Cases,
                                opening.payout as i64 - case.price as i64,
                            );
                            self.hooks.award_xp(user, XP_PER_ROUND, "case opening");
                        }
                        slot.record(opening.clone());
                        Ok(ActionReply::success(
                            GameView::Cases(CaseStateView {
                                opening: Some(opening),
                            }),
                            result.balance,
                        ))
                    }
                    Err(SettlementError::InsufficientBalance) => {
                        self.case_reply(user, None, ErrorCode::InsufficientBalance)
                    }
                    Err(SettlementError::Store(e)) => Err(e),
                }
            })
        })
    }

    pub fn case_history(&self, user: UserId, case_id: &str) -> Vec<CaseOpening> {
        self.cases.with(user, |slot| slot.history(case_id))
    }

    pub fn case_top_wins(&self, user: UserId, case_id: &str, limit: usize) -> Vec<CaseOpening> {
        self.cases.with(user, |slot| slot.top_wins(case_id, limit))
    }

    // ---- daily rewards ----

    fn today(&self) -> u64 {
        (self.clock)() / SECONDS_PER_DAY
    }

    pub fn reward_state(&self, user: UserId) -> RewardStateView {
        self.rewards.state(user, self.today())
    }

    /// Claim today's reward. The ledger reference is the durable guard; the
    /// in-memory schedule is only marked once the credit has committed.
    pub fn claim_daily_reward(&self, user: UserId) -> Result<ClaimReply, StoreError> {
        let today = self.today();
        let claim = match self.rewards.claimable(user, today) {
            Ok(claim) => claim,
            Err(code) => {
                return Ok(ClaimReply {
                    ok: false,
                    error: Some(code),
                    claimed_amount: 0,
                    balance: ledger::balance(&self.store, user)?,
                    state: self.rewards.state(user, today),
                });
            }
        };
        let applied = ledger::add_funds(
            &self.store,
            user,
            claim.amount,
            TxKind::DailyReward,
            "daily reward claim",
            Some(&claim.reference),
        )
        .map_err(|e| match e {
            LedgerError::Store(e) => e,
            // Amounts are always in range by construction.
            LedgerError::NonPositiveAmount | LedgerError::InsufficientBalance => {
                StoreError::Unavailable("reward credit rejected".into())
            }
        })?;
        if !applied.inserted() {
            return Ok(ClaimReply {
                ok: false,
                error: Some(ErrorCode::InvalidState),
                claimed_amount: 0,
                balance: ledger::balance(&self.store, user)?,
                state: self.rewards.state(user, today),
            });
        }
        self.rewards.mark_claimed(user, today, claim.streak);
        info!(user, amount = claim.amount, day = claim.day_index, "daily reward claimed");
        Ok(ClaimReply {
            ok: true,
            error: None,
            claimed_amount: claim.amount,
            balance: ledger::balance(&self.store, user)?,
            state: self.rewards.state(user, today),
        })
    }
}
