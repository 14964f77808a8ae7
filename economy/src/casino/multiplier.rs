//! Weighted-multiplier game.
//!
//! One action per round: the player stakes a bet, five multipliers are drawn
//! from a heavily house-favoring weight table, their sum times the bet is the
//! payout, and the round settles in a single atomic transaction.
//!
//! All arithmetic is integral. Multipliers are carried in tenths (`0.1` is
//! `1`, `50` is `500`) and the fractional odds are pre-scaled by `10^7`, so
//! both the weighted draw and the payout are exact.

use serde::Serialize;

use abyss_types::{ErrorCode, MAX_BET, MIN_BET, MULTIPLIER_PICK_COUNT};

use crate::rng::GameRng;

/// Odds table: (multiplier in tenths, weight scaled by 10^7).
///
/// The smallest configured weight (0.0000001 for the 50x entry) maps to 1.
pub const MULTIPLIER_WEIGHTS: [(u16, u64); 21] = [
    (1, 950_000_000),
    (2, 850_000_000),
    (3, 400_000_000),
    (4, 300_000_000),
    (5, 200_000_000),
    (10, 100_000_000),
    (15, 50_000_000),
    (20, 10_000_000),
    (23, 5_000_000),
    (25, 3_000_000),
    (30, 1_000_000),
    (35, 500_000),
    (40, 100_000),
    (50, 50_000),
    (60, 10_000),
    (70, 5_000),
    (80, 1_000),
    (90, 500),
    (100, 100),
    (300, 50),
    (500, 1),
];

/// Render a tenths-scaled multiplier the way the odds table names it:
/// `1 -> "0.1"`, `10 -> "1"`, `23 -> "2.3"`.
pub fn fmt_tenths(tenths: u32) -> String {
    if tenths % 10 == 0 {
        (tenths / 10).to_string()
    } else {
        format!("{}.{}", tenths / 10, tenths % 10)
    }
}

/// Payout for a bet at a tenths-scaled total multiplier, rounded half-up to
/// a whole gold unit.
pub fn payout_for(bet: u64, total_tenths: u64) -> u64 {
    (bet * total_tenths + 5) / 10
}

/// Draw one multiplier (in tenths) from the odds table.
pub fn draw_multiplier(rng: &mut GameRng) -> u16 {
    let weights: Vec<u64> = MULTIPLIER_WEIGHTS.iter().map(|&(_, w)| w).collect();
    MULTIPLIER_WEIGHTS[rng.weighted_index(&weights)].0
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Revealed,
    Finished,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultiplierConfig {
    pub min_bet: u64,
    pub max_bet: u64,
    pub pick_count: usize,
}

impl Default for MultiplierConfig {
    fn default() -> Self {
        Self {
            min_bet: MIN_BET,
            max_bet: MAX_BET,
            pick_count: MULTIPLIER_PICK_COUNT,
        }
    }
}

/// One completed (or failed) round.
#[derive(Clone, Debug)]
pub struct MultiplierRound {
    pub round_id: String,
    pub bet: u64,
    /// Drawn multipliers, in tenths.
    pub picks: Vec<u16>,
    /// Sum of picks, in tenths.
    pub total_tenths: u32,
    pub payout: u64,
    pub status: Status,
    pub error: Option<ErrorCode>,
}

impl MultiplierRound {
    /// Validate the bet, then draw picks and compute the payout. The caller
    /// settles both money legs and marks the round finished or failed.
    pub fn play(
        round_id: String,
        bet: u64,
        config: &MultiplierConfig,
        rng: &mut GameRng,
    ) -> Result<Self, ErrorCode> {
        if bet < config.min_bet {
            return Err(ErrorCode::InvalidBetMin);
        }
        if bet > config.max_bet {
            return Err(ErrorCode::InvalidBetMax);
        }
        let picks: Vec<u16> = (0..config.pick_count).map(|_| draw_multiplier(rng)).collect();
        let total_tenths: u32 = picks.iter().map(|&p| p as u32).sum();
        let payout = payout_for(bet, total_tenths as u64);
        Ok(Self {
            round_id,
            bet,
            picks,
            total_tenths,
            payout,
            status: Status::Revealed,
            error: None,
        })
    }

    pub fn finish(&mut self) {
        self.status = Status::Finished;
    }

    pub fn fail(&mut self, error: ErrorCode) {
        self.status = Status::Failed;
        self.error = Some(error);
    }

    pub fn snapshot(&self) -> MultiplierRoundView {
        MultiplierRoundView {
            round_id: self.round_id.clone(),
            bet: self.bet,
            picks: self.picks.iter().map(|&p| fmt_tenths(p as u32)).collect(),
            total_multiplier: fmt_tenths(self.total_tenths),
            payout: self.payout,
            status: self.status,
            error: self.error.map(|e| e.as_str()),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct MultiplierRoundView {
    pub round_id: String,
    pub bet: u64,
    pub picks: Vec<String>,
    pub total_multiplier: String,
    pub payout: u64,
    pub status: Status,
    pub error: Option<&'static str>,
}

/// Per-user play state: the latest round plus a bounded display history.
#[derive(Clone, Debug)]
pub struct MultiplierSlot {
    /// Set for the duration of a play; a second play is rejected while set.
    pub in_progress: bool,
    pub current: Option<MultiplierRound>,
    pub(crate) history: super::history::RingHistory<MultiplierRound>,
}

impl Default for MultiplierSlot {
    fn default() -> Self {
        Self {
            in_progress: false,
            current: None,
            history: super::history::RingHistory::new(
                abyss_types::MULTIPLIER_HISTORY_LIMIT,
            ),
        }
    }
}

impl MultiplierSlot {
    /// Record a completed round as the current one and prepend it to history.
    pub fn record(&mut self, round: MultiplierRound) {
        self.history.push(round.clone());
        self.current = Some(round);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenths_formatting_matches_the_odds_table() {
        assert_eq!(fmt_tenths(1), "0.1");
        assert_eq!(fmt_tenths(5), "0.5");
        assert_eq!(fmt_tenths(10), "1");
        assert_eq!(fmt_tenths(15), "1.5");
        assert_eq!(fmt_tenths(23), "2.3");
        assert_eq!(fmt_tenths(300), "30");
        assert_eq!(fmt_tenths(500), "50");
    }

    #[test]
    fn payout_rounds_half_up() {
        // 100 * 2.5 = 250 exactly.
        assert_eq!(payout_for(100, 25), 250);
        // 15 * 0.1 = 1.5 rounds up to 2.
        assert_eq!(payout_for(15, 1), 2);
        // 11 * 0.4 = 4.4 rounds down to 4.
        assert_eq!(payout_for(11, 4), 4);
        assert_eq!(payout_for(10_000, 500), 500_000);
        assert_eq!(payout_for(100, 0), 0);
    }

    #[test]
    fn play_draws_the_configured_pick_count() {
        let mut rng = GameRng::from_seed(5);
        let round =
            MultiplierRound::play("r1".into(), 100, &MultiplierConfig::default(), &mut rng)
                .unwrap();
        assert_eq!(round.picks.len(), 5);
        assert_eq!(
            round.total_tenths,
            round.picks.iter().map(|&p| p as u32).sum::<u32>()
        );
        assert_eq!(round.payout, payout_for(100, round.total_tenths as u64));
        assert_eq!(round.status, Status::Revealed);
        // Every pick comes from the table.
        for pick in &round.picks {
            assert!(MULTIPLIER_WEIGHTS.iter().any(|&(m, _)| m == *pick));
        }
    }

    #[test]
    fn play_enforces_bet_bounds() {
        let mut rng = GameRng::from_seed(5);
        let config = MultiplierConfig::default();
        assert_eq!(
            MultiplierRound::play("r1".into(), 9, &config, &mut rng).unwrap_err(),
            ErrorCode::InvalidBetMin
        );
        assert_eq!(
            MultiplierRound::play("r1".into(), 10_001, &config, &mut rng).unwrap_err(),
            ErrorCode::InvalidBetMax
        );
    }

    #[test]
    fn low_multipliers_dominate_the_draw() {
        let mut rng = GameRng::from_seed(11);
        let draws = 100_000;
        let below_one = (0..draws)
            .filter(|_| draw_multiplier(&mut rng) < 10)
            .count();
        // Entries under 1x carry ~92% of the total weight.
        assert!(below_one as f64 / draws as f64 > 0.85);
    }

    #[test]
    fn slot_history_is_bounded_and_newest_first() {
        let mut rng = GameRng::from_seed(2);
        let mut slot = MultiplierSlot::default();
        for i in 0..12 {
            let round = MultiplierRound::play(
                format!("r{i}"),
                100,
                &MultiplierConfig::default(),
                &mut rng,
            )
            .unwrap();
            slot.record(round);
        }
        let history = slot.history.items();
        assert_eq!(history.len(), abyss_types::MULTIPLIER_HISTORY_LIMIT);
        assert_eq!(history[0].round_id, "r11");
        assert_eq!(slot.current.as_ref().unwrap().round_id, "r11");
    }
}
