//! Roulette-style wheel game.
//!
//! Multi-bet rounds: the player places any number of bets while the round is
//! open, locks, spins, and settles. Each placed bet is debited immediately
//! through its own ledger leg; undo and clear refund through matching legs.
//!
//! Pockets are `0..=36`, with [`DOUBLE_ZERO`] standing in for the American
//! `00`. The European wheel is the default variant.

use serde::Serialize;

use abyss_types::{ErrorCode, MAX_BET, MAX_TOTAL_BET_PER_ROUND, MIN_BET};

use crate::rng::GameRng;

/// Sentinel pocket for the American `00`.
pub const DOUBLE_ZERO: u8 = 37;

const EU_WHEEL: [u8; 37] = [
    0, 32, 15, 19, 4, 21, 2, 25, 17, 34, 6, 27, 13, 36, 11, 30, 8, 23, 10, 5, 24, 16, 33, 1, 20,
    14, 31, 9, 22, 18, 29, 7, 28, 12, 35, 3, 26,
];
const US_WHEEL: [u8; 38] = [
    0,
    28,
    9,
    26,
    30,
    11,
    7,
    20,
    32,
    17,
    5,
    22,
    34,
    15,
    3,
    24,
    36,
    13,
    1,
    DOUBLE_ZERO,
    27,
    10,
    25,
    29,
    12,
    8,
    19,
    31,
    18,
    6,
    21,
    33,
    16,
    4,
    23,
    35,
    14,
    2,
];

const RED_NUMBERS: [u8; 18] = [1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    European,
    American,
}

impl Variant {
    pub fn wheel(&self) -> &'static [u8] {
        match self {
            Variant::European => &EU_WHEEL,
            Variant::American => &US_WHEEL,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Green,
    Red,
    Black,
}

impl Color {
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Green => "green",
            Color::Red => "red",
            Color::Black => "black",
        }
    }
}

pub fn color_of(pocket: u8) -> Color {
    if pocket == 0 || pocket == DOUBLE_ZERO {
        Color::Green
    } else if RED_NUMBERS.contains(&pocket) {
        Color::Red
    } else {
        Color::Black
    }
}

/// Display label; `DOUBLE_ZERO` renders as `"00"`.
pub fn pocket_label(pocket: u8) -> String {
    if pocket == DOUBLE_ZERO {
        "00".to_string()
    } else {
        pocket.to_string()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BetKind {
    Straight,
    Split,
    Street,
    Corner,
    SixLine,
    Red,
    Black,
    Odd,
    Even,
    Low,
    High,
    Dozen1,
    Dozen2,
    Dozen3,
    Col1,
    Col2,
    Col3,
}

impl BetKind {
    /// Winnings ratio; a winning bet pays `amount * (ratio + 1)` gross.
    pub fn payout_ratio(&self) -> u64 {
        match self {
            BetKind::Straight => 35,
            BetKind::Split => 17,
            BetKind::Street => 11,
            BetKind::Corner => 8,
            BetKind::SixLine => 5,
            BetKind::Red
            | BetKind::Black
            | BetKind::Odd
            | BetKind::Even
            | BetKind::Low
            | BetKind::High => 1,
            BetKind::Dozen1
            | BetKind::Dozen2
            | BetKind::Dozen3
            | BetKind::Col1
            | BetKind::Col2
            | BetKind::Col3 => 2,
        }
    }

    /// True for bets whose coverage is fixed by the kind alone.
    fn is_outside(&self) -> bool {
        !matches!(
            self,
            BetKind::Straight | BetKind::Split | BetKind::Street | BetKind::Corner | BetKind::SixLine
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BetKind::Straight => "straight",
            BetKind::Split => "split",
            BetKind::Street => "street",
            BetKind::Corner => "corner",
            BetKind::SixLine => "sixline",
            BetKind::Red => "red",
            BetKind::Black => "black",
            BetKind::Odd => "odd",
            BetKind::Even => "even",
            BetKind::Low => "low",
            BetKind::High => "high",
            BetKind::Dozen1 => "dozen1",
            BetKind::Dozen2 => "dozen2",
            BetKind::Dozen3 => "dozen3",
            BetKind::Col1 => "col1",
            BetKind::Col2 => "col2",
            BetKind::Col3 => "col3",
        }
    }
}

fn zeros_excluded(selection: &[u8]) -> bool {
    selection.iter().all(|&p| p >= 1 && p <= 36)
}

fn is_valid_straight(selection: &[u8], variant: Variant) -> bool {
    selection.len() == 1 && variant.wheel().contains(&selection[0])
}

/// Two adjacent layout numbers: vertically (|a-b| == 3) or horizontally
/// (|a-b| == 1 with the lower not ending a row).
fn is_valid_split(selection: &[u8]) -> bool {
    if selection.len() != 2 || !zeros_excluded(selection) {
        return false;
    }
    let (a, b) = (selection[0] as i16, selection[1] as i16);
    let diff = (a - b).abs();
    if diff == 3 {
        return true;
    }
    diff == 1 && a.min(b) % 3 != 0
}

fn sorted_inside(selection: &[u8]) -> Option<Vec<u8>> {
    if !zeros_excluded(selection) {
        return None;
    }
    let mut vals = selection.to_vec();
    vals.sort_unstable();
    Some(vals)
}

/// Three consecutive numbers starting a layout row (1-2-3, 4-5-6, ...).
fn is_valid_street(selection: &[u8]) -> bool {
    let Some(vals) = sorted_inside(selection) else {
        return false;
    };
    vals.len() == 3 && vals[0] % 3 == 1 && vals[1] == vals[0] + 1 && vals[2] == vals[0] + 2
}

/// Four numbers meeting at a layout corner: n, n+1, n+3, n+4 with n not
/// ending a row.
fn is_valid_corner(selection: &[u8]) -> bool {
    let Some(vals) = sorted_inside(selection) else {
        return false;
    };
    vals.len() == 4
        && matches!(vals[0] % 3, 1 | 2)
        && vals == [vals[0], vals[0] + 1, vals[0] + 3, vals[0] + 4]
}

/// Two adjacent streets: six consecutive numbers from a row start.
fn is_valid_sixline(selection: &[u8]) -> bool {
    let Some(vals) = sorted_inside(selection) else {
        return false;
    };
    vals.len() == 6
        && vals[0] % 3 == 1
        && (1..6).all(|i| vals[i] == vals[0] + i as u8)
}

/// Validate a single bet's amount and selection geometry.
pub fn validate_placement(
    kind: BetKind,
    selection: &[u8],
    amount: u64,
    variant: Variant,
    min_bet: u64,
    max_bet: u64,
) -> Result<(), ErrorCode> {
    if amount < min_bet {
        return Err(ErrorCode::InvalidBetMin);
    }
    if amount > max_bet {
        return Err(ErrorCode::InvalidBetMax);
    }
    let valid = match kind {
        BetKind::Straight => is_valid_straight(selection, variant),
        BetKind::Split => is_valid_split(selection),
        BetKind::Street => is_valid_street(selection),
        BetKind::Corner => is_valid_corner(selection),
        BetKind::SixLine => is_valid_sixline(selection),
        _ => true,
    };
    if valid {
        Ok(())
    } else {
        Err(ErrorCode::InvalidSelection)
    }
}

/// Key identifying a spot on the layout, used to aggregate the per-spot cap.
pub fn selection_key(kind: BetKind, selection: &[u8]) -> String {
    if kind.is_outside() {
        return kind.as_str().to_string();
    }
    let mut vals = selection.to_vec();
    vals.sort_unstable();
    let joined: Vec<String> = vals.iter().map(|&p| pocket_label(p)).collect();
    format!("{}:{}", kind.as_str(), joined.join(","))
}

pub fn bet_wins(kind: BetKind, selection: &[u8], pocket: u8) -> bool {
    if !kind.is_outside() {
        return selection.contains(&pocket);
    }
    if pocket == 0 || pocket == DOUBLE_ZERO {
        return false;
    }
    let n = pocket;
    match kind {
        BetKind::Red => color_of(pocket) == Color::Red,
        BetKind::Black => color_of(pocket) == Color::Black,
        BetKind::Odd => n % 2 == 1,
        BetKind::Even => n % 2 == 0,
        BetKind::Low => (1..=18).contains(&n),
        BetKind::High => (19..=36).contains(&n),
        BetKind::Dozen1 => (1..=12).contains(&n),
        BetKind::Dozen2 => (13..=24).contains(&n),
        BetKind::Dozen3 => (25..=36).contains(&n),
        BetKind::Col1 => n % 3 == 1,
        BetKind::Col2 => n % 3 == 2,
        BetKind::Col3 => n % 3 == 0,
        _ => false,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouletteConfig {
    pub variant: Variant,
    pub min_bet: u64,
    pub max_bet: u64,
    pub max_total_bet: u64,
}

impl Default for RouletteConfig {
    fn default() -> Self {
        Self {
            variant: Variant::European,
            min_bet: MIN_BET,
            max_bet: MAX_BET,
            max_total_bet: MAX_TOTAL_BET_PER_ROUND,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PlacedBet {
    pub bet_id: String,
    pub kind: BetKind,
    pub selection: Vec<u8>,
    pub amount: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    BettingOpen,
    BettingLocked,
    ResultRevealed,
    Finished,
}

/// Totals produced by [`RouletteRound::settle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RouletteSettlement {
    pub total_stake: u64,
    pub total_payout: u64,
    pub net_delta: i64,
    /// True when this round had already been marked settled; the figures are
    /// still the round's real totals, recomputed deterministically.
    pub already_settled: bool,
}

#[derive(Clone, Debug)]
pub struct RouletteRound {
    pub round_id: String,
    pub phase: Phase,
    pub bets: Vec<PlacedBet>,
    pub result_pocket: Option<u8>,
    pub settled: bool,
    pub settlement: Option<RouletteSettlement>,
}

impl Default for RouletteRound {
    fn default() -> Self {
        Self {
            round_id: String::new(),
            phase: Phase::Idle,
            bets: Vec::new(),
            result_pocket: None,
            settled: false,
            settlement: None,
        }
    }
}

impl RouletteRound {
    pub fn in_progress(&self) -> bool {
        matches!(
            self.phase,
            Phase::BettingOpen | Phase::BettingLocked | Phase::ResultRevealed
        ) && !(self.phase == Phase::BettingOpen && self.bets.is_empty())
    }

    /// Open a fresh round, discarding any finished one.
    pub fn begin(&mut self, round_id: String) {
        *self = Self {
            round_id,
            phase: Phase::BettingOpen,
            bets: Vec::new(),
            result_pocket: None,
            settled: false,
            settlement: None,
        };
    }

    pub fn total_bet(&self) -> u64 {
        self.bets.iter().map(|b| b.amount).sum()
    }

    /// Record a validated bet. The caller debits the stake through the ledger
    /// only after this succeeds.
    pub fn place_bet(
        &mut self,
        bet_id: String,
        kind: BetKind,
        selection: Vec<u8>,
        amount: u64,
        config: &RouletteConfig,
    ) -> Result<(), ErrorCode> {
        if self.phase != Phase::BettingOpen {
            return Err(ErrorCode::InvalidState);
        }
        validate_placement(
            kind,
            &selection,
            amount,
            config.variant,
            config.min_bet,
            config.max_bet,
        )?;
        if self.total_bet() + amount > config.max_total_bet {
            return Err(ErrorCode::MaxTotalBet);
        }
        let key = selection_key(kind, &selection);
        let same_spot: u64 = self
            .bets
            .iter()
            .filter(|b| selection_key(b.kind, &b.selection) == key)
            .map(|b| b.amount)
            .sum();
        if same_spot + amount > config.max_bet {
            return Err(ErrorCode::InvalidBetMax);
        }
        self.bets.push(PlacedBet {
            bet_id,
            kind,
            selection,
            amount,
        });
        Ok(())
    }

    /// Remove the most recent bet; the caller refunds it.
    pub fn undo(&mut self) -> Result<Option<PlacedBet>, ErrorCode> {
        if self.phase != Phase::BettingOpen {
            return Err(ErrorCode::InvalidState);
        }
        Ok(self.bets.pop())
    }

    /// Remove every bet; the caller refunds them all.
    pub fn clear(&mut self) -> Result<Vec<PlacedBet>, ErrorCode> {
        if self.phase != Phase::BettingOpen {
            return Err(ErrorCode::InvalidState);
        }
        Ok(std::mem::take(&mut self.bets))
    }

    pub fn lock(&mut self) -> Result<(), ErrorCode> {
        match self.phase {
            Phase::BettingOpen | Phase::BettingLocked => {}
            _ => return Err(ErrorCode::InvalidState),
        }
        if self.bets.is_empty() {
            return Err(ErrorCode::NoBets);
        }
        self.phase = Phase::BettingLocked;
        Ok(())
    }

    pub fn spin(&mut self, rng: &mut GameRng, config: &RouletteConfig) -> Result<u8, ErrorCode> {
        if self.phase != Phase::BettingLocked {
            return Err(ErrorCode::InvalidState);
        }
        if self.bets.is_empty() {
            return Err(ErrorCode::NoBets);
        }
        let wheel = config.variant.wheel();
        let pocket = wheel[rng.pick_index(wheel.len())];
        self.result_pocket = Some(pocket);
        self.phase = Phase::ResultRevealed;
        Ok(pocket)
    }

    /// Compute totals and close the round. Totals are a pure function of the
    /// bets and the result pocket, so a repeated call reproduces them.
    pub fn settle(&mut self) -> Result<RouletteSettlement, ErrorCode> {
        if !matches!(self.phase, Phase::ResultRevealed | Phase::Finished) {
            return Err(ErrorCode::InvalidState);
        }
        let Some(pocket) = self.result_pocket else {
            return Err(ErrorCode::NoResult);
        };
        let already_settled = self.settled;
        let total_stake = self.total_bet();
        let total_payout: u64 = self
            .bets
            .iter()
            .filter(|b| bet_wins(b.kind, &b.selection, pocket))
            .map(|b| b.amount * (b.kind.payout_ratio() + 1))
            .sum();
        self.phase = Phase::Finished;
        self.settled = true;
        let settlement = RouletteSettlement {
            total_stake,
            total_payout,
            net_delta: total_payout as i64 - total_stake as i64,
            already_settled,
        };
        self.settlement = Some(settlement);
        Ok(settlement)
    }

    pub fn snapshot(&self) -> RouletteSnapshot {
        RouletteSnapshot {
            round_id: self.round_id.clone(),
            phase: self.phase,
            result_pocket: self.result_pocket.map(pocket_label),
            result_color: self.result_pocket.map(|p| color_of(p).as_str()),
            bets: self.bets.clone(),
            total_bet: self.total_bet(),
            settled: self.settled,
            settlement: self.settlement,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RouletteSnapshot {
    pub round_id: String,
    pub phase: Phase,
    pub result_pocket: Option<String>,
    pub result_color: Option<&'static str>,
    pub bets: Vec<PlacedBet>,
    pub total_bet: u64,
    pub settled: bool,
    pub settlement: Option<RouletteSettlement>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_round() -> RouletteRound {
        let mut round = RouletteRound::default();
        round.begin("r1".to_string());
        round
    }

    fn config() -> RouletteConfig {
        RouletteConfig::default()
    }

    #[test]
    fn wheels_have_expected_pockets() {
        assert_eq!(EU_WHEEL.len(), 37);
        assert_eq!(US_WHEEL.len(), 38);
        assert!(US_WHEEL.contains(&DOUBLE_ZERO));
        assert!(!EU_WHEEL.contains(&DOUBLE_ZERO));
    }

    #[test]
    fn colors_match_the_layout() {
        assert_eq!(color_of(0), Color::Green);
        assert_eq!(color_of(DOUBLE_ZERO), Color::Green);
        assert_eq!(color_of(1), Color::Red);
        assert_eq!(color_of(2), Color::Black);
        assert_eq!(color_of(36), Color::Red);
    }

    #[test]
    fn split_geometry() {
        assert!(is_valid_split(&[1, 2]));
        assert!(is_valid_split(&[1, 4]));
        assert!(is_valid_split(&[35, 36]));
        // 3 ends its row; 3-4 are not adjacent on the layout.
        assert!(!is_valid_split(&[3, 4]));
        assert!(!is_valid_split(&[0, 1]));
        assert!(!is_valid_split(&[1, 5]));
    }

    #[test]
    fn street_corner_sixline_geometry() {
        assert!(is_valid_street(&[1, 2, 3]));
        assert!(is_valid_street(&[6, 4, 5]));
        assert!(!is_valid_street(&[2, 3, 4]));

        assert!(is_valid_corner(&[1, 2, 4, 5]));
        assert!(is_valid_corner(&[2, 3, 5, 6]));
        assert!(!is_valid_corner(&[3, 4, 6, 7]));

        assert!(is_valid_sixline(&[1, 2, 3, 4, 5, 6]));
        assert!(is_valid_sixline(&[4, 5, 6, 7, 8, 9]));
        assert!(!is_valid_sixline(&[2, 3, 4, 5, 6, 7]));
    }

    #[test]
    fn straight_respects_the_variant() {
        assert!(is_valid_straight(&[0], Variant::European));
        assert!(is_valid_straight(&[36], Variant::European));
        assert!(!is_valid_straight(&[DOUBLE_ZERO], Variant::European));
        assert!(is_valid_straight(&[DOUBLE_ZERO], Variant::American));
    }

    #[test]
    fn zero_loses_every_outside_bet() {
        for kind in [
            BetKind::Red,
            BetKind::Black,
            BetKind::Odd,
            BetKind::Even,
            BetKind::Low,
            BetKind::High,
            BetKind::Dozen1,
            BetKind::Col3,
        ] {
            assert!(!bet_wins(kind, &[], 0));
            assert!(!bet_wins(kind, &[], DOUBLE_ZERO));
        }
    }

    #[test]
    fn column_membership() {
        assert!(bet_wins(BetKind::Col1, &[], 1));
        assert!(bet_wins(BetKind::Col2, &[], 2));
        assert!(bet_wins(BetKind::Col3, &[], 3));
        assert!(bet_wins(BetKind::Col3, &[], 36));
    }

    #[test]
    fn same_spot_cap_aggregates_across_bets() {
        let mut round = open_round();
        round
            .place_bet("b1".into(), BetKind::Straight, vec![17], 6_000, &config())
            .unwrap();
        // A second 6k on the same pocket would take the spot past 10k.
        let err = round
            .place_bet("b2".into(), BetKind::Straight, vec![17], 6_000, &config())
            .unwrap_err();
        assert_eq!(err, ErrorCode::InvalidBetMax);
        // A different pocket is a different spot.
        round
            .place_bet("b3".into(), BetKind::Straight, vec![18], 6_000, &config())
            .unwrap();
    }

    #[test]
    fn round_total_is_capped() {
        let mut round = open_round();
        round
            .place_bet("b1".into(), BetKind::Red, vec![], 10_000, &config())
            .unwrap();
        round
            .place_bet("b2".into(), BetKind::Black, vec![], 10_000, &config())
            .unwrap();
        let err = round
            .place_bet("b3".into(), BetKind::Odd, vec![], 10, &config())
            .unwrap_err();
        assert_eq!(err, ErrorCode::MaxTotalBet);
    }

    #[test]
    fn straight_pays_35_to_1() {
        let mut round = open_round();
        round
            .place_bet("b1".into(), BetKind::Straight, vec![17], 100, &config())
            .unwrap();
        round.lock().unwrap();
        round.phase = Phase::ResultRevealed;
        round.result_pocket = Some(17);
        let settlement = round.settle().unwrap();
        assert_eq!(settlement.total_stake, 100);
        assert_eq!(settlement.total_payout, 3_600);
        assert_eq!(settlement.net_delta, 3_500);
        assert!(!settlement.already_settled);

        // Settling again reproduces the totals and flags the replay.
        let replay = round.settle().unwrap();
        assert_eq!(replay.total_payout, 3_600);
        assert!(replay.already_settled);
    }

    #[test]
    fn mixed_bets_settle_to_the_winning_subset() {
        let mut round = open_round();
        round
            .place_bet("b1".into(), BetKind::Red, vec![], 100, &config())
            .unwrap();
        round
            .place_bet("b2".into(), BetKind::Dozen1, vec![], 100, &config())
            .unwrap();
        round
            .place_bet("b3".into(), BetKind::Straight, vec![2], 100, &config())
            .unwrap();
        round.lock().unwrap();
        round.phase = Phase::ResultRevealed;
        round.result_pocket = Some(12); // red, first dozen, not pocket 2
        let settlement = round.settle().unwrap();
        assert_eq!(settlement.total_stake, 300);
        assert_eq!(settlement.total_payout, 200 + 300);
        assert_eq!(settlement.net_delta, 200);
    }

    #[test]
    fn all_losing_bets_settle_to_zero_payout() {
        let mut round = open_round();
        round
            .place_bet("b1".into(), BetKind::Red, vec![], 100, &config())
            .unwrap();
        round
            .place_bet("b2".into(), BetKind::Straight, vec![17], 50, &config())
            .unwrap();
        round.lock().unwrap();
        round.phase = Phase::ResultRevealed;
        round.result_pocket = Some(0); // green; no bet can win
        let settlement = round.settle().unwrap();
        assert_eq!(settlement.total_stake, 150);
        assert_eq!(settlement.total_payout, 0);
        assert_eq!(settlement.net_delta, -(settlement.total_stake as i64));
        assert_eq!(round.phase, Phase::Finished);
    }

    #[test]
    fn undo_and_clear_return_the_removed_bets() {
        let mut round = open_round();
        round
            .place_bet("b1".into(), BetKind::Red, vec![], 100, &config())
            .unwrap();
        round
            .place_bet("b2".into(), BetKind::Black, vec![], 50, &config())
            .unwrap();
        let undone = round.undo().unwrap().unwrap();
        assert_eq!(undone.bet_id, "b2");
        let cleared = round.clear().unwrap();
        assert_eq!(cleared.len(), 1);
        assert!(round.bets.is_empty());
        assert!(round.undo().unwrap().is_none());
    }

    #[test]
    fn lock_and_spin_enforce_phase_and_bets() {
        let mut round = open_round();
        assert_eq!(round.lock().unwrap_err(), ErrorCode::NoBets);
        round
            .place_bet("b1".into(), BetKind::Red, vec![], 100, &config())
            .unwrap();

        let mut rng = GameRng::from_seed(9);
        assert_eq!(
            round.spin(&mut rng, &config()).unwrap_err(),
            ErrorCode::InvalidState
        );
        round.lock().unwrap();
        // Locking twice is harmless.
        round.lock().unwrap();
        let pocket = round.spin(&mut rng, &config()).unwrap();
        assert!(config().variant.wheel().contains(&pocket));
        assert_eq!(round.phase, Phase::ResultRevealed);

        // Betting is closed once locked.
        assert_eq!(
            round
                .place_bet("b2".into(), BetKind::Odd, vec![], 100, &config())
                .unwrap_err(),
            ErrorCode::InvalidState
        );
    }

    #[test]
    fn settle_without_result_is_rejected() {
        let mut round = open_round();
        round
            .place_bet("b1".into(), BetKind::Red, vec![], 100, &config())
            .unwrap();
        assert_eq!(round.settle().unwrap_err(), ErrorCode::InvalidState);
    }
}
