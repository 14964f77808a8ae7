//! Blackjack-style card game.
//!
//! One player hand against the dealer, single 52-card deck per round.
//! House rules: dealer stands on all 17s by default; with
//! `stand_on_soft_17` disabled the dealer draws again on soft 17.
//! Payouts: push refunds the stake (x1), a plain win pays x2, a natural pays
//! x2.5, a loss pays 0.
//!
//! The round is a pure state machine. The stake must already be debited
//! through the ledger before [`BlackjackRound::deal`] runs, and the payout is
//! credited exactly once by the caller, gated by the `settled` flag.

use serde::Serialize;

use abyss_types::{ErrorCode, MAX_BET, MIN_BET};

use super::cards::{card_code, fresh_deck};
use crate::rng::GameRng;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Dealing,
    PlayerTurn,
    DealerTurn,
    Finished,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundResult {
    Win,
    /// Two-card 21; pays x2.5.
    Natural,
    Lose,
    Push,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlackjackConfig {
    /// Dealer stands on soft 17 when true; hits it when false.
    pub stand_on_soft_17: bool,
    pub min_bet: u64,
    pub max_bet: u64,
}

impl Default for BlackjackConfig {
    fn default() -> Self {
        Self {
            stand_on_soft_17: true,
            min_bet: MIN_BET,
            max_bet: MAX_BET,
        }
    }
}

/// Calculate the value of a hand and whether it is soft.
///
/// Aces count 11 until the total would bust, then demote to 1 one at a time.
pub fn hand_value(cards: &[u8]) -> (u8, bool) {
    let mut value: u16 = 0;
    let mut aces: u8 = 0;

    for &card in cards {
        let rank = (card % 13) + 1; // 1=Ace, 2-10, 11=J, 12=Q, 13=K
        if rank == 1 {
            aces += 1;
            value += 11;
        } else if rank >= 10 {
            value += 10;
        } else {
            value += rank as u16;
        }
    }

    while value > 21 && aces > 0 {
        value -= 10;
        aces -= 1;
    }

    let is_soft = aces > 0 && value <= 21;
    (value.min(255) as u8, is_soft)
}

/// A natural: 21 from exactly two cards.
pub fn is_natural(cards: &[u8]) -> bool {
    cards.len() == 2 && hand_value(cards).0 == 21
}

/// One live round per user. Reset in place when a new round starts.
#[derive(Clone, Debug)]
pub struct BlackjackRound {
    pub round_id: String,
    pub bet: u64,
    pub phase: Phase,
    deck: Vec<u8>,
    pub player: Vec<u8>,
    pub dealer: Vec<u8>,
    pub hole_hidden: bool,
    pub result: Option<RoundResult>,
    pub message: &'static str,
    pub settled: bool,
    /// Replaces the shuffled deck on the next deal.
    #[cfg(test)]
    pub(crate) preset_deck: Option<Vec<u8>>,
}

impl Default for BlackjackRound {
    fn default() -> Self {
        Self {
            round_id: String::new(),
            bet: 0,
            phase: Phase::Idle,
            deck: Vec::new(),
            player: Vec::new(),
            dealer: Vec::new(),
            hole_hidden: true,
            result: None,
            message: "ready",
            settled: false,
            #[cfg(test)]
            preset_deck: None,
        }
    }
}

impl BlackjackRound {
    /// A round blocks a new `start` until it reaches `Finished`.
    pub fn in_progress(&self) -> bool {
        matches!(self.phase, Phase::Dealing | Phase::PlayerTurn | Phase::DealerTurn)
    }

    fn draw(&mut self) -> Option<u8> {
        self.deck.pop()
    }

    fn finish(&mut self, result: RoundResult, message: &'static str) {
        self.hole_hidden = false;
        self.phase = Phase::Finished;
        self.result = Some(result);
        self.message = message;
    }

    /// Shuffle a fresh deck and deal two cards each. The stake for
    /// `round_id` must already be on the ledger.
    pub fn deal(&mut self, round_id: String, bet: u64, rng: &mut GameRng) -> Result<(), ErrorCode> {
        let mut deck = fresh_deck();
        rng.shuffle(&mut deck);
        #[cfg(test)]
        if let Some(preset) = self.preset_deck.take() {
            deck = preset;
        }

        *self = Self {
            round_id,
            bet,
            phase: Phase::Dealing,
            deck,
            message: "dealing cards",
            ..Self::default()
        };

        for hand_is_player in [true, false, true, false] {
            // A 52-card deck cannot run out here, but the guard keeps draw
            // handling uniform with hit/stand.
            let Some(card) = self.draw() else {
                self.finish(RoundResult::Push, "deck exhausted");
                return Err(ErrorCode::DeckExhausted);
            };
            if hand_is_player {
                self.player.push(card);
            } else {
                self.dealer.push(card);
            }
        }

        let player_natural = is_natural(&self.player);
        let dealer_natural = is_natural(&self.dealer);
        if player_natural && dealer_natural {
            self.finish(RoundResult::Push, "both blackjack");
        } else if player_natural {
            self.finish(RoundResult::Natural, "player blackjack");
        } else if dealer_natural {
            self.finish(RoundResult::Lose, "dealer blackjack");
        } else {
            self.phase = Phase::PlayerTurn;
            self.message = "player turn";
        }
        Ok(())
    }

    /// Draw one card. Busts over 21; exactly 21 auto-stands.
    pub fn hit(&mut self, config: &BlackjackConfig) -> Result<(), ErrorCode> {
        if self.phase != Phase::PlayerTurn {
            return Err(ErrorCode::InvalidState);
        }
        let Some(card) = self.draw() else {
            self.finish(RoundResult::Push, "deck exhausted");
            return Err(ErrorCode::DeckExhausted);
        };
        self.player.push(card);
        let (total, _) = hand_value(&self.player);
        if total > 21 {
            self.finish(RoundResult::Lose, "player bust");
        } else if total == 21 {
            return self.stand(config);
        } else {
            self.message = "player turn";
        }
        Ok(())
    }

    /// Reveal the hole card and run the dealer policy, then compare totals.
    pub fn stand(&mut self, config: &BlackjackConfig) -> Result<(), ErrorCode> {
        if self.phase != Phase::PlayerTurn {
            return Err(ErrorCode::InvalidState);
        }
        self.phase = Phase::DealerTurn;
        self.hole_hidden = false;
        self.message = "dealer turn";

        loop {
            let (dealer_total, dealer_soft) = hand_value(&self.dealer);
            let must_draw = dealer_total < 17
                || (dealer_total == 17 && dealer_soft && !config.stand_on_soft_17);
            if !must_draw {
                break;
            }
            let Some(card) = self.draw() else {
                self.finish(RoundResult::Push, "deck exhausted");
                return Ok(());
            };
            self.dealer.push(card);
        }

        let (player_total, _) = hand_value(&self.player);
        let (dealer_total, _) = hand_value(&self.dealer);
        if dealer_total > 21 {
            self.finish(RoundResult::Win, "dealer bust");
        } else if player_total > dealer_total {
            self.finish(RoundResult::Win, "player wins");
        } else if player_total < dealer_total {
            self.finish(RoundResult::Lose, "dealer wins");
        } else {
            self.finish(RoundResult::Push, "push");
        }
        Ok(())
    }

    /// Gross payout for the round's result: push x1, win x2, natural x2.5,
    /// loss 0. Integer arithmetic; x2.5 is `bet * 5 / 2`.
    pub fn payout(&self) -> u64 {
        match self.result {
            Some(RoundResult::Push) => self.bet,
            Some(RoundResult::Win) => self.bet * 2,
            Some(RoundResult::Natural) => self.bet * 5 / 2,
            Some(RoundResult::Lose) | None => 0,
        }
    }

    pub fn snapshot(&self) -> BlackjackSnapshot {
        let (player_total, _) = hand_value(&self.player);
        let dealer_visible_total = if self.dealer.is_empty() {
            "?".to_string()
        } else if self.hole_hidden {
            let (up, _) = hand_value(&self.dealer[..1]);
            format!("{up} + ?")
        } else {
            hand_value(&self.dealer).0.to_string()
        };
        let dealer_hand = self
            .dealer
            .iter()
            .enumerate()
            .map(|(idx, &card)| {
                if idx == 1 && self.hole_hidden {
                    "??".to_string()
                } else {
                    card_code(card)
                }
            })
            .collect();
        BlackjackSnapshot {
            round_id: self.round_id.clone(),
            phase: self.phase,
            result: self.result,
            message: self.message.to_string(),
            bet: self.bet,
            deck_count: self.deck.len(),
            player_hand: self.player.iter().map(|&c| card_code(c)).collect(),
            dealer_hand,
            player_total,
            dealer_total: if self.hole_hidden {
                0
            } else {
                hand_value(&self.dealer).0
            },
            dealer_visible_total,
            settled: self.settled,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_deck(deck: Vec<u8>) -> Self {
        Self {
            preset_deck: Some(deck),
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub(crate) fn deal_from_deck(&mut self, round_id: &str, bet: u64) -> Result<(), ErrorCode> {
        self.deal(round_id.to_string(), bet, &mut GameRng::from_seed(0))
    }
}

/// Public view of a round. The dealer's hole card renders as `"??"` until
/// revealed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BlackjackSnapshot {
    pub round_id: String,
    pub phase: Phase,
    pub result: Option<RoundResult>,
    pub message: String,
    pub bet: u64,
    pub deck_count: usize,
    pub player_hand: Vec<String>,
    pub dealer_hand: Vec<String>,
    pub player_total: u8,
    /// Zero while the hole card is hidden.
    pub dealer_total: u8,
    pub dealer_visible_total: String,
    pub settled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    // Card helpers: suit H, so card == rank index. Ace=0, 9=8, 10=9, K=12.
    const ACE: u8 = 0;
    const NINE: u8 = 8;
    const TEN: u8 = 9;
    const KING: u8 = 12;
    const SIX: u8 = 5;
    const SEVEN: u8 = 6;
    const FIVE: u8 = 4;

    fn second_suit(rank: u8) -> u8 {
        rank + 13
    }

    #[test]
    fn ace_king_is_a_natural_21() {
        assert_eq!(hand_value(&[ACE, KING]), (21, true));
        assert!(is_natural(&[ACE, KING]));
    }

    #[test]
    fn double_ace_nine_reduces_to_21() {
        let hand = [ACE, second_suit(ACE), NINE];
        let (total, soft) = hand_value(&hand);
        assert_eq!(total, 21);
        assert!(soft);
        assert!(!is_natural(&hand));
    }

    #[test]
    fn hard_hands_are_not_soft() {
        assert_eq!(hand_value(&[TEN, SEVEN]), (17, false));
        assert_eq!(hand_value(&[ACE, SIX, KING]), (17, false));
    }

    // deal order: player, dealer, player, dealer, drawn from the deck's tail.
    fn deck_dealing(player: [u8; 2], dealer: [u8; 2], rest: &[u8]) -> Vec<u8> {
        let mut deck = rest.to_vec();
        deck.push(dealer[1]);
        deck.push(player[1]);
        deck.push(dealer[0]);
        deck.push(player[0]);
        deck
    }

    #[test]
    fn player_natural_finishes_immediately() {
        let mut round = BlackjackRound::with_deck(deck_dealing(
            [ACE, KING],
            [NINE, SEVEN],
            &[FIVE, SIX],
        ));
        round.deal_from_deck("r1", 100).unwrap();
        assert_eq!(round.phase, Phase::Finished);
        assert_eq!(round.result, Some(RoundResult::Natural));
        assert_eq!(round.payout(), 250);
        assert!(!round.hole_hidden);
    }

    #[test]
    fn both_naturals_push() {
        let mut round = BlackjackRound::with_deck(deck_dealing(
            [ACE, KING],
            [second_suit(ACE), second_suit(KING)],
            &[FIVE],
        ));
        round.deal_from_deck("r1", 100).unwrap();
        assert_eq!(round.result, Some(RoundResult::Push));
        assert_eq!(round.payout(), 100);
    }

    #[test]
    fn hit_busts_over_21() {
        let config = BlackjackConfig::default();
        // Player 10+7, dealer 9+7, next draw K busts the player.
        let mut round = BlackjackRound::with_deck(deck_dealing(
            [TEN, SEVEN],
            [NINE, SEVEN],
            &[FIVE, KING],
        ));
        round.deal_from_deck("r1", 50).unwrap();
        assert_eq!(round.phase, Phase::PlayerTurn);
        round.hit(&config).unwrap();
        assert_eq!(round.phase, Phase::Finished);
        assert_eq!(round.result, Some(RoundResult::Lose));
        assert_eq!(round.payout(), 0);
    }

    #[test]
    fn hit_to_21_auto_stands() {
        let config = BlackjackConfig::default();
        // Player 10+5 hits a 6 for 21; dealer 10+9 stands on 19.
        let mut round = BlackjackRound::with_deck(deck_dealing(
            [TEN, FIVE],
            [second_suit(TEN), NINE],
            &[SIX],
        ));
        round.deal_from_deck("r1", 100).unwrap();
        round.hit(&config).unwrap();
        assert_eq!(round.phase, Phase::Finished);
        assert_eq!(round.result, Some(RoundResult::Win));
        assert_eq!(round.payout(), 200);
    }

    #[test]
    fn dealer_draws_under_17_and_busts() {
        let config = BlackjackConfig::default();
        // Dealer 9+6 (15) must draw; K busts them.
        let mut round = BlackjackRound::with_deck(deck_dealing(
            [TEN, SEVEN],
            [NINE, SIX],
            &[FIVE, KING],
        ));
        round.deal_from_deck("r1", 100).unwrap();
        round.stand(&config).unwrap();
        assert_eq!(round.result, Some(RoundResult::Win));
        assert_eq!(round.message, "dealer bust");
    }

    #[test]
    fn dealer_hits_soft_17_when_configured() {
        // Dealer A+6 is soft 17. With stand_on_soft_17 = false they draw
        // again (a 10 makes hard 17); the player's 18 then wins.
        let hitting = BlackjackConfig {
            stand_on_soft_17: false,
            ..BlackjackConfig::default()
        };
        let mut round = BlackjackRound::with_deck(deck_dealing(
            [TEN, second_suit(NINE)], // 19
            [ACE, SIX],
            &[FIVE, TEN],
        ));
        round.deal_from_deck("r1", 100).unwrap();
        round.stand(&hitting).unwrap();
        assert_eq!(round.dealer.len(), 3, "dealer must draw on soft 17");

        // Same layout with the flag on: the dealer stands pat on soft 17.
        let standing = BlackjackConfig::default();
        let mut round = BlackjackRound::with_deck(deck_dealing(
            [TEN, second_suit(NINE)],
            [ACE, SIX],
            &[FIVE, TEN],
        ));
        round.deal_from_deck("r1", 100).unwrap();
        round.stand(&standing).unwrap();
        assert_eq!(round.dealer.len(), 2);
        assert_eq!(round.result, Some(RoundResult::Win)); // 19 beats 17
    }

    #[test]
    fn equal_totals_push() {
        let config = BlackjackConfig::default();
        let mut round = BlackjackRound::with_deck(deck_dealing(
            [TEN, NINE],
            [second_suit(TEN), second_suit(NINE)],
            &[FIVE],
        ));
        round.deal_from_deck("r1", 100).unwrap();
        round.stand(&config).unwrap();
        assert_eq!(round.result, Some(RoundResult::Push));
        assert_eq!(round.payout(), 100);
    }

    #[test]
    fn actions_outside_player_turn_are_rejected() {
        let config = BlackjackConfig::default();
        let mut round = BlackjackRound::default();
        assert_eq!(round.hit(&config), Err(ErrorCode::InvalidState));
        assert_eq!(round.stand(&config), Err(ErrorCode::InvalidState));
    }

    #[test]
    fn snapshot_hides_the_hole_card() {
        let mut round = BlackjackRound::with_deck(deck_dealing(
            [TEN, SEVEN],
            [NINE, SIX],
            &[FIVE, KING],
        ));
        round.deal_from_deck("r1", 100).unwrap();
        let snapshot = round.snapshot();
        assert_eq!(snapshot.dealer_hand[1], "??");
        assert_eq!(snapshot.dealer_total, 0);
        assert_eq!(snapshot.dealer_visible_total, "9 + ?");
        assert_eq!(snapshot.player_total, 17);
    }
}
