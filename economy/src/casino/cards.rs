//! Shared playing-card helpers.
//!
//! Cards are encoded as `0..=51`, where:
//! - suit = card / 13 (0..=3)
//! - rank = card % 13 (0..=12, 0 is Ace)

/// Total cards in a standard deck.
pub(crate) const CARDS_PER_DECK: u8 = 52;

/// Ranks per suit.
pub(crate) const RANKS_PER_SUIT: u8 = 13;

const RANK_CODES: [&str; 13] = [
    "A", "2", "3", "4", "5", "6", "7", "8", "9", "10", "J", "Q", "K",
];
const SUIT_CODES: [char; 4] = ['H', 'D', 'C', 'S'];

/// Returns the 0-based rank (0..=12), where 0 is Ace.
pub(crate) fn card_rank(card: u8) -> u8 {
    card % RANKS_PER_SUIT
}

/// Returns the suit (0..=3).
pub(crate) fn card_suit(card: u8) -> u8 {
    card / RANKS_PER_SUIT
}

/// Display code such as `"AH"` or `"10S"`.
pub(crate) fn card_code(card: u8) -> String {
    format!(
        "{}{}",
        RANK_CODES[card_rank(card) as usize],
        SUIT_CODES[card_suit(card) as usize]
    )
}

/// A fresh, unshuffled 52-card deck.
pub(crate) fn fresh_deck() -> Vec<u8> {
    (0..CARDS_PER_DECK).collect()
}
