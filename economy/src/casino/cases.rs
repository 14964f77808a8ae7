//! Loot-case game.
//!
//! Opening a case debits its fixed price, draws one item from the case's
//! weighted table, and credits `price * multiplier` in one atomic settlement.
//! A 45-slot reel is generated for the client animation with the winning
//! item pinned at index 35; the reel is pure presentation and never touches
//! the money path.
//!
//! Weights are carried in hundredths (`0.05` is `5`) and item multipliers in
//! hundredths of the case price (`8.5x` is `850`), keeping draws and payouts
//! exact.

use std::collections::HashMap;

use serde::Serialize;

use abyss_types::{ErrorCode, CASE_HISTORY_LIMIT};

use super::history::RingHistory;
use crate::rng::GameRng;

/// Reel slots sent to the client.
pub const REEL_LENGTH: usize = 45;
/// Reel index holding the winning item.
pub const WINNER_INDEX: usize = 35;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Consumer,
    Industrial,
    MilSpec,
    Restricted,
    Classified,
    Covert,
    Contraband,
    RareSpecial,
}

impl Rarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Consumer => "Consumer Grade",
            Rarity::Industrial => "Industrial Grade",
            Rarity::MilSpec => "Mil-Spec Grade",
            Rarity::Restricted => "Restricted",
            Rarity::Classified => "Classified",
            Rarity::Covert => "Covert",
            Rarity::Contraband => "Contraband",
            Rarity::RareSpecial => "Rare Special Item",
        }
    }

    /// Display color, hex RGB.
    pub fn color(&self) -> &'static str {
        match self {
            Rarity::Consumer => "#b0c3d9",
            Rarity::Industrial => "#5e98d9",
            Rarity::MilSpec => "#4b69ff",
            Rarity::Restricted => "#8847ff",
            Rarity::Classified => "#d32ce6",
            Rarity::Covert => "#eb4b4b",
            Rarity::Contraband => "#e4ae39",
            Rarity::RareSpecial => "#ffd700",
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CaseItem {
    pub id: &'static str,
    pub name: &'static str,
    pub rarity: Rarity,
    /// Draw weight, scaled by 100.
    pub weight_centi: u64,
    /// Payout multiplier over the case price, in hundredths.
    pub multiplier_centi: u64,
}

#[derive(Clone, Copy, Debug)]
pub struct LootCase {
    pub id: &'static str,
    pub name: &'static str,
    pub price: u64,
    pub items: &'static [CaseItem],
}

macro_rules! item {
    ($id:literal, $name:literal, $rarity:ident, $weight:literal, $mult:literal) => {
        CaseItem {
            id: $id,
            name: $name,
            rarity: Rarity::$rarity,
            weight_centi: $weight,
            multiplier_centi: $mult,
        }
    };
}

const AFET_ITEMS: [CaseItem; 15] = [
    item!("nova_sand_dune", "Nova | Sand Dune", Consumer, 25_000, 10),
    item!("p250_boreal_forest", "P250 | Boreal Forest", Consumer, 20_000, 15),
    item!("ump45_urban_ddpat", "UMP-45 | Urban DDPAT", Consumer, 15_000, 20),
    item!("m249_contrast_spray", "M249 | Contrast Spray", Industrial, 12_000, 35),
    item!("g3sg1_desert_storm", "G3SG1 | Desert Storm", Industrial, 10_000, 45),
    item!("p90_module", "P90 | Module", MilSpec, 8_000, 80),
    item!("awp_atheris", "AWP | Atheris", Restricted, 3_500, 300),
    item!("glock18_water_elemental", "Glock-18 | Water Elemental", Classified, 1_200, 600),
    item!("usp_s_cortex", "USP-S | Cortex", Classified, 800, 850),
    item!("ak47_redline", "AK-47 | Redline", Classified, 600, 1_200),
    item!("m4a1_s_printstream", "M4A1-S | Printstream", Covert, 250, 3_000),
    item!("awp_dragon_lore", "AWP | Dragon Lore", Covert, 80, 8_000),
    item!("m4a4_howl", "M4A4 | Howl", Contraband, 40, 15_000),
    item!("karambit_doppler", "Karambit | Doppler", RareSpecial, 25, 20_000),
    item!("sport_gloves_pandoras_box", "Sport Gloves | Pandora's Box", RareSpecial, 5, 50_000),
];

const KRISTAL_ITEMS: [CaseItem; 18] = [
    item!("pp_bizon_forest_leaves", "PP-Bizon | Forest Leaves", Consumer, 30_000, 10),
    item!("five_seven_forest_night", "Five-SeveN | Forest Night", Consumer, 25_000, 20),
    item!("mac10_calf_skin", "MAC-10 | Calf Skin", Industrial, 20_000, 40),
    item!("sawed_off_origami", "Sawed-Off | Origami", MilSpec, 12_000, 80),
    item!("p2000_ivory", "P2000 | Ivory", MilSpec, 9_000, 110),
    item!("p250_visions", "P250 | Visions", Restricted, 4_000, 300),
    item!("mp9_food_chain", "MP9 | Food Chain", Classified, 1_500, 600),
    item!("famas_mecha_industries", "FAMAS | Mecha Industries", Classified, 1_000, 1_000),
    item!("mp7_bloodsport", "MP7 | Bloodsport", Covert, 250, 1_800),
    item!("five_seven_angry_mob", "Five-SeveN | Angry Mob", Covert, 200, 2_200),
    item!("galil_chatterbox", "Galil AR | Chatterbox", Covert, 150, 2_800),
    item!("mac10_neon_rider", "MAC-10 | Neon Rider", Covert, 120, 3_500),
    item!("usp_s_neo_noir", "USP-S | Neo-Noir", Covert, 100, 4_500),
    item!("deagle_printstream", "Desert Eagle | Printstream", Covert, 80, 6_000),
    item!("m4a1_s_hyper_beast", "M4A1-S | Hyper Beast", Covert, 50, 9_000),
    item!("ak47_neon_rider", "AK-47 | Neon Rider", Covert, 30, 15_000),
    item!("awp_fade", "AWP | Fade", Covert, 10, 30_000),
    item!("ak47_gold_arabesque", "AK-47 | Gold Arabesque", Covert, 2, 80_000),
];

pub const CASES: [LootCase; 2] = [
    LootCase {
        id: "afet",
        name: "Felaket Kasasi",
        price: 1_000,
        items: &AFET_ITEMS,
    },
    LootCase {
        id: "kristal",
        name: "Kristal Kasasi",
        price: 250,
        items: &KRISTAL_ITEMS,
    },
];

pub fn case_by_id(id: &str) -> Option<&'static LootCase> {
    let key = id.trim().to_ascii_lowercase();
    CASES.iter().find(|c| c.id == key)
}

/// Payout in gold for a winning item, rounded half-up.
pub fn payout_for(price: u64, multiplier_centi: u64) -> u64 {
    (price * multiplier_centi + 50) / 100
}

pub fn draw_item(case: &'static LootCase, rng: &mut GameRng) -> &'static CaseItem {
    let weights: Vec<u64> = case.items.iter().map(|i| i.weight_centi).collect();
    &case.items[rng.weighted_index(&weights)]
}

/// Animation reel: independent draws with the winner pinned at
/// [`WINNER_INDEX`].
pub fn build_reel(
    case: &'static LootCase,
    winner: &'static CaseItem,
    rng: &mut GameRng,
) -> Vec<&'static CaseItem> {
    let mut reel: Vec<&'static CaseItem> =
        (0..REEL_LENGTH).map(|_| draw_item(case, rng)).collect();
    reel[WINNER_INDEX] = winner;
    reel
}

#[derive(Clone, Debug, Serialize)]
pub struct CaseItemView {
    pub id: &'static str,
    pub name: &'static str,
    pub rarity: &'static str,
    pub color: &'static str,
    /// Multiplier in hundredths of the case price.
    pub multiplier_centi: u64,
}

impl From<&CaseItem> for CaseItemView {
    fn from(item: &CaseItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
            rarity: item.rarity.as_str(),
            color: item.rarity.color(),
            multiplier_centi: item.multiplier_centi,
        }
    }
}

/// One completed case opening.
#[derive(Clone, Debug, Serialize)]
pub struct CaseOpening {
    pub round_id: String,
    pub case_id: &'static str,
    pub item: CaseItemView,
    pub payout: u64,
    /// Reel item ids, winner at [`WINNER_INDEX`].
    pub reel: Vec<&'static str>,
}

/// Resolve an opening: validate the case, draw the winner, build the reel.
/// The caller settles price against payout atomically before recording.
pub fn open_case(
    case_id: &str,
    round_id: String,
    rng: &mut GameRng,
) -> Result<(&'static LootCase, CaseOpening), ErrorCode> {
    let case = case_by_id(case_id).ok_or(ErrorCode::InvalidCase)?;
    let winner = draw_item(case, rng);
    let reel = build_reel(case, winner, rng);
    let opening = CaseOpening {
        round_id,
        case_id: case.id,
        item: CaseItemView::from(winner),
        payout: payout_for(case.price, winner.multiplier_centi),
        reel: reel.iter().map(|i| i.id).collect(),
    };
    Ok((case, opening))
}

/// Per-user opening history, kept per case.
#[derive(Default)]
pub struct CaseSlot {
    histories: HashMap<&'static str, RingHistory<CaseOpening>>,
}

impl CaseSlot {
    pub fn record(&mut self, opening: CaseOpening) {
        self.histories
            .entry(opening.case_id)
            .or_insert_with(|| RingHistory::new(CASE_HISTORY_LIMIT))
            .push(opening);
    }

    pub fn history(&self, case_id: &str) -> Vec<CaseOpening> {
        self.histories
            .get(case_id)
            .map(|h| h.items())
            .unwrap_or_default()
    }

    /// Highest payouts first, capped at `limit`.
    pub fn top_wins(&self, case_id: &str, limit: usize) -> Vec<CaseOpening> {
        let mut rows = self.history(case_id);
        rows.sort_by(|a, b| b.payout.cmp(&a.payout));
        rows.truncate(limit.max(1));
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lookup_normalizes_ids() {
        assert_eq!(case_by_id("afet").unwrap().price, 1_000);
        assert_eq!(case_by_id(" KRISTAL ").unwrap().price, 250);
        assert!(case_by_id("missing").is_none());
    }

    #[test]
    fn payouts_scale_with_the_case_price() {
        // 1000 * 0.10
        assert_eq!(payout_for(1_000, 10), 100);
        // 1000 * 8.5
        assert_eq!(payout_for(1_000, 850), 8_500);
        // 250 * 1.10
        assert_eq!(payout_for(250, 110), 275);
        // 250 * 800
        assert_eq!(payout_for(250, 80_000), 200_000);
    }

    #[test]
    fn reel_pins_the_winner() {
        let mut rng = GameRng::from_seed(4);
        let case = case_by_id("afet").unwrap();
        let winner = &case.items[0];
        let reel = build_reel(case, winner, &mut rng);
        assert_eq!(reel.len(), REEL_LENGTH);
        assert_eq!(reel[WINNER_INDEX].id, winner.id);
    }

    #[test]
    fn open_case_rejects_unknown_ids() {
        let mut rng = GameRng::from_seed(4);
        let err = open_case("no_such_case", "r1".into(), &mut rng).unwrap_err();
        assert_eq!(err, ErrorCode::InvalidCase);
    }

    #[test]
    fn open_case_pays_the_drawn_item() {
        let mut rng = GameRng::from_seed(4);
        let (case, opening) = open_case("kristal", "r1".into(), &mut rng).unwrap();
        let item = case
            .items
            .iter()
            .find(|i| i.id == opening.item.id)
            .unwrap();
        assert_eq!(opening.payout, payout_for(case.price, item.multiplier_centi));
        assert_eq!(opening.reel.len(), REEL_LENGTH);
        assert_eq!(opening.reel[WINNER_INDEX], opening.item.id);
    }

    #[test]
    fn common_items_dominate_the_draw() {
        let mut rng = GameRng::from_seed(6);
        let case = case_by_id("afet").unwrap();
        let draws = 50_000;
        let consumer = (0..draws)
            .filter(|_| draw_item(case, &mut rng).rarity == Rarity::Consumer)
            .count();
        // Consumer items carry ~58% of the weight.
        let freq = consumer as f64 / draws as f64;
        assert!(freq > 0.5 && freq < 0.7);
    }

    #[test]
    fn history_is_per_case_and_top_wins_sort_by_payout() {
        let mut slot = CaseSlot::default();
        for (i, payout) in [50u64, 900, 200].iter().enumerate() {
            slot.record(CaseOpening {
                round_id: format!("r{i}"),
                case_id: "afet",
                item: CaseItemView::from(&AFET_ITEMS[0]),
                payout: *payout,
                reel: Vec::new(),
            });
        }
        slot.record(CaseOpening {
            round_id: "other".into(),
            case_id: "kristal",
            item: CaseItemView::from(&KRISTAL_ITEMS[0]),
            payout: 10_000,
            reel: Vec::new(),
        });

        assert_eq!(slot.history("afet").len(), 3);
        assert_eq!(slot.history("kristal").len(), 1);
        let top = slot.top_wins("afet", 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].payout, 900);
        assert_eq!(top[1].payout, 200);
    }
}
