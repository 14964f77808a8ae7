/// Gold granted once per user on signup.
pub const INITIAL_GRANT_GOLD: u64 = 1_000;

/// Minimum bet per spot, shared by every game.
pub const MIN_BET: u64 = 10;

/// Maximum bet per spot, shared by every game.
pub const MAX_BET: u64 = 10_000;

/// Maximum aggregate stake per wheel round.
pub const MAX_TOTAL_BET_PER_ROUND: u64 = 20_000;

/// Picks drawn per multiplier round.
pub const MULTIPLIER_PICK_COUNT: usize = 5;

/// Display-history ring size for the multiplier game.
pub const MULTIPLIER_HISTORY_LIMIT: usize = 10;

/// Display-history ring size per loot case.
pub const CASE_HISTORY_LIMIT: usize = 10;

/// Chip denominations offered by the wheel UI.
pub const WHEEL_CHIPS: [u64; 6] = [10, 50, 100, 500, 1_000, 5_000];

/// Daily reward bounds (inclusive) for days 1-7.
pub const DAILY_REWARD_MIN: u64 = 100;
pub const DAILY_REWARD_MAX: u64 = 2_000;

/// Day-7 completion bonus bounds (inclusive).
pub const DAILY_BONUS_MIN: u64 = 1_000;
pub const DAILY_BONUS_MAX: u64 = 3_000;

/// XP granted per settled casino round.
pub const XP_PER_ROUND: u64 = 5;
