//! Weekly daily-reward schedule.
//!
//! Each user gets a deterministic 7-day reward table per week (Monday start),
//! seeded from the user id and the week, so the schedule survives restarts
//! without being stored. Claiming day 7 with a full 7-day streak adds a
//! bonus. The actual credit goes through the ledger under a per-day
//! reference, so a claim can never pay twice even if the in-memory guard is
//! lost.
//!
//! Time is carried as whole days since the Unix epoch.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use abyss_types::{
    ErrorCode, UserId, DAILY_BONUS_MAX, DAILY_BONUS_MIN, DAILY_REWARD_MAX, DAILY_REWARD_MIN,
};

/// Monday on or before `day`. Day 0 (1970-01-01) was a Thursday, so the
/// first partial week clamps to day 0.
pub fn week_start_day(day: u64) -> u64 {
    day.saturating_sub((day + 3) % 7)
}

/// The per-week reward table: seven daily amounts plus the day-7 bonus.
fn week_rewards(user: UserId, week_start: u64) -> ([u64; 7], u64) {
    let seed = user.wrapping_mul(0x9e37_79b9_7f4a_7c15) ^ week_start;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut rewards = [0u64; 7];
    for slot in &mut rewards {
        *slot = rng.gen_range(DAILY_REWARD_MIN..=DAILY_REWARD_MAX);
    }
    let bonus = rng.gen_range(DAILY_BONUS_MIN..=DAILY_BONUS_MAX);
    (rewards, bonus)
}

#[derive(Clone, Debug)]
struct WeekState {
    week_start: u64,
    rewards: [u64; 7],
    bonus: u64,
    /// Bit `i` set means day `i + 1` is claimed.
    claimed_days: u8,
    last_claim_day: Option<u64>,
    streak: u8,
}

impl WeekState {
    fn for_week(user: UserId, week_start: u64, carry: Option<&WeekState>) -> Self {
        let (rewards, bonus) = week_rewards(user, week_start);
        Self {
            week_start,
            rewards,
            bonus,
            claimed_days: 0,
            // The streak carries across the week boundary.
            last_claim_day: carry.and_then(|s| s.last_claim_day),
            streak: carry.map(|s| s.streak).unwrap_or(0),
        }
    }
}

/// A claim that passed the guards but has not yet been paid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingClaim {
    /// 1..=7 within the week.
    pub day_index: u8,
    /// Amount to credit, bonus included when due.
    pub amount: u64,
    /// Streak value to record once the credit lands.
    pub streak: u8,
    /// Ledger reference for the claim.
    pub reference: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct RewardDayView {
    pub day: u8,
    pub amount: u64,
    pub claimed: bool,
    pub state: &'static str,
}

#[derive(Clone, Debug, Serialize)]
pub struct RewardStateView {
    pub week_start_day: u64,
    pub today_index: u8,
    pub days: Vec<RewardDayView>,
    pub bonus_day7: u64,
    pub streak: u8,
    pub can_claim_today: bool,
}

/// In-memory claim tracker. Purely advisory next to the ledger reference,
/// which is the durable double-claim guard.
pub struct DailyRewards {
    weeks: Mutex<HashMap<UserId, WeekState>>,
}

impl Default for DailyRewards {
    fn default() -> Self {
        Self {
            weeks: Mutex::new(HashMap::new()),
        }
    }
}

impl DailyRewards {
    fn with_week<T>(&self, user: UserId, today: u64, f: impl FnOnce(&mut WeekState) -> T) -> T {
        let mut weeks = self.weeks.lock().unwrap_or_else(PoisonError::into_inner);
        let week_start = week_start_day(today);
        let rotate = match weeks.get(&user) {
            Some(state) => state.week_start != week_start,
            None => true,
        };
        if rotate {
            let carry = weeks.get(&user).cloned();
            weeks.insert(user, WeekState::for_week(user, week_start, carry.as_ref()));
        }
        // Entry exists by construction.
        f(weeks.get_mut(&user).unwrap_or_else(|| unreachable!()))
    }

    pub fn state(&self, user: UserId, today: u64) -> RewardStateView {
        self.with_week(user, today, |week| {
            let today_index = (today - week.week_start + 1) as u8;
            let days = week
                .rewards
                .iter()
                .enumerate()
                .map(|(i, &amount)| {
                    let day = (i + 1) as u8;
                    let claimed = week.claimed_days & (1 << i) != 0;
                    let state = if claimed {
                        "claimed"
                    } else if day == today_index {
                        "today"
                    } else {
                        "future"
                    };
                    RewardDayView {
                        day,
                        amount,
                        claimed,
                        state,
                    }
                })
                .collect();
            let bit = 1u8 << (today_index - 1);
            let can_claim_today =
                week.claimed_days & bit == 0 && week.last_claim_day != Some(today);
            RewardStateView {
                week_start_day: week.week_start,
                today_index,
                days,
                bonus_day7: week.bonus,
                streak: week.streak,
                can_claim_today,
            }
        })
    }

    /// Check the guards and compute today's claim without recording it.
    /// Record with [`DailyRewards::mark_claimed`] after the credit commits.
    pub fn claimable(&self, user: UserId, today: u64) -> Result<PendingClaim, ErrorCode> {
        self.with_week(user, today, |week| {
            let day_index = (today - week.week_start + 1) as u8;
            let bit = 1u8 << (day_index - 1);
            if week.claimed_days & bit != 0 || week.last_claim_day == Some(today) {
                return Err(ErrorCode::InvalidState);
            }
            let streak = if today > 0 && week.last_claim_day == Some(today - 1) {
                (week.streak + 1).min(7)
            } else {
                1
            };
            let mut amount = week.rewards[(day_index - 1) as usize];
            if day_index == 7 && streak >= 7 {
                amount += week.bonus;
            }
            Ok(PendingClaim {
                day_index,
                amount,
                streak,
                reference: format!("daily:{user}:{today}"),
            })
        })
    }

    pub fn mark_claimed(&self, user: UserId, today: u64, streak: u8) {
        self.with_week(user, today, |week| {
            let day_index = (today - week.week_start + 1) as u8;
            week.claimed_days |= 1 << (day_index - 1);
            week.last_claim_day = Some(today);
            week.streak = streak;
        });
    }
}
