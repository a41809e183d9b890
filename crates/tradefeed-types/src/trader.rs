//! Trader snapshots and level tiers

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::TraderId;

/// Level tier, a pure function of a trader's total profit.
///
/// Boundaries are half-open with the lower bound inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TraderLevel {
    /// Below 10,000
    Rookie,
    /// 10,000 up to 50,000
    Pro,
    /// 50,000 up to 100,000
    Whale,
    /// 100,000 and above
    Legend,
}

impl TraderLevel {
    /// Determine the tier for a total profit
    pub fn from_total_profit(total: Decimal) -> Self {
        match total {
            t if t >= Decimal::from(100_000) => Self::Legend,
            t if t >= Decimal::from(50_000) => Self::Whale,
            t if t >= Decimal::from(10_000) => Self::Pro,
            _ => Self::Rookie,
        }
    }

    /// Get tier display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Rookie => "Rookie",
            Self::Pro => "Pro",
            Self::Whale => "Whale",
            Self::Legend => "Legend",
        }
    }
}

impl fmt::Display for TraderLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// How a trade affects a trader's win streak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreakChange {
    /// Winning trade, streak grows by one
    Increment,
    /// Losing trade, streak drops to zero
    Reset,
    /// Streak untouched
    Keep,
}

impl StreakChange {
    /// Apply to a current streak value
    pub fn apply(&self, streak: u32) -> u32 {
        match self {
            Self::Increment => streak.saturating_add(1),
            Self::Reset => 0,
            Self::Keep => streak,
        }
    }
}

/// Current cumulative state of a trader, as held by the trader store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraderSnapshot {
    /// Trader identifier
    pub trader_id: TraderId,
    /// Name shown on leaderboards
    pub display_name: String,
    /// Cumulative profit
    pub total_profit: Decimal,
    /// Cumulative deposits
    pub total_deposit: Decimal,
    /// ISO country code or free-form country name
    pub country: String,
    /// Consecutive winning trades
    pub win_streak: u32,
}

impl TraderSnapshot {
    /// Create a fresh trader with zero totals
    pub fn new(trader_id: TraderId, display_name: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            trader_id,
            display_name: display_name.into(),
            total_profit: Decimal::ZERO,
            total_deposit: Decimal::ZERO,
            country: country.into(),
            win_streak: 0,
        }
    }

    /// Set total profit (builder style, mostly for seeding)
    pub fn with_total_profit(mut self, total: Decimal) -> Self {
        self.total_profit = total;
        self
    }

    /// Level derived from total profit
    pub fn level(&self) -> TraderLevel {
        TraderLevel::from_total_profit(self.total_profit)
    }

    /// Apply a trade delta in place
    pub fn apply_delta(&mut self, profit_delta: Decimal, deposit_delta: Decimal, streak: StreakChange) {
        self.total_profit += profit_delta;
        self.total_deposit += deposit_delta;
        self.win_streak = streak.apply(self.win_streak);
    }
}
