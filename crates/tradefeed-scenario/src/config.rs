//! Scenario tuning: loss rate, tier tables, loss ranges

use serde::{Deserialize, Serialize};

use tradefeed_cooldown::CooldownPolicy;
use tradefeed_types::Category;

use crate::{ScenarioError, ScenarioResult};

/// Default probability that a generated trade is a loss
pub const DEFAULT_LOSS_PROBABILITY: f64 = 0.05;

/// Default number of persisted profits the generator steers away from
pub const DEFAULT_RECENT_PROFIT_WINDOW: usize = 50;

/// Named gain tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierKind {
    Small,
    Mid,
    Whale,
    Meme,
    MemeMoonshot,
}

impl TierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TierKind::Small => "small",
            TierKind::Mid => "mid",
            TierKind::Whale => "whale",
            TierKind::Meme => "meme",
            TierKind::MemeMoonshot => "meme_moonshot",
        }
    }
}

impl std::fmt::Display for TierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a tier table: a weight, a deposit range and a payout
/// multiplier range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSpec {
    pub kind: TierKind,
    pub weight: f64,
    pub deposit_min: i64,
    pub deposit_max: i64,
    pub multiplier_min: f64,
    pub multiplier_max: f64,
}

impl TierSpec {
    pub fn new(kind: TierKind, weight: f64, deposits: (i64, i64), multipliers: (f64, f64)) -> Self {
        Self {
            kind,
            weight,
            deposit_min: deposits.0,
            deposit_max: deposits.1,
            multiplier_min: multipliers.0,
            multiplier_max: multipliers.1,
        }
    }

    fn validate(&self) -> ScenarioResult<()> {
        if self.deposit_min < 1 || self.deposit_min > self.deposit_max {
            return Err(ScenarioError::InvalidConfig(format!(
                "tier {}: deposit range {}..={} is empty or non-positive",
                self.kind, self.deposit_min, self.deposit_max
            )));
        }
        let finite = self.multiplier_min.is_finite() && self.multiplier_max.is_finite();
        if !finite || self.multiplier_min < 1.0 || self.multiplier_min > self.multiplier_max {
            return Err(ScenarioError::InvalidConfig(format!(
                "tier {}: multiplier range {}..={} must be finite and at least 1",
                self.kind, self.multiplier_min, self.multiplier_max
            )));
        }
        Ok(())
    }
}

/// Inclusive integer range of loss magnitudes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LossRange {
    pub min: i64,
    pub max: i64,
}

/// Loss magnitude ranges per category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossRanges {
    pub stock: LossRange,
    pub crypto: LossRange,
    pub meme: LossRange,
}

impl Default for LossRanges {
    fn default() -> Self {
        Self {
            stock: LossRange { min: 500, max: 1400 },
            crypto: LossRange { min: 400, max: 1200 },
            meme: LossRange { min: 500, max: 1200 },
        }
    }
}

impl LossRanges {
    pub fn for_category(&self, category: Category) -> LossRange {
        match category {
            Category::Stock => self.stock,
            Category::Crypto => self.crypto,
            Category::Meme => self.meme,
        }
    }
}

/// Generator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Chance that a trade is a loss
    pub loss_probability: f64,
    /// How many persisted profits to avoid repeating
    pub recent_profit_window: usize,
    /// Tier table for stocks and crypto
    pub standard_tiers: Vec<TierSpec>,
    /// Tier table for meme coins
    pub meme_tiers: Vec<TierSpec>,
    /// Loss magnitudes
    pub losses: LossRanges,
    /// Cooldown for deposits
    pub deposits: CooldownPolicy,
    /// Cooldown for profits
    pub profits: CooldownPolicy,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            loss_probability: DEFAULT_LOSS_PROBABILITY,
            recent_profit_window: DEFAULT_RECENT_PROFIT_WINDOW,
            standard_tiers: vec![
                TierSpec::new(TierKind::Small, 0.35, (100, 900), (2.0, 8.0)),
                TierSpec::new(TierKind::Mid, 0.50, (500, 8_500), (2.0, 8.0)),
                TierSpec::new(TierKind::Whale, 0.15, (20_000, 40_000), (2.0, 5.0)),
            ],
            meme_tiers: vec![
                TierSpec::new(TierKind::Meme, 0.90, (500, 7_000), (5.0, 50.0)),
                TierSpec::new(TierKind::MemeMoonshot, 0.10, (500, 7_000), (30.0, 100.0)),
            ],
            losses: LossRanges::default(),
            deposits: CooldownPolicy::deposits(),
            profits: CooldownPolicy::profits(),
        }
    }
}

impl ScenarioConfig {
    /// Check ranges and probabilities
    pub fn validate(&self) -> ScenarioResult<()> {
        if !(0.0..=1.0).contains(&self.loss_probability) {
            return Err(ScenarioError::InvalidConfig(format!(
                "loss probability {} outside [0, 1]",
                self.loss_probability
            )));
        }
        for tier in self.standard_tiers.iter().chain(&self.meme_tiers) {
            tier.validate()?;
        }
        for category in Category::ALL {
            let range = self.losses.for_category(category);
            if range.min < 1 || range.min > range.max {
                return Err(ScenarioError::InvalidConfig(format!(
                    "{} loss range {}..={} is empty or non-positive",
                    category, range.min, range.max
                )));
            }
        }
        Ok(())
    }
}
