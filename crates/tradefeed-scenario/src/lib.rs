//! Tradefeed Scenario - synthetic trade generation
//!
//! Produces plausible `TradeEvent`s for a (symbol, trader) pair:
//!
//! 1. classify the symbol (meme / crypto / stock)
//! 2. decide gain or loss (5% loss by default)
//! 3. pick a tier from the category's weighted table
//! 4. reserve a deposit and a profit through the cooldown guards
//! 5. derive the percentage change
//!
//! Generation never fails once the generator is built; configuration is
//! checked up front. Randomness is injected so tests can seed it.

pub mod catalog;
pub mod config;
pub mod weighted;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;
use tracing::debug;

use tradefeed_cooldown::{CooldownGuard, ReservationOutcome};
use tradefeed_types::{Category, SharedClock, TradeEvent, TraderId};

pub use catalog::SymbolCatalog;
pub use config::{LossRange, LossRanges, ScenarioConfig, TierKind, TierSpec};
pub use weighted::WeightedTable;

/// Scenario errors (construction only)
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Invalid weighted table: {0}")]
    InvalidTable(String),

    #[error("Invalid scenario config: {0}")]
    InvalidConfig(String),
}

pub type ScenarioResult<T> = Result<T, ScenarioError>;

/// Gain or loss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Gain,
    Loss,
}

/// A generated event plus how it was drawn
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub event: TradeEvent,
    pub branch: Branch,
    /// Tier the deposit range came from
    pub tier: TierKind,
    /// Payout multiplier of the accepted draw; `None` for losses and recycled payouts
    pub multiplier: Option<f64>,
    pub deposit_outcome: ReservationOutcome,
    pub profit_outcome: ReservationOutcome,
}

/// Percentage change for an event, rounded to one decimal.
///
/// Gains report the payout over the deposit minus one; losses report the
/// (negative) profit over the deposit.
pub fn percentage_change(branch: Branch, profit: Decimal, deposit: Decimal) -> Decimal {
    if deposit <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let ratio = profit / deposit;
    let pct = match branch {
        Branch::Gain => (ratio - Decimal::ONE) * Decimal::ONE_HUNDRED,
        Branch::Loss => ratio * Decimal::ONE_HUNDRED,
    };
    pct.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

/// Generates synthetic trades
pub struct ScenarioGenerator<R: Rng = StdRng> {
    config: ScenarioConfig,
    catalog: SymbolCatalog,
    standard_tiers: WeightedTable<TierSpec>,
    meme_tiers: WeightedTable<TierSpec>,
    deposits: CooldownGuard,
    profits: CooldownGuard,
    clock: SharedClock,
    rng: R,
}

impl ScenarioGenerator<StdRng> {
    /// Generator seeded from OS entropy
    pub fn from_entropy(config: ScenarioConfig, catalog: SymbolCatalog, clock: SharedClock) -> ScenarioResult<Self> {
        Self::new(config, catalog, clock, StdRng::from_entropy())
    }
}

fn tier_table(tiers: &[TierSpec]) -> ScenarioResult<WeightedTable<TierSpec>> {
    WeightedTable::new(tiers.iter().map(|t| (t.weight, t.clone())).collect())
}

impl<R: Rng> ScenarioGenerator<R> {
    /// Build a generator; fails if the configuration is inconsistent
    pub fn new(config: ScenarioConfig, catalog: SymbolCatalog, clock: SharedClock, rng: R) -> ScenarioResult<Self> {
        config.validate()?;
        let standard_tiers = tier_table(&config.standard_tiers)?;
        let meme_tiers = tier_table(&config.meme_tiers)?;
        let deposits = CooldownGuard::new(config.deposits.clone(), clock.clone());
        let profits = CooldownGuard::new(config.profits.clone(), clock.clone());

        Ok(Self {
            config,
            catalog,
            standard_tiers,
            meme_tiers,
            deposits,
            profits,
            clock,
            rng,
        })
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn catalog(&self) -> &SymbolCatalog {
        &self.catalog
    }

    /// Shared random source, for callers that pick traders and symbols
    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    /// Category of `symbol`
    pub fn classify(&self, symbol: &str) -> Category {
        self.catalog.classify(symbol)
    }

    /// Draw gain or loss
    pub fn draw_branch(&mut self) -> Branch {
        if self.rng.gen_bool(self.config.loss_probability) {
            Branch::Loss
        } else {
            Branch::Gain
        }
    }

    /// Generate one event for `symbol` and `trader_id`.
    ///
    /// `recent_profits` are persisted profits the new profit should not
    /// repeat.
    pub fn generate(&mut self, symbol: &str, trader_id: TraderId, recent_profits: &[Decimal]) -> Scenario {
        let branch = self.draw_branch();
        self.generate_with_branch(symbol, trader_id, branch, recent_profits)
    }

    /// Generate with a predetermined branch
    pub fn generate_with_branch(
        &mut self,
        symbol: &str,
        trader_id: TraderId,
        branch: Branch,
        recent_profits: &[Decimal],
    ) -> Scenario {
        let symbol = symbol.trim().to_ascii_uppercase();
        let category = self.catalog.classify(&symbol);

        let table = match category {
            Category::Meme => &self.meme_tiers,
            Category::Stock | Category::Crypto => &self.standard_tiers,
        };
        let tier = table.choose(&mut self.rng).clone();

        let rng = &mut self.rng;
        let deposit_attempts = self.deposits.policy().max_attempts;
        let deposit = self.deposits.reserve_unique(
            || Decimal::from(rng.gen_range(tier.deposit_min..=tier.deposit_max)),
            deposit_attempts,
        );

        let profit_attempts = self.profits.policy().max_attempts;
        let avoid = |candidate: &Decimal| recent_profits.contains(candidate);
        let (profit, multiplier) = match branch {
            Branch::Gain => {
                let deposit_f = deposit.value.to_f64().unwrap_or_default();
                let mut multiplier = tier.multiplier_min;
                let profit = self.profits.reserve_unique_avoiding(
                    || {
                        multiplier = rng.gen_range(tier.multiplier_min..=tier.multiplier_max);
                        Decimal::from((deposit_f * multiplier).round() as i64)
                    },
                    profit_attempts,
                    avoid,
                );
                // A recycled payout was not produced by the last draw
                let multiplier = match profit.outcome {
                    ReservationOutcome::Recycled => None,
                    ReservationOutcome::Fresh { .. } | ReservationOutcome::Forced => Some(multiplier),
                };
                (profit, multiplier)
            }
            Branch::Loss => {
                let range = self.config.losses.for_category(category);
                let profit = self.profits.reserve_unique_avoiding(
                    || -Decimal::from(rng.gen_range(range.min..=range.max)),
                    profit_attempts,
                    avoid,
                );
                (profit, None)
            }
        };

        let event = TradeEvent {
            percentage_change: percentage_change(branch, profit.value, deposit.value),
            symbol,
            deposit: deposit.value,
            profit: profit.value,
            trader_id,
            category,
            timestamp: self.clock.now(),
        };

        debug!(
            symbol = %event.symbol,
            trader = %event.trader_id,
            tier = %tier.kind,
            deposit = %event.deposit,
            profit = %event.profit,
            pct = %event.percentage_change,
            "Generated scenario"
        );

        Scenario {
            event,
            branch,
            tier: tier.kind,
            multiplier,
            deposit_outcome: deposit.outcome,
            profit_outcome: profit.outcome,
        }
    }
}
