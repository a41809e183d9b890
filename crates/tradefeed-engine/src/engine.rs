//! One activity cycle
//!
//! pick trader and symbol → generate → persist atomically → bump trending →
//! patch rankings → announce winner

use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use tokio::sync::Mutex;
use tracing::{info, warn};

use tradefeed_rankings::{Notification, NotificationSink, PatchOutcome, RankingsCache};
use tradefeed_scenario::{Branch, ScenarioGenerator, TierKind};
use tradefeed_store::Store;
use tradefeed_types::{TradeEvent, TraderSnapshot};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::schedule::IntervalSchedule;

/// What a completed cycle did
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Persisted event
    pub event: TradeEvent,
    /// Trader state after the event
    pub trader: TraderSnapshot,
    pub branch: Branch,
    pub tier: TierKind,
    /// Effect on the rankings cache
    pub patch: PatchOutcome,
}

/// Drives synthetic activity against a store, a rankings cache and a sink
pub struct ActivityEngine {
    store: Arc<dyn Store>,
    cache: Arc<RankingsCache>,
    sink: Arc<dyn NotificationSink>,
    // Held for the whole cycle, which serializes cycles
    generator: Mutex<ScenarioGenerator>,
    config: EngineConfig,
}

impl ActivityEngine {
    pub fn new(
        store: Arc<dyn Store>,
        cache: Arc<RankingsCache>,
        sink: Arc<dyn NotificationSink>,
        generator: ScenarioGenerator,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            cache,
            sink,
            generator: Mutex::new(generator),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<RankingsCache> {
        &self.cache
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Draw the wait before the next cycle from the shared random source
    pub async fn next_delay(&self, schedule: &IntervalSchedule) -> Duration {
        let mut generator = self.generator.lock().await;
        schedule.next_delay(generator.rng_mut())
    }

    /// Run one cycle.
    ///
    /// Any store failure abandons the cycle before or inside the atomic
    /// commit, so nothing is half-persisted. Trending and notification
    /// failures after the commit are logged and do not fail the cycle.
    pub async fn run_cycle(&self) -> EngineResult<CycleReport> {
        let mut generator = self.generator.lock().await;

        let mut traders = self.store.list_all().await?;
        traders.sort_by_key(|t| t.trader_id);
        let symbols = generator.catalog().symbols();

        let rng = generator.rng_mut();
        let trader_id = traders.choose(rng).ok_or(EngineError::EmptyRoster)?.trader_id;
        let symbol = symbols.choose(rng).ok_or(EngineError::EmptyCatalog)?.clone();

        let window = generator.config().recent_profit_window;
        let recent = self.store.query_recent_profits(window).await?;

        let scenario = generator.generate(&symbol, trader_id, &recent);
        let event = scenario.event;

        let trader = self.store.commit_trade(&event).await?;

        if let Err(e) = self.store.bump_trending(&event.symbol, event.timestamp).await {
            warn!(symbol = %event.symbol, error = %e, "Failed to bump trending counter");
        }

        let patch = self.cache.record_event(&trader).await;

        if event.is_gain() && self.config.notify_winners {
            if let Err(e) = self.announce(&Notification::winner(&trader, &event)).await {
                warn!(trader = %trader.trader_id, error = %e, "Failed to deliver winner notification");
            }
        }

        info!(
            trader = %trader.trader_id,
            name = %trader.display_name,
            symbol = %event.symbol,
            category = %event.category,
            deposit = %event.deposit,
            profit = %event.profit,
            total = %trader.total_profit,
            "Cycle complete"
        );

        Ok(CycleReport {
            event,
            trader,
            branch: scenario.branch,
            tier: scenario.tier,
            patch,
        })
    }

    async fn announce(&self, notification: &Notification) -> EngineResult<()> {
        self.sink.notify(notification).await?;
        Ok(())
    }
}
