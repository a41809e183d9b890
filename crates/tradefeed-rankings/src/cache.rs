//! Top-K rankings snapshot with TTL-driven rebuilds
//!
//! State machine:
//!
//! ```text
//!   Empty ──get()──▶ Fresh ──age ≥ ttl / invalidate()──▶ Stale
//!                      ▲                                  │
//!                      └──────────────get()───────────────┘
//! ```
//!
//! `get()` rebuilds from the trader store when the cache is empty or stale.
//! `record_event()` patches a fresh snapshot in place and never touches
//! `built_at`; on an empty or stale cache it does nothing and leaves the work
//! to the next rebuild.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use tradefeed_store::{Store, StoreResult};
use tradefeed_types::{SharedClock, TraderId, TraderLevel, TraderSnapshot};

use crate::config::RankingsConfig;
use crate::notify::{Notification, NotificationSink};

/// One row of the rankings view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingRow {
    pub trader_id: TraderId,
    pub display_name: String,
    pub total_profit: Decimal,
    pub level: TraderLevel,
    pub country: String,
    pub win_streak: u32,
}

impl From<&TraderSnapshot> for RankingRow {
    fn from(trader: &TraderSnapshot) -> Self {
        Self {
            trader_id: trader.trader_id,
            display_name: trader.display_name.clone(),
            total_profit: trader.total_profit,
            level: trader.level(),
            country: trader.country.clone(),
            win_streak: trader.win_streak,
        }
    }
}

/// Materialized top-K view.
///
/// Entries are sorted by total profit descending, hold at most `capacity`
/// rows and never repeat a trader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub entries: Vec<RankingRow>,
    pub built_at: DateTime<Utc>,
    pub scope: String,
}

impl CacheSnapshot {
    /// Lowest total in the view
    pub fn min_total(&self) -> Option<Decimal> {
        self.entries.last().map(|row| row.total_profit)
    }

    /// 1-based rank of a trader, if present
    pub fn rank_of(&self, trader_id: &TraderId) -> Option<usize> {
        self.entries
            .iter()
            .position(|row| row.trader_id == *trader_id)
            .map(|i| i + 1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Externally visible cache state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Never built
    Empty,
    /// Younger than the TTL
    Fresh,
    /// TTL elapsed or invalidated; the next `get()` rebuilds
    Stale,
}

/// Result of `record_event`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// Cache empty or stale, nothing changed
    Skipped,
    /// Snapshot patched in place
    Patched {
        /// 1-based rank after the patch, `None` if the trader did not make it
        rank: Option<usize>,
        /// Whether a breakout notification was raised
        breakout: bool,
    },
}

#[derive(Default)]
struct Inner {
    snapshot: Option<CacheSnapshot>,
    invalidated: bool,
}

/// Bounded rankings cache over a trader store
pub struct RankingsCache {
    config: RankingsConfig,
    store: Arc<dyn Store>,
    sink: Arc<dyn NotificationSink>,
    clock: SharedClock,
    inner: Mutex<Inner>,
}

fn sort_and_truncate(entries: &mut Vec<RankingRow>, capacity: usize) {
    entries.sort_by(|a, b| b.total_profit.cmp(&a.total_profit));
    entries.truncate(capacity);
}

impl RankingsCache {
    pub fn new(
        config: RankingsConfig,
        store: Arc<dyn Store>,
        sink: Arc<dyn NotificationSink>,
        clock: SharedClock,
    ) -> Self {
        Self {
            config,
            store,
            sink,
            clock,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn config(&self) -> &RankingsConfig {
        &self.config
    }

    fn state_of(&self, inner: &Inner) -> CacheState {
        match &inner.snapshot {
            None => CacheState::Empty,
            Some(_) if inner.invalidated => CacheState::Stale,
            Some(snapshot) if self.clock.now() - snapshot.built_at >= self.config.ttl => CacheState::Stale,
            Some(_) => CacheState::Fresh,
        }
    }

    /// Current state
    pub async fn state(&self) -> CacheState {
        let inner = self.inner.lock().await;
        self.state_of(&inner)
    }

    /// Whether the next `get()` will rebuild
    pub async fn is_stale(&self) -> bool {
        self.state().await != CacheState::Fresh
    }

    /// Force the next `get()` to rebuild
    pub async fn invalidate(&self) {
        self.inner.lock().await.invalidated = true;
    }

    /// Current snapshot without rebuilding
    pub async fn peek(&self) -> Option<CacheSnapshot> {
        self.inner.lock().await.snapshot.clone()
    }

    /// Return the current view, rebuilding it from the store when it is
    /// empty or stale.
    ///
    /// A failed rebuild leaves the previous snapshot in place.
    pub async fn get(&self) -> StoreResult<CacheSnapshot> {
        let mut inner = self.inner.lock().await;
        if let (CacheState::Fresh, Some(snapshot)) = (self.state_of(&inner), &inner.snapshot) {
            return Ok(snapshot.clone());
        }

        let traders = self.store.list_all().await?;
        let mut entries: Vec<RankingRow> = traders.iter().map(RankingRow::from).collect();
        sort_and_truncate(&mut entries, self.config.capacity);

        let snapshot = CacheSnapshot {
            entries,
            built_at: self.clock.now(),
            scope: self.config.scope.clone(),
        };
        info!(
            scope = %snapshot.scope,
            rows = snapshot.len(),
            traders = traders.len(),
            "Rankings snapshot rebuilt"
        );

        inner.snapshot = Some(snapshot.clone());
        inner.invalidated = false;
        Ok(snapshot)
    }

    /// Fold a trader's new totals into a fresh snapshot.
    ///
    /// An existing row is raised to the larger of its current and new total;
    /// an absent trader is appended. A new total strictly above the view's
    /// lowest row, taken before the patch, triggers one breakout notification.
    pub async fn record_event(&self, trader: &TraderSnapshot) -> PatchOutcome {
        let (outcome, breakout_at) = {
            let mut inner = self.inner.lock().await;
            if self.state_of(&inner) != CacheState::Fresh {
                debug!(trader = %trader.trader_id, "Rankings cache not fresh, patch skipped");
                return PatchOutcome::Skipped;
            }
            let Some(snapshot) = inner.snapshot.as_mut() else {
                return PatchOutcome::Skipped;
            };

            let new_total = trader.total_profit;
            let breakout = snapshot.min_total().is_some_and(|min| new_total > min);
            match snapshot
                .entries
                .iter_mut()
                .find(|row| row.trader_id == trader.trader_id)
            {
                Some(row) => {
                    if new_total > row.total_profit {
                        row.total_profit = new_total;
                        row.level = TraderLevel::from_total_profit(new_total);
                    }
                    row.display_name = trader.display_name.clone();
                    row.win_streak = trader.win_streak;
                }
                None => snapshot.entries.push(RankingRow::from(trader)),
            }

            sort_and_truncate(&mut snapshot.entries, self.config.capacity);
            let rank = snapshot.rank_of(&trader.trader_id);
            (PatchOutcome::Patched { rank, breakout }, breakout.then(|| self.clock.now()))
        };

        if let Some(at) = breakout_at {
            info!(trader = %trader.trader_id, total = %trader.total_profit, "Rankings breakout");
            let notification = Notification::breakout(trader, at);
            if let Err(e) = self.sink.notify(&notification).await {
                warn!(sink = self.sink.name(), error = %e, "Failed to deliver breakout notification");
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{InMemorySink, NotificationKind};
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use tradefeed_store::{InMemoryStore, TraderStore};
    use tradefeed_types::ManualClock;

    struct Fixture {
        store: Arc<InMemoryStore>,
        sink: Arc<InMemorySink>,
        clock: Arc<ManualClock>,
        cache: RankingsCache,
    }

    fn fixture(totals: &[i64], capacity: usize) -> Fixture {
        let traders = totals
            .iter()
            .enumerate()
            .map(|(i, t)| TraderSnapshot::new(TraderId::new(), format!("T{}", i), "US").with_total_profit(Decimal::from(*t)));
        let store = Arc::new(InMemoryStore::with_traders(traders));
        let sink = Arc::new(InMemorySink::default());
        let clock = Arc::new(ManualClock::starting_now());
        let cache = RankingsCache::new(
            RankingsConfig::default().with_capacity(capacity),
            store.clone(),
            sink.clone(),
            clock.clone(),
        );
        Fixture { store, sink, clock, cache }
    }

    fn assert_invariants(snapshot: &CacheSnapshot, capacity: usize) {
        assert!(snapshot.len() <= capacity);
        for pair in snapshot.entries.windows(2) {
            assert!(pair[0].total_profit >= pair[1].total_profit);
        }
        let mut ids: Vec<_> = snapshot.entries.iter().map(|r| r.trader_id).collect();
        ids.sort_by_key(|id| id.0);
        ids.dedup();
        assert_eq!(ids.len(), snapshot.len());
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let f = fixture(&[100, 200], 20);
        assert_eq!(f.cache.state().await, CacheState::Empty);
        assert!(f.cache.is_stale().await);

        f.cache.get().await.unwrap();
        assert_eq!(f.cache.state().await, CacheState::Fresh);

        f.clock.advance(Duration::hours(5) - Duration::seconds(1));
        assert_eq!(f.cache.state().await, CacheState::Fresh);
        f.clock.advance(Duration::seconds(1));
        assert_eq!(f.cache.state().await, CacheState::Stale);

        f.cache.get().await.unwrap();
        assert_eq!(f.cache.state().await, CacheState::Fresh);
        f.cache.invalidate().await;
        assert_eq!(f.cache.state().await, CacheState::Stale);
    }

    #[tokio::test]
    async fn test_fresh_get_does_not_rebuild() {
        let f = fixture(&[100, 200, 300], 20);
        let first = f.cache.get().await.unwrap();

        let newcomer = TraderSnapshot::new(TraderId::new(), "Late", "FR").with_total_profit(dec!(999));
        f.store.upsert_trader(&newcomer).await.unwrap();
        f.clock.advance(Duration::hours(1));

        let second = f.cache.get().await.unwrap();
        assert_eq!(first, second);
        assert!(second.rank_of(&newcomer.trader_id).is_none());
    }

    #[tokio::test]
    async fn test_rebuild_truncates_and_sorts() {
        let f = fixture(&[5, 50, 1, 40, 30, 20, 10], 5);
        let snapshot = f.cache.get().await.unwrap();
        let totals: Vec<Decimal> = snapshot.entries.iter().map(|r| r.total_profit).collect();
        assert_eq!(totals, vec![dec!(50), dec!(40), dec!(30), dec!(20), dec!(10)]);
        assert_eq!(snapshot.scope, "global");
    }

    #[tokio::test]
    async fn test_patch_skipped_when_stale() {
        let f = fixture(&[100], 20);
        let trader = TraderSnapshot::new(TraderId::new(), "X", "US").with_total_profit(dec!(500));
        assert_eq!(f.cache.record_event(&trader).await, PatchOutcome::Skipped);

        f.cache.get().await.unwrap();
        f.clock.advance(Duration::hours(6));
        assert_eq!(f.cache.record_event(&trader).await, PatchOutcome::Skipped);
        assert!(f.sink.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_existing_row_never_lowered() {
        let f = fixture(&[300, 200, 100], 20);
        let snapshot = f.cache.get().await.unwrap();
        let mut middle = f.store.get(&snapshot.entries[1].trader_id).await.unwrap().unwrap();

        middle.total_profit = dec!(100);
        middle.win_streak = 0;
        let outcome = f.cache.record_event(&middle).await;
        assert_eq!(outcome, PatchOutcome::Patched { rank: Some(2), breakout: false });
        let after = f.cache.peek().await.unwrap();
        assert_eq!(after.entries[1].total_profit, dec!(200));

        middle.total_profit = dec!(400);
        middle.win_streak = 4;
        let outcome = f.cache.record_event(&middle).await;
        assert_eq!(outcome, PatchOutcome::Patched { rank: Some(1), breakout: true });
        let after = f.cache.peek().await.unwrap();
        assert_eq!(after.entries[0].total_profit, dec!(400));
        assert_eq!(after.entries[0].win_streak, 4);
        assert_eq!(after.built_at, snapshot.built_at);
        assert_eq!(f.sink.of_kind(NotificationKind::Breakout).len(), 1);
    }

    #[tokio::test]
    async fn test_ranked_trader_climbing_fires_one_breakout() {
        let totals: Vec<i64> = (0..25).map(|i| (25 - i) * 1_000).collect();
        let f = fixture(&totals, 20);
        let snapshot = f.cache.get().await.unwrap();
        assert_eq!(snapshot.min_total(), Some(dec!(6000)));

        let mut tenth = f.store.get(&snapshot.entries[9].trader_id).await.unwrap().unwrap();
        tenth.total_profit = dec!(18500);
        let outcome = f.cache.record_event(&tenth).await;
        assert_eq!(outcome, PatchOutcome::Patched { rank: Some(8), breakout: true });

        let breakouts = f.sink.of_kind(NotificationKind::Breakout);
        assert_eq!(breakouts.len(), 1);
        assert_eq!(breakouts[0].display_name, "T9");
        assert_eq!(breakouts[0].total_profit, dec!(18500));
    }

    #[tokio::test]
    async fn test_lowest_row_unchanged_is_not_a_breakout() {
        let f = fixture(&[300, 200, 100], 20);
        let snapshot = f.cache.get().await.unwrap();
        let lowest = f.store.get(&snapshot.entries[2].trader_id).await.unwrap().unwrap();
        assert_eq!(
            f.cache.record_event(&lowest).await,
            PatchOutcome::Patched { rank: Some(3), breakout: false }
        );
        assert!(f.sink.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_newcomer_below_minimum_is_dropped() {
        let f = fixture(&[300, 200, 100], 3);
        f.cache.get().await.unwrap();
        let low = TraderSnapshot::new(TraderId::new(), "Low", "US").with_total_profit(dec!(50));
        assert_eq!(
            f.cache.record_event(&low).await,
            PatchOutcome::Patched { rank: None, breakout: false }
        );
        assert_eq!(f.cache.peek().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_patch_sequence_keeps_invariants() {
        let totals: Vec<i64> = (1..=30).map(|i| i * 100).collect();
        let f = fixture(&totals, 20);
        f.cache.get().await.unwrap();

        let mut traders = f.store.list_all().await.unwrap();
        traders.sort_by_key(|t| t.total_profit);
        for (step, trader) in traders.iter_mut().enumerate() {
            trader.total_profit += Decimal::from((step as i64 * 37) % 1_500);
            f.cache.record_event(trader).await;
            assert_invariants(&f.cache.peek().await.unwrap(), 20);
        }
        let breakouts = f.sink.of_kind(NotificationKind::Breakout);
        assert!(!breakouts.is_empty());
    }
}
