//! Process-local store backend

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;

use tradefeed_types::{StreakChange, TradeEvent, TraderId, TraderSnapshot};

use crate::{
    streak_change_for, EventLog, EventQuery, StoreError, StoreResult, TradeRecorder,
    TraderStore, TrendingStore, TrendingSymbol,
};

#[derive(Default)]
struct Inner {
    traders: HashMap<TraderId, TraderSnapshot>,
    events: Vec<TradeEvent>,
    trending: HashMap<String, TrendingSymbol>,
    unavailable: bool,
}

impl Inner {
    fn ensure_available(&self) -> StoreResult<()> {
        if self.unavailable {
            return Err(StoreError::Unavailable("in-memory store switched offline".to_string()));
        }
        Ok(())
    }

    fn apply_delta(
        &mut self,
        trader_id: &TraderId,
        profit_delta: Decimal,
        deposit_delta: Decimal,
        streak: StreakChange,
    ) -> StoreResult<TraderSnapshot> {
        let trader = self
            .traders
            .get_mut(trader_id)
            .ok_or_else(|| StoreError::NotFound(trader_id.to_string()))?;
        trader.apply_delta(profit_delta, deposit_delta, streak);
        Ok(trader.clone())
    }
}

/// In-memory store.
///
/// A single lock guards traders, events and counters, which makes
/// `commit_trade` atomic with respect to every reader.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with traders
    pub fn with_traders(traders: impl IntoIterator<Item = TraderSnapshot>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.write();
            for trader in traders {
                inner.traders.insert(trader.trader_id, trader);
            }
        }
        store
    }

    /// Simulate an outage: every call fails with `StoreError::Unavailable`
    /// until switched back on
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.write().unavailable = unavailable;
    }

    /// Number of events in the log
    pub fn event_count(&self) -> usize {
        self.inner.read().events.len()
    }
}

#[async_trait]
impl TraderStore for InMemoryStore {
    async fn get(&self, trader_id: &TraderId) -> StoreResult<Option<TraderSnapshot>> {
        let inner = self.inner.read();
        inner.ensure_available()?;
        Ok(inner.traders.get(trader_id).cloned())
    }

    async fn list_all(&self) -> StoreResult<Vec<TraderSnapshot>> {
        let inner = self.inner.read();
        inner.ensure_available()?;
        Ok(inner.traders.values().cloned().collect())
    }

    async fn upsert_trader(&self, trader: &TraderSnapshot) -> StoreResult<()> {
        let mut inner = self.inner.write();
        inner.ensure_available()?;
        inner.traders.insert(trader.trader_id, trader.clone());
        Ok(())
    }

    async fn apply_delta(
        &self,
        trader_id: &TraderId,
        profit_delta: Decimal,
        deposit_delta: Decimal,
        streak: StreakChange,
    ) -> StoreResult<TraderSnapshot> {
        let mut inner = self.inner.write();
        inner.ensure_available()?;
        inner.apply_delta(trader_id, profit_delta, deposit_delta, streak)
    }
}

#[async_trait]
impl EventLog for InMemoryStore {
    async fn append(&self, event: &TradeEvent) -> StoreResult<()> {
        let mut inner = self.inner.write();
        inner.ensure_available()?;
        inner.events.push(event.clone());
        Ok(())
    }

    async fn query(&self, query: EventQuery) -> StoreResult<Vec<TradeEvent>> {
        let inner = self.inner.read();
        inner.ensure_available()?;

        // Appends are chronological; walking backwards yields newest first and
        // keeps insertion order stable for equal timestamps.
        let mut results: Vec<TradeEvent> = inner
            .events
            .iter()
            .rev()
            .filter(|e| query.matches(e))
            .cloned()
            .collect();
        results.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        if let Some(limit) = query.limit {
            results.truncate(limit);
        }
        Ok(results)
    }
}

#[async_trait]
impl TrendingStore for InMemoryStore {
    async fn bump_trending(&self, symbol: &str, at: DateTime<Utc>) -> StoreResult<TrendingSymbol> {
        let mut inner = self.inner.write();
        inner.ensure_available()?;

        let key = symbol.to_ascii_uppercase();
        let entry = inner.trending.entry(key.clone()).or_insert_with(|| TrendingSymbol {
            symbol: key,
            mentions: 0,
            last_seen: at,
        });
        entry.mentions += 1;
        entry.last_seen = at;
        Ok(entry.clone())
    }

    async fn trending(&self, min_mentions: u64) -> StoreResult<Vec<TrendingSymbol>> {
        let inner = self.inner.read();
        inner.ensure_available()?;

        let mut symbols: Vec<TrendingSymbol> = inner
            .trending
            .values()
            .filter(|t| t.mentions >= min_mentions)
            .cloned()
            .collect();
        symbols.sort_by(|a, b| {
            b.mentions
                .cmp(&a.mentions)
                .then_with(|| b.last_seen.cmp(&a.last_seen))
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        Ok(symbols)
    }
}

#[async_trait]
impl TradeRecorder for InMemoryStore {
    async fn commit_trade(&self, event: &TradeEvent) -> StoreResult<TraderSnapshot> {
        let mut inner = self.inner.write();
        inner.ensure_available()?;

        // Apply first: an unknown trader must leave the log untouched.
        let updated = inner.apply_delta(
            &event.trader_id,
            event.profit,
            event.deposit,
            streak_change_for(event),
        )?;
        inner.events.push(event.clone());
        Ok(updated)
    }
}
