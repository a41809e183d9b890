//! Tradefeed Store - Persistence collaborators of the activity engine
//!
//! The engine core never talks to a database directly. It goes through the
//! repository traits defined here:
//!
//! - **`TraderStore`**: cumulative per-trader totals (profit, deposit, streak,
//!   country)
//! - **`EventLog`**: append-only trade records, queried through `EventQuery`
//! - **`TrendingStore`**: monotonically increasing per-symbol mention counters
//! - **`TradeRecorder`**: appends an event and applies the trader delta as one
//!   atomic unit, so a concurrent snapshot rebuild never sees a half-applied
//!   trade
//!
//! Two backends are provided: `InMemoryStore` (process-local, used by tests
//! and demo runs) and `SqliteStore` (sqlx, file-backed).
//!
//! # Example
//!
//! ```ignore
//! use tradefeed_store::{open_store, StoreConfig};
//!
//! let store = open_store(&StoreConfig::from_env()).await?;
//! let traders = store.list_all().await?;
//! ```

pub mod config;
pub mod error;
pub mod query;
mod memory;
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use tradefeed_types::{Category, StreakChange, TradeEvent, TraderId, TraderSnapshot};

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use query::EventQuery;
pub use sqlite::SqliteStore;

/// Mention counter for a symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingSymbol {
    /// Upper-cased ticker
    pub symbol: String,
    /// Times the symbol was used for a generated event
    pub mentions: u64,
    /// Last time it was used
    pub last_seen: DateTime<Utc>,
}

/// Cumulative trader state keyed by trader id
#[async_trait]
pub trait TraderStore: Send + Sync {
    /// Fetch one trader
    async fn get(&self, trader_id: &TraderId) -> StoreResult<Option<TraderSnapshot>>;

    /// Fetch every trader, in no particular order
    async fn list_all(&self) -> StoreResult<Vec<TraderSnapshot>>;

    /// Insert a trader or overwrite an existing one
    async fn upsert_trader(&self, trader: &TraderSnapshot) -> StoreResult<()>;

    /// Add deltas to a trader's totals and return the updated snapshot
    async fn apply_delta(
        &self,
        trader_id: &TraderId,
        profit_delta: Decimal,
        deposit_delta: Decimal,
        streak: StreakChange,
    ) -> StoreResult<TraderSnapshot>;

    /// Traders from one country, in no particular order
    async fn list_by_country(&self, country: &str) -> StoreResult<Vec<TraderSnapshot>> {
        let traders = self.list_all().await?;
        Ok(traders
            .into_iter()
            .filter(|t| t.country.eq_ignore_ascii_case(country))
            .collect())
    }
}

/// Append-only trade history
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Append an event
    async fn append(&self, event: &TradeEvent) -> StoreResult<()>;

    /// Query events, newest first
    async fn query(&self, query: EventQuery) -> StoreResult<Vec<TradeEvent>>;

    /// Most recent events in one category
    async fn query_by_category(&self, category: Category, limit: usize) -> StoreResult<Vec<TradeEvent>> {
        self.query(EventQuery::for_category(category).with_limit(limit)).await
    }

    /// Profits of the most recent events, newest first
    async fn query_recent_profits(&self, limit: usize) -> StoreResult<Vec<Decimal>> {
        let events = self.query(EventQuery::all().with_limit(limit)).await?;
        Ok(events.into_iter().map(|e| e.profit).collect())
    }
}

/// Per-symbol mention counters
#[async_trait]
pub trait TrendingStore: Send + Sync {
    /// Increment the counter for `symbol` and stamp `at` as last seen
    async fn bump_trending(&self, symbol: &str, at: DateTime<Utc>) -> StoreResult<TrendingSymbol>;

    /// Symbols with at least `min_mentions`, most mentioned first
    async fn trending(&self, min_mentions: u64) -> StoreResult<Vec<TrendingSymbol>>;
}

/// Atomic event persistence
#[async_trait]
pub trait TradeRecorder: TraderStore + EventLog {
    /// Append `event` and apply its delta to the owning trader in one unit.
    ///
    /// Gains increment the win streak, losses reset it. Fails with
    /// `StoreError::NotFound` (and persists nothing) for an unknown trader.
    async fn commit_trade(&self, event: &TradeEvent) -> StoreResult<TraderSnapshot>;
}

/// Everything the engine needs from persistence
pub trait Store: TradeRecorder + TrendingStore {}

impl<T: TradeRecorder + TrendingStore> Store for T {}

/// Streak effect of a trade
pub fn streak_change_for(event: &TradeEvent) -> StreakChange {
    if event.is_gain() {
        StreakChange::Increment
    } else if event.is_loss() {
        StreakChange::Reset
    } else {
        StreakChange::Keep
    }
}

/// Open the backend selected by `config`
pub async fn open_store(config: &StoreConfig) -> StoreResult<Arc<dyn Store>> {
    if config.is_memory() {
        info!("Using in-memory store");
        return Ok(Arc::new(InMemoryStore::new()));
    }

    let store = SqliteStore::connect(config).await?;
    Ok(Arc::new(store))
}
