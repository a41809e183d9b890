//! Tradefeed Aggregator - derived leaderboard views
//!
//! Stateless, read-only views computed on demand from the event log and the
//! trader store, independent of the rankings cache:
//!
//! - **By category**: per-trader sums over one asset class
//! - **By country**: traders of one country by total profit
//! - **By ROI**: per-trader profit over deposit across all events
//! - **Trending**: symbols mentioned at least three times
//!
//! Empty input gives an empty view, never an error. Store failures are
//! returned to the caller.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::debug;

use tradefeed_rankings::{render_line, RankMarker, EMPTY_PLACEHOLDER};
use tradefeed_store::{EventQuery, Store, StoreResult, TrendingSymbol};
use tradefeed_types::{Category, TradeEvent, TraderId, TraderSnapshot};

/// Default number of rows in every view
pub const DEFAULT_TOP_N: usize = 10;

/// Default mention threshold for trending symbols
pub const DEFAULT_TRENDING_MIN_MENTIONS: u64 = 3;

/// Aggregator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Rows per view
    pub top_n: usize,
    /// Mentions a symbol needs to count as trending
    pub trending_min_mentions: u64,
    /// Only aggregate the most recent events (`None` = whole log)
    pub event_window: Option<usize>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            trending_min_mentions: DEFAULT_TRENDING_MIN_MENTIONS,
            event_window: None,
        }
    }
}

/// One row of a derived view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub trader_id: TraderId,
    pub display_name: String,
    pub country: String,
    /// Summed profit (event views) or total profit (country view)
    pub profit: Decimal,
    /// Summed deposit (event views) or total deposit (country view)
    pub deposit: Decimal,
    /// `profit / deposit × 100`, zero when nothing was deposited
    pub roi: Decimal,
    /// Number of events aggregated, `None` for store-backed views
    pub trades: Option<usize>,
}

/// Return on investment in percent, two decimals; zero without deposits
pub fn roi_percent(profit: Decimal, deposit: Decimal) -> Decimal {
    if deposit <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let mut roi = (profit / deposit * Decimal::ONE_HUNDRED).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    roi.rescale(2);
    roi
}

#[derive(Default)]
struct Sums {
    profit: Decimal,
    deposit: Decimal,
    trades: usize,
}

/// Computes leaderboard views over a store
pub struct LeaderboardAggregator {
    store: Arc<dyn Store>,
    config: AggregatorConfig,
}

impl LeaderboardAggregator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_config(store, AggregatorConfig::default())
    }

    pub fn with_config(store: Arc<dyn Store>, config: AggregatorConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    fn windowed(&self, query: EventQuery) -> EventQuery {
        match self.config.event_window {
            Some(limit) => query.with_limit(limit),
            None => query,
        }
    }

    /// Group events per trader and attach names from the trader store
    async fn sum_by_trader(&self, events: &[TradeEvent]) -> StoreResult<Vec<AggregateRow>> {
        if events.is_empty() {
            return Ok(Vec::new());
        }

        let mut sums: HashMap<TraderId, Sums> = HashMap::new();
        for event in events {
            let entry = sums.entry(event.trader_id).or_default();
            entry.profit += event.profit;
            entry.deposit += event.deposit;
            entry.trades += 1;
        }

        let traders: HashMap<TraderId, TraderSnapshot> = self
            .store
            .list_all()
            .await?
            .into_iter()
            .map(|t| (t.trader_id, t))
            .collect();

        Ok(sums
            .into_iter()
            .map(|(trader_id, sums)| {
                let (display_name, country) = match traders.get(&trader_id) {
                    Some(t) => (t.display_name.clone(), t.country.clone()),
                    None => (trader_id.to_string(), String::new()),
                };
                AggregateRow {
                    trader_id,
                    display_name,
                    country,
                    profit: sums.profit,
                    deposit: sums.deposit,
                    roi: roi_percent(sums.profit, sums.deposit),
                    trades: Some(sums.trades),
                }
            })
            .collect())
    }

    /// Top traders by summed profit within one asset class
    pub async fn by_asset_category(&self, category: Category) -> StoreResult<Vec<AggregateRow>> {
        let events = self.store.query(self.windowed(EventQuery::for_category(category))).await?;
        let mut rows = self.sum_by_trader(&events).await?;
        rows.sort_by(|a, b| b.profit.cmp(&a.profit).then_with(|| a.display_name.cmp(&b.display_name)));
        rows.truncate(self.config.top_n);
        debug!(%category, events = events.len(), rows = rows.len(), "Category view computed");
        Ok(rows)
    }

    /// Top traders of one country by total profit (country match is
    /// case-insensitive)
    pub async fn by_country(&self, country: &str) -> StoreResult<Vec<AggregateRow>> {
        let mut traders = self.store.list_by_country(country).await?;
        traders.sort_by(|a, b| {
            b.total_profit
                .cmp(&a.total_profit)
                .then_with(|| a.display_name.cmp(&b.display_name))
        });
        traders.truncate(self.config.top_n);
        Ok(traders
            .into_iter()
            .map(|t| AggregateRow {
                roi: roi_percent(t.total_profit, t.total_deposit),
                trader_id: t.trader_id,
                display_name: t.display_name,
                country: t.country,
                profit: t.total_profit,
                deposit: t.total_deposit,
                trades: None,
            })
            .collect())
    }

    /// Top traders by summed profit over summed deposit; traders without
    /// deposits are left out
    pub async fn by_roi(&self) -> StoreResult<Vec<AggregateRow>> {
        let events = self.store.query(self.windowed(EventQuery::all())).await?;
        let mut rows: Vec<AggregateRow> = self
            .sum_by_trader(&events)
            .await?
            .into_iter()
            .filter(|row| row.deposit > Decimal::ZERO)
            .collect();
        // Compare exact ratios, not the rounded percentages
        rows.sort_by(|a, b| {
            (b.profit / b.deposit)
                .cmp(&(a.profit / a.deposit))
                .then_with(|| a.display_name.cmp(&b.display_name))
        });
        rows.truncate(self.config.top_n);
        Ok(rows)
    }

    /// Symbols with at least the configured number of mentions, most
    /// mentioned first
    pub async fn trending_symbols(&self) -> StoreResult<Vec<TrendingSymbol>> {
        self.store.trending(self.config.trending_min_mentions).await
    }
}

/// Which figure a rendered view shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMetric {
    Profit,
    Roi,
}

/// Render a view as ranked lines, or the placeholder when it is empty
pub fn render_rows(rows: &[AggregateRow], metric: ViewMetric) -> Vec<String> {
    if rows.is_empty() {
        return vec![EMPTY_PLACEHOLDER.to_string()];
    }
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let marker = RankMarker::for_rank(i + 1);
            match metric {
                ViewMetric::Profit => render_line(marker, &row.display_name, row.profit, ""),
                ViewMetric::Roi => format!("{} {} {:.2}%", marker, row.display_name, row.roi),
            }
        })
        .collect()
}

/// Render trending symbols, or the placeholder when none qualify
pub fn render_trending(symbols: &[TrendingSymbol]) -> Vec<String> {
    if symbols.is_empty() {
        return vec![EMPTY_PLACEHOLDER.to_string()];
    }
    symbols
        .iter()
        .map(|s| format!("{} ({} mentions)", s.symbol, s.mentions))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tradefeed_store::{EventLog, InMemoryStore, TraderStore, TrendingStore};

    fn trader(name: &str, country: &str) -> TraderSnapshot {
        TraderSnapshot::new(TraderId::new(), name, country)
    }

    fn event(trader: &TraderSnapshot, symbol: &str, category: Category, deposit: Decimal, profit: Decimal) -> TradeEvent {
        TradeEvent {
            symbol: symbol.to_string(),
            deposit,
            profit,
            percentage_change: Decimal::ZERO,
            trader_id: trader.trader_id,
            category,
            timestamp: Utc::now(),
        }
    }

    async fn setup() -> (Arc<InMemoryStore>, LeaderboardAggregator, Vec<TraderSnapshot>) {
        let traders = vec![trader("Ana", "BR"), trader("Bo", "se"), trader("Cal", "SE")];
        let store = Arc::new(InMemoryStore::with_traders(traders.clone()));
        let aggregator = LeaderboardAggregator::new(store.clone());
        (store, aggregator, traders)
    }

    #[test]
    fn test_roi_percent() {
        assert_eq!(roi_percent(dec!(500), dec!(1000)), dec!(50.00));
        assert_eq!(roi_percent(dec!(1), dec!(3)), dec!(33.33));
        assert_eq!(roi_percent(dec!(100), dec!(0)), dec!(0));
    }

    #[tokio::test]
    async fn test_empty_inputs_give_empty_views() {
        let store = Arc::new(InMemoryStore::new());
        let aggregator = LeaderboardAggregator::new(store);
        assert!(aggregator.by_asset_category(Category::Meme).await.unwrap().is_empty());
        assert!(aggregator.by_country("US").await.unwrap().is_empty());
        assert!(aggregator.by_roi().await.unwrap().is_empty());
        assert!(aggregator.trending_symbols().await.unwrap().is_empty());
        assert_eq!(render_rows(&[], ViewMetric::Profit), vec![EMPTY_PLACEHOLDER.to_string()]);
        assert_eq!(render_trending(&[]), vec![EMPTY_PLACEHOLDER.to_string()]);
    }

    #[tokio::test]
    async fn test_by_asset_category_sums_per_trader() {
        let (store, aggregator, t) = setup().await;
        store.append(&event(&t[0], "DOGE", Category::Meme, dec!(500), dec!(4000))).await.unwrap();
        store.append(&event(&t[0], "PEPE", Category::Meme, dec!(1000), dec!(-500))).await.unwrap();
        store.append(&event(&t[1], "WIF", Category::Meme, dec!(2000), dec!(6000))).await.unwrap();
        store.append(&event(&t[2], "BTC", Category::Crypto, dec!(100), dec!(90000))).await.unwrap();

        let rows = aggregator.by_asset_category(Category::Meme).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].display_name, "Bo");
        assert_eq!(rows[0].profit, dec!(6000));
        assert_eq!(rows[0].roi, dec!(300.00));
        assert_eq!(rows[1].display_name, "Ana");
        assert_eq!(rows[1].profit, dec!(3500));
        assert_eq!(rows[1].deposit, dec!(1500));
        assert_eq!(rows[1].trades, Some(2));

        let lines = render_rows(&rows, ViewMetric::Profit);
        assert_eq!(lines[0], "🥇 Bo $6,000");
    }

    #[tokio::test]
    async fn test_views_are_capped_at_ten() {
        let store = Arc::new(InMemoryStore::new());
        for i in 0..15 {
            let t = trader(&format!("T{:02}", i), "US").with_total_profit(Decimal::from(i * 100));
            store.upsert_trader(&t).await.unwrap();
            store
                .append(&event(&t, "AAPL", Category::Stock, dec!(100), Decimal::from(i * 10 + 1)))
                .await
                .unwrap();
        }
        let aggregator = LeaderboardAggregator::new(store);
        let rows = aggregator.by_asset_category(Category::Stock).await.unwrap();
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0].display_name, "T14");
        assert_eq!(aggregator.by_country("us").await.unwrap().len(), 10);
        assert_eq!(aggregator.by_roi().await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_by_country() {
        let (store, aggregator, t) = setup().await;
        store.apply_delta(&t[1].trader_id, dec!(700), dec!(100), tradefeed_types::StreakChange::Increment).await.unwrap();
        store.apply_delta(&t[2].trader_id, dec!(900), dec!(300), tradefeed_types::StreakChange::Increment).await.unwrap();

        let rows = aggregator.by_country("SE").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].display_name, "Cal");
        assert_eq!(rows[0].roi, dec!(300.00));
        assert_eq!(rows[1].display_name, "Bo");
        assert!(rows.iter().all(|r| r.trades.is_none()));
        assert!(aggregator.by_country("NZ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_by_roi_orders_by_ratio_and_skips_zero_deposit() {
        let (store, aggregator, t) = setup().await;
        store.append(&event(&t[0], "AAPL", Category::Stock, dec!(10000), dec!(20000))).await.unwrap();
        store.append(&event(&t[1], "SOL", Category::Crypto, dec!(100), dec!(700))).await.unwrap();
        store.append(&event(&t[2], "TSLA", Category::Stock, dec!(0), dec!(50))).await.unwrap();

        let rows = aggregator.by_roi().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].display_name, "Bo");
        assert_eq!(rows[0].roi, dec!(700.00));
        assert_eq!(rows[1].display_name, "Ana");

        let lines = render_rows(&rows, ViewMetric::Roi);
        assert_eq!(lines[0], "🥇 Bo 700.00%");
        assert_eq!(lines[1], "🥈 Ana 200.00%");
    }

    #[test]
    fn test_roi_always_two_decimals() {
        assert_eq!(roi_percent(dec!(600), dec!(300)).to_string(), "200.00");
        assert_eq!(roi_percent(dec!(1), dec!(3)).to_string(), "33.33");
        assert_eq!(roi_percent(dec!(2), dec!(3)).to_string(), "66.67");
        assert_eq!(roi_percent(dec!(5), dec!(0)), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_trending_threshold() {
        let (store, aggregator, _) = setup().await;
        let now = Utc::now();
        for _ in 0..3 {
            store.bump_trending("PEPE", now).await.unwrap();
        }
        for _ in 0..4 {
            store.bump_trending("BTC", now).await.unwrap();
        }
        store.bump_trending("AAPL", now).await.unwrap();
        store.bump_trending("AAPL", now).await.unwrap();

        let trending = aggregator.trending_symbols().await.unwrap();
        let symbols: Vec<&str> = trending.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTC", "PEPE"]);
        assert_eq!(render_trending(&trending)[0], "BTC (4 mentions)");
    }

    #[tokio::test]
    async fn test_store_errors_propagate() {
        let (store, aggregator, _) = setup().await;
        store.set_unavailable(true);
        assert!(aggregator.by_roi().await.is_err());
        assert!(aggregator.by_country("SE").await.is_err());
    }
}
