use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use tradefeed_store::{
    EventLog, EventQuery, SqliteStore, StoreConfig, StoreError, TradeRecorder, TraderStore,
    TrendingStore,
};
use tradefeed_types::{Category, StreakChange, TradeEvent, TraderId, TraderSnapshot};

async fn memory_store() -> SqliteStore {
    let config = StoreConfig {
        database_url: "sqlite::memory:".to_string(),
        max_connections: 1,
        ..Default::default()
    };
    SqliteStore::connect(&config).await.unwrap()
}

fn event(trader_id: &TraderId, category: Category, deposit: Decimal, profit: Decimal) -> TradeEvent {
    TradeEvent {
        symbol: "SOL".to_string(),
        deposit,
        profit,
        percentage_change: dec!(12.5),
        trader_id: *trader_id,
        category,
        timestamp: Utc::now(),
    }
}

#[tokio::test]
async fn test_trader_upsert_and_delta() {
    let store = memory_store().await;
    let alice = TraderSnapshot::new(TraderId::new(), "Alice", "DE").with_total_profit(dec!(1500.50));

    store.upsert_trader(&alice).await.unwrap();
    let loaded = store.get(&alice.trader_id).await.unwrap().unwrap();
    assert_eq!(loaded, alice);

    let updated = store
        .apply_delta(&alice.trader_id, dec!(499.50), dec!(250), StreakChange::Increment)
        .await
        .unwrap();
    assert_eq!(updated.total_profit, dec!(2000));
    assert_eq!(updated.total_deposit, dec!(250));
    assert_eq!(updated.win_streak, 1);

    let missing = store
        .apply_delta(&TraderId::new(), dec!(1), dec!(1), StreakChange::Keep)
        .await;
    assert!(matches!(missing, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn test_commit_trade_is_all_or_nothing() {
    let store = memory_store().await;
    let bob = TraderSnapshot::new(TraderId::new(), "Bob", "BR");
    store.upsert_trader(&bob).await.unwrap();

    let snapshot = store
        .commit_trade(&event(&bob.trader_id, Category::Crypto, dec!(800), dec!(3200)))
        .await
        .unwrap();
    assert_eq!(snapshot.total_profit, dec!(3200));
    assert_eq!(snapshot.win_streak, 1);

    let orphan = store
        .commit_trade(&event(&TraderId::new(), Category::Crypto, dec!(800), dec!(3200)))
        .await;
    assert!(orphan.is_err());

    let events = store.query(EventQuery::all()).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].trader_id, bob.trader_id);
    assert_eq!(events[0].percentage_change, dec!(12.5));
}

#[tokio::test]
async fn test_event_queries() {
    let store = memory_store().await;
    let carla = TraderSnapshot::new(TraderId::new(), "Carla", "US");
    store.upsert_trader(&carla).await.unwrap();

    let base = Utc::now();
    for (i, category) in [Category::Meme, Category::Stock, Category::Meme].into_iter().enumerate() {
        let mut e = event(&carla.trader_id, category, dec!(100), Decimal::from(1000 * (i as i64 + 1)));
        e.timestamp = base + Duration::seconds(i as i64);
        store.append(&e).await.unwrap();
    }

    let memes = store.query_by_category(Category::Meme, 10).await.unwrap();
    assert_eq!(memes.len(), 2);
    assert_eq!(memes[0].profit, dec!(3000));

    let recent = store.query_recent_profits(2).await.unwrap();
    assert_eq!(recent, vec![dec!(3000), dec!(2000)]);

    let by_trader = store
        .query(EventQuery::for_trader(carla.trader_id).since(base + Duration::seconds(1)))
        .await
        .unwrap();
    assert_eq!(by_trader.len(), 2);
}

#[tokio::test]
async fn test_trending_and_country() {
    let store = memory_store().await;
    let now = Utc::now();

    for _ in 0..3 {
        store.bump_trending("wif", now).await.unwrap();
    }
    store.bump_trending("TSLA", now).await.unwrap();

    let hot = store.trending(3).await.unwrap();
    assert_eq!(hot.len(), 1);
    assert_eq!(hot[0].symbol, "WIF");
    assert_eq!(hot[0].mentions, 3);

    store
        .upsert_trader(&TraderSnapshot::new(TraderId::new(), "Dana", "fr"))
        .await
        .unwrap();
    let french = store.list_by_country("FR").await.unwrap();
    assert_eq!(french.len(), 1);
}

#[tokio::test]
async fn test_in_memory_pool_shares_one_database() {
    let config = StoreConfig {
        database_url: "sqlite::memory:".to_string(),
        max_connections: 4,
        ..Default::default()
    };
    let store = SqliteStore::connect(&config).await.unwrap();

    let traders: Vec<TraderSnapshot> = (0..8)
        .map(|i| TraderSnapshot::new(TraderId::new(), format!("Pool {}", i), "NL"))
        .collect();
    for trader in &traders {
        store.upsert_trader(trader).await.unwrap();
    }
    assert_eq!(store.list_all().await.unwrap().len(), traders.len());
}
