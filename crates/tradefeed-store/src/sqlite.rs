//! SQLite store backend

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use tracing::info;

use tradefeed_types::{Category, StreakChange, TradeEvent, TraderId, TraderSnapshot};

use crate::{
    streak_change_for, EventLog, EventQuery, StoreConfig, StoreError, StoreResult, TradeRecorder,
    TraderStore, TrendingStore, TrendingSymbol,
};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS traders (
        trader_id     TEXT PRIMARY KEY,
        display_name  TEXT NOT NULL,
        total_profit  TEXT NOT NULL,
        total_deposit TEXT NOT NULL,
        country       TEXT NOT NULL,
        win_streak    INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS trade_events (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        symbol            TEXT NOT NULL,
        deposit           TEXT NOT NULL,
        profit            TEXT NOT NULL,
        percentage_change TEXT NOT NULL,
        trader_id         TEXT NOT NULL,
        category          TEXT NOT NULL,
        timestamp_ms      INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_trade_events_category ON trade_events (category, timestamp_ms)",
    r#"
    CREATE TABLE IF NOT EXISTS trending_symbols (
        symbol       TEXT PRIMARY KEY,
        mentions     INTEGER NOT NULL,
        last_seen_ms INTEGER NOT NULL
    )
    "#,
];

const TRADER_COLUMNS: &str =
    "trader_id, display_name, total_profit, total_deposit, country, win_streak";

/// SQLite-backed store.
///
/// Decimals are stored as TEXT to keep exact values; timestamps as unix
/// milliseconds.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect and make sure the tables exist
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        info!("Connecting to SQLite: {}", config.database_url_masked());

        let options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| StoreError::Connection(format!("SQLite URL: {}", e)))?
            .create_if_missing(true);

        // `sqlite::memory:` databases live and die with their connection, so
        // pooled connections are never recycled.
        let pool = SqlitePoolOptions::new()
            .max_connections(config.pool_size())
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connection(format!("SQLite: {}", e)))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        info!("Connected to SQLite");
        Ok(store)
    }

    /// Wrap an existing pool (schema must already exist)
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn ensure_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn parse_decimal(row: &SqliteRow, column: &str) -> StoreResult<Decimal> {
    let raw: String = row.try_get(column)?;
    Decimal::from_str(&raw).map_err(|e| StoreError::Corrupt(format!("{} = {:?}: {}", column, raw, e)))
}

fn parse_timestamp(ms: i64) -> StoreResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::Corrupt(format!("timestamp out of range: {}", ms)))
}

fn parse_trader_id(raw: &str) -> StoreResult<TraderId> {
    TraderId::parse(raw).map_err(|e| StoreError::Corrupt(format!("trader_id = {:?}: {}", raw, e)))
}

fn trader_from_row(row: &SqliteRow) -> StoreResult<TraderSnapshot> {
    let trader_id: String = row.try_get("trader_id")?;
    let win_streak: i64 = row.try_get("win_streak")?;
    Ok(TraderSnapshot {
        trader_id: parse_trader_id(&trader_id)?,
        display_name: row.try_get("display_name")?,
        total_profit: parse_decimal(row, "total_profit")?,
        total_deposit: parse_decimal(row, "total_deposit")?,
        country: row.try_get("country")?,
        win_streak: u32::try_from(win_streak).unwrap_or(0),
    })
}

fn event_from_row(row: &SqliteRow) -> StoreResult<TradeEvent> {
    let trader_id: String = row.try_get("trader_id")?;
    let category: String = row.try_get("category")?;
    Ok(TradeEvent {
        symbol: row.try_get("symbol")?,
        deposit: parse_decimal(row, "deposit")?,
        profit: parse_decimal(row, "profit")?,
        percentage_change: parse_decimal(row, "percentage_change")?,
        trader_id: parse_trader_id(&trader_id)?,
        category: Category::from_str(&category).map_err(StoreError::Corrupt)?,
        timestamp: parse_timestamp(row.try_get("timestamp_ms")?)?,
    })
}

fn trending_from_row(row: &SqliteRow) -> StoreResult<TrendingSymbol> {
    let mentions: i64 = row.try_get("mentions")?;
    Ok(TrendingSymbol {
        symbol: row.try_get("symbol")?,
        mentions: u64::try_from(mentions).unwrap_or(0),
        last_seen: parse_timestamp(row.try_get("last_seen_ms")?)?,
    })
}

async fn insert_event(conn: &mut SqliteConnection, event: &TradeEvent) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO trade_events (symbol, deposit, profit, percentage_change, trader_id, category, timestamp_ms)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&event.symbol)
    .bind(event.deposit.to_string())
    .bind(event.profit.to_string())
    .bind(event.percentage_change.to_string())
    .bind(event.trader_id.to_string())
    .bind(event.category.as_str())
    .bind(event.timestamp.timestamp_millis())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn apply_delta_on(
    conn: &mut SqliteConnection,
    trader_id: &TraderId,
    profit_delta: Decimal,
    deposit_delta: Decimal,
    streak: StreakChange,
) -> StoreResult<TraderSnapshot> {
    let row = sqlx::query(&format!("SELECT {} FROM traders WHERE trader_id = ?", TRADER_COLUMNS))
        .bind(trader_id.to_string())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| StoreError::NotFound(trader_id.to_string()))?;

    let mut trader = trader_from_row(&row)?;
    trader.apply_delta(profit_delta, deposit_delta, streak);

    sqlx::query(
        "UPDATE traders SET total_profit = ?, total_deposit = ?, win_streak = ? WHERE trader_id = ?",
    )
    .bind(trader.total_profit.to_string())
    .bind(trader.total_deposit.to_string())
    .bind(i64::from(trader.win_streak))
    .bind(trader_id.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(trader)
}

#[async_trait]
impl TraderStore for SqliteStore {
    async fn get(&self, trader_id: &TraderId) -> StoreResult<Option<TraderSnapshot>> {
        let row = sqlx::query(&format!("SELECT {} FROM traders WHERE trader_id = ?", TRADER_COLUMNS))
            .bind(trader_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(trader_from_row).transpose()
    }

    async fn list_all(&self) -> StoreResult<Vec<TraderSnapshot>> {
        let rows = sqlx::query(&format!("SELECT {} FROM traders", TRADER_COLUMNS))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(trader_from_row).collect()
    }

    async fn upsert_trader(&self, trader: &TraderSnapshot) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO traders (trader_id, display_name, total_profit, total_deposit, country, win_streak)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (trader_id) DO UPDATE SET
                display_name = excluded.display_name,
                total_profit = excluded.total_profit,
                total_deposit = excluded.total_deposit,
                country = excluded.country,
                win_streak = excluded.win_streak
            "#,
        )
        .bind(trader.trader_id.to_string())
        .bind(&trader.display_name)
        .bind(trader.total_profit.to_string())
        .bind(trader.total_deposit.to_string())
        .bind(&trader.country)
        .bind(i64::from(trader.win_streak))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn apply_delta(
        &self,
        trader_id: &TraderId,
        profit_delta: Decimal,
        deposit_delta: Decimal,
        streak: StreakChange,
    ) -> StoreResult<TraderSnapshot> {
        let mut tx = self.pool.begin().await?;
        let trader = apply_delta_on(&mut tx, trader_id, profit_delta, deposit_delta, streak).await?;
        tx.commit().await?;
        Ok(trader)
    }

    async fn list_by_country(&self, country: &str) -> StoreResult<Vec<TraderSnapshot>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM traders WHERE country = ? COLLATE NOCASE",
            TRADER_COLUMNS
        ))
        .bind(country)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(trader_from_row).collect()
    }
}

#[async_trait]
impl EventLog for SqliteStore {
    async fn append(&self, event: &TradeEvent) -> StoreResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_event(&mut conn, event).await
    }

    async fn query(&self, query: EventQuery) -> StoreResult<Vec<TradeEvent>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT symbol, deposit, profit, percentage_change, trader_id, category, timestamp_ms \
             FROM trade_events WHERE 1 = 1",
        );
        if let Some(category) = query.category {
            builder.push(" AND category = ").push_bind(category.as_str());
        }
        if let Some(ref trader_id) = query.trader_id {
            builder.push(" AND trader_id = ").push_bind(trader_id.to_string());
        }
        if let Some(since) = query.since {
            builder.push(" AND timestamp_ms >= ").push_bind(since.timestamp_millis());
        }
        builder.push(" ORDER BY timestamp_ms DESC, id DESC");
        if let Some(limit) = query.limit {
            builder
                .push(" LIMIT ")
                .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(event_from_row).collect()
    }
}

#[async_trait]
impl TrendingStore for SqliteStore {
    async fn bump_trending(&self, symbol: &str, at: DateTime<Utc>) -> StoreResult<TrendingSymbol> {
        let row = sqlx::query(
            r#"
            INSERT INTO trending_symbols (symbol, mentions, last_seen_ms)
            VALUES (?, 1, ?)
            ON CONFLICT (symbol) DO UPDATE SET
                mentions = mentions + 1,
                last_seen_ms = excluded.last_seen_ms
            RETURNING symbol, mentions, last_seen_ms
            "#,
        )
        .bind(symbol.to_ascii_uppercase())
        .bind(at.timestamp_millis())
        .fetch_one(&self.pool)
        .await?;
        trending_from_row(&row)
    }

    async fn trending(&self, min_mentions: u64) -> StoreResult<Vec<TrendingSymbol>> {
        let rows = sqlx::query(
            r#"
            SELECT symbol, mentions, last_seen_ms FROM trending_symbols
            WHERE mentions >= ?
            ORDER BY mentions DESC, last_seen_ms DESC, symbol ASC
            "#,
        )
        .bind(i64::try_from(min_mentions).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(trending_from_row).collect()
    }
}

#[async_trait]
impl TradeRecorder for SqliteStore {
    async fn commit_trade(&self, event: &TradeEvent) -> StoreResult<TraderSnapshot> {
        let mut tx = self.pool.begin().await?;
        let trader = apply_delta_on(
            &mut tx,
            &event.trader_id,
            event.profit,
            event.deposit,
            streak_change_for(event),
        )
        .await?;
        insert_event(&mut tx, event).await?;
        tx.commit().await?;
        Ok(trader)
    }
}
