//! Notification sink
//!
//! The cache and the engine announce breakouts and winning trades through a
//! `NotificationSink`. How notifications are rendered or delivered is the
//! sink's business.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use tradefeed_types::{format_currency, TradeEvent, TraderId, TraderSnapshot};

/// Notification errors
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Delivery failed on {sink}: {reason}")]
    Delivery { sink: String, reason: String },

    #[error("Sink closed: {0}")]
    Closed(String),
}

pub type NotifyResult<T> = Result<T, NotifyError>;

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// A trader entered the top view by passing its lowest row
    Breakout,
    /// A winning trade was recorded
    Winner,
}

/// Notification payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub trader_id: TraderId,
    pub display_name: String,
    /// Trader total after the triggering event
    pub total_profit: Decimal,
    /// Symbol of the triggering trade, when there is one
    pub symbol: Option<String>,
    /// Profit of the triggering trade, when there is one
    pub amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// A trader passed the lowest row of the top view
    pub fn breakout(trader: &TraderSnapshot, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: NotificationKind::Breakout,
            trader_id: trader.trader_id,
            display_name: trader.display_name.clone(),
            total_profit: trader.total_profit,
            symbol: None,
            amount: None,
            created_at: at,
        }
    }

    /// A winning trade by `trader` (snapshot taken after the trade)
    pub fn winner(trader: &TraderSnapshot, event: &TradeEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: NotificationKind::Winner,
            trader_id: trader.trader_id,
            display_name: trader.display_name.clone(),
            total_profit: trader.total_profit,
            symbol: Some(event.symbol.clone()),
            amount: Some(event.profit),
            created_at: event.timestamp,
        }
    }

    /// One-line text form
    pub fn message(&self) -> String {
        match self.kind {
            NotificationKind::Breakout => format!(
                "{} broke into the top traders with {}",
                self.display_name,
                format_currency(self.total_profit)
            ),
            NotificationKind::Winner => format!(
                "{} won {} on {} (total {})",
                self.display_name,
                format_currency(self.amount.unwrap_or_default()),
                self.symbol.as_deref().unwrap_or("?"),
                format_currency(self.total_profit)
            ),
        }
    }
}

/// Notification sink trait
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver a notification
    async fn notify(&self, notification: &Notification) -> NotifyResult<()>;

    /// Get sink name
    fn name(&self) -> &str;
}

/// In-memory sink for testing
pub struct InMemorySink {
    name: String,
    notifications: RwLock<Vec<Notification>>,
    closed: RwLock<bool>,
}

impl InMemorySink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            notifications: RwLock::new(Vec::new()),
            closed: RwLock::new(false),
        }
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.read().clone()
    }

    pub fn of_kind(&self, kind: NotificationKind) -> Vec<Notification> {
        self.notifications
            .read()
            .iter()
            .filter(|n| n.kind == kind)
            .cloned()
            .collect()
    }

    /// Make every further delivery fail
    pub fn close(&self) {
        *self.closed.write() = true;
    }
}

impl Default for InMemorySink {
    fn default() -> Self {
        Self::new("memory")
    }
}

#[async_trait::async_trait]
impl NotificationSink for InMemorySink {
    async fn notify(&self, notification: &Notification) -> NotifyResult<()> {
        if *self.closed.read() {
            return Err(NotifyError::Closed(self.name.clone()));
        }
        self.notifications.write().push(notification.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Sink that writes notifications to the log
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait::async_trait]
impl NotificationSink for LogSink {
    async fn notify(&self, notification: &Notification) -> NotifyResult<()> {
        info!(
            kind = ?notification.kind,
            trader = %notification.trader_id,
            total = %notification.total_profit,
            "{}",
            notification.message()
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tradefeed_types::Category;

    fn trader() -> TraderSnapshot {
        TraderSnapshot::new(TraderId::new(), "Mira", "DE").with_total_profit(dec!(12500))
    }

    #[test]
    fn test_messages() {
        let t = trader();
        let breakout = Notification::breakout(&t, Utc::now());
        assert_eq!(breakout.message(), "Mira broke into the top traders with $12,500");

        let event = TradeEvent {
            symbol: "PEPE".to_string(),
            deposit: dec!(500),
            profit: dec!(4000),
            percentage_change: dec!(700.0),
            trader_id: t.trader_id,
            category: Category::Meme,
            timestamp: Utc::now(),
        };
        let winner = Notification::winner(&t, &event);
        assert_eq!(winner.kind, NotificationKind::Winner);
        assert_eq!(winner.message(), "Mira won $4,000 on PEPE (total $12,500)");
    }

    #[tokio::test]
    async fn test_in_memory_sink() {
        let sink = InMemorySink::new("test");
        let t = trader();
        sink.notify(&Notification::breakout(&t, Utc::now())).await.unwrap();
        assert_eq!(sink.of_kind(NotificationKind::Breakout).len(), 1);
        assert!(sink.of_kind(NotificationKind::Winner).is_empty());

        sink.close();
        assert!(matches!(
            sink.notify(&Notification::breakout(&t, Utc::now())).await,
            Err(NotifyError::Closed(_))
        ));
        assert_eq!(sink.notifications().len(), 1);
    }

    #[tokio::test]
    async fn test_log_sink_accepts() {
        assert!(LogSink.notify(&Notification::breakout(&trader(), Utc::now())).await.is_ok());
        assert_eq!(LogSink.name(), "log");
    }
}
