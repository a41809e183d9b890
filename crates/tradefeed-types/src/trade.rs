//! Trade events and asset categories

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::TraderId;

/// Asset class a symbol belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Listed equities
    Stock,
    /// Major crypto assets
    Crypto,
    /// Meme coins (wider, wilder outcome distribution)
    Meme,
}

impl Category {
    /// All categories, in display order
    pub const ALL: [Category; 3] = [Category::Stock, Category::Crypto, Category::Meme];

    /// Stable lowercase name used for persistence
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stock => "stock",
            Self::Crypto => "crypto",
            Self::Meme => "meme",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stock" => Ok(Self::Stock),
            "crypto" => Ok(Self::Crypto),
            "meme" => Ok(Self::Meme),
            other => Err(format!("unknown category: {}", other)),
        }
    }
}

/// A single synthetic trade outcome.
///
/// Immutable once created; the event log owns it after persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    /// Ticker symbol, upper-cased
    pub symbol: String,
    /// Amount put in (always positive)
    pub deposit: Decimal,
    /// Signed outcome: payout for gains, negative loss amount for losses
    pub profit: Decimal,
    /// Percentage change, one decimal place
    pub percentage_change: Decimal,
    /// Trader the event is attributed to
    pub trader_id: TraderId,
    /// Asset class of `symbol`
    pub category: Category,
    /// Creation time
    pub timestamp: DateTime<Utc>,
}

impl TradeEvent {
    /// Whether this event is a winning trade
    pub fn is_gain(&self) -> bool {
        self.profit > Decimal::ZERO
    }

    /// Whether this event is a losing trade
    pub fn is_loss(&self) -> bool {
        self.profit < Decimal::ZERO
    }
}
