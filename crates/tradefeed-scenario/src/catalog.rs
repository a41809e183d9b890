//! Symbol classification tables

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use tradefeed_types::Category;

/// Externally supplied symbol → category tables.
///
/// Meme membership wins over crypto; anything unlisted is a stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolCatalog {
    pub meme: BTreeSet<String>,
    pub crypto: BTreeSet<String>,
    pub stocks: BTreeSet<String>,
}

fn upper_set(symbols: &[&str]) -> BTreeSet<String> {
    symbols.iter().map(|s| s.to_ascii_uppercase()).collect()
}

impl Default for SymbolCatalog {
    fn default() -> Self {
        Self {
            meme: upper_set(&["DOGE", "SHIB", "PEPE", "BONK", "WIF", "FLOKI", "TRUMP", "POPCAT"]),
            crypto: upper_set(&["BTC", "ETH", "SOL", "BNB", "XRP", "ADA", "AVAX", "TON", "LINK"]),
            stocks: upper_set(&["AAPL", "TSLA", "NVDA", "MSFT", "AMZN", "META", "GOOGL", "AMD", "NFLX"]),
        }
    }
}

impl SymbolCatalog {
    /// Build a catalog from plain lists
    pub fn new(meme: &[&str], crypto: &[&str], stocks: &[&str]) -> Self {
        Self {
            meme: upper_set(meme),
            crypto: upper_set(crypto),
            stocks: upper_set(stocks),
        }
    }

    /// Category of `symbol` (case-insensitive)
    pub fn classify(&self, symbol: &str) -> Category {
        let symbol = symbol.trim().to_ascii_uppercase();
        if self.meme.contains(&symbol) {
            Category::Meme
        } else if self.crypto.contains(&symbol) {
            Category::Crypto
        } else {
            Category::Stock
        }
    }

    /// Every listed symbol, de-duplicated, in a stable order
    pub fn symbols(&self) -> Vec<String> {
        let all: BTreeSet<&String> = self.meme.iter().chain(&self.crypto).chain(&self.stocks).collect();
        all.into_iter().cloned().collect()
    }

    /// Listed symbols of one category
    pub fn symbols_in(&self, category: Category) -> Vec<String> {
        self.symbols()
            .into_iter()
            .filter(|s| self.classify(s) == category)
            .collect()
    }

    /// Whether no symbol is listed
    pub fn is_empty(&self) -> bool {
        self.meme.is_empty() && self.crypto.is_empty() && self.stocks.is_empty()
    }
}
