//! Event log query parameters

use chrono::{DateTime, Utc};

use tradefeed_types::{Category, TraderId};

/// Filter for reading the event log.
///
/// Results are always returned newest first. `limit: None` means unbounded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventQuery {
    /// Asset class filter
    pub category: Option<Category>,
    /// Trader filter
    pub trader_id: Option<TraderId>,
    /// Only events at or after this time
    pub since: Option<DateTime<Utc>>,
    /// Maximum number of results
    pub limit: Option<usize>,
}

impl EventQuery {
    /// Query every event
    pub fn all() -> Self {
        Self::default()
    }

    /// Query events for one category
    pub fn for_category(category: Category) -> Self {
        Self {
            category: Some(category),
            ..Default::default()
        }
    }

    /// Query events for one trader
    pub fn for_trader(trader_id: TraderId) -> Self {
        Self {
            trader_id: Some(trader_id),
            ..Default::default()
        }
    }

    /// Set lower time bound
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    /// Set limit
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether an event passes the non-limit filters
    pub fn matches(&self, event: &tradefeed_types::TradeEvent) -> bool {
        if let Some(category) = self.category {
            if event.category != category {
                return false;
            }
        }
        if let Some(ref trader_id) = self.trader_id {
            if &event.trader_id != trader_id {
                return false;
            }
        }
        if let Some(since) = self.since {
            if event.timestamp < since {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder() {
        let now = Utc::now();
        let query = EventQuery::for_category(Category::Meme).since(now).with_limit(25);

        assert_eq!(query.category, Some(Category::Meme));
        assert_eq!(query.since, Some(now));
        assert_eq!(query.limit, Some(25));
        assert!(query.trader_id.is_none());
    }
}
