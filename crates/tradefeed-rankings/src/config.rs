//! Rankings cache configuration

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Default number of rows kept in the snapshot
pub const DEFAULT_CAPACITY: usize = 20;

/// Default snapshot lifetime in hours
pub const DEFAULT_TTL_HOURS: i64 = 5;

/// Rankings cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingsConfig {
    /// Snapshot age at which the next read rebuilds
    #[serde(with = "tradefeed_types::duration_secs")]
    pub ttl: Duration,
    /// Maximum rows in the snapshot
    pub capacity: usize,
    /// Label of the trader population the snapshot covers
    pub scope: String,
}

impl Default for RankingsConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::hours(DEFAULT_TTL_HOURS),
            capacity: DEFAULT_CAPACITY,
            scope: "global".to_string(),
        }
    }
}

impl RankingsConfig {
    /// Read `TRADEFEED_RANKINGS_TTL_SECS` and `TRADEFEED_RANKINGS_CAPACITY`,
    /// falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ttl: std::env::var("TRADEFEED_RANKINGS_TTL_SECS")
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::seconds)
                .unwrap_or(defaults.ttl),
            capacity: std::env::var("TRADEFEED_RANKINGS_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|cap| *cap > 0)
                .unwrap_or(defaults.capacity),
            scope: defaults.scope,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

