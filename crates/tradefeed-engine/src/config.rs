//! Engine configuration

use serde::{Deserialize, Serialize};

use crate::schedule::{default_buckets, IntervalBucket};

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Delay buckets between cycles
    pub intervals: Vec<IntervalBucket>,
    /// Announce every winning trade to the sink
    pub notify_winners: bool,
    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            intervals: default_buckets(),
            notify_winners: true,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Read `TRADEFEED_NOTIFY_WINNERS` and `TRADEFEED_SEED`, falling back to
    /// defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            intervals: defaults.intervals,
            notify_winners: std::env::var("TRADEFEED_NOTIFY_WINNERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.notify_winners),
            seed: std::env::var("TRADEFEED_SEED").ok().and_then(|s| s.parse().ok()),
        }
    }
}
