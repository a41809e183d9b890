//! Randomized cycle intervals and the background scheduler

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use tradefeed_scenario::WeightedTable;

use crate::engine::ActivityEngine;
use crate::error::{EngineError, EngineResult};

/// A weighted range of delays, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalBucket {
    pub weight: f64,
    pub min_secs: u64,
    pub max_secs: u64,
}

impl IntervalBucket {
    pub fn minutes(weight: f64, min: u64, max: u64) -> Self {
        Self {
            weight,
            min_secs: min * 60,
            max_secs: max * 60,
        }
    }
}

/// Default buckets: mostly short waits, occasionally long ones
pub fn default_buckets() -> Vec<IntervalBucket> {
    vec![
        IntervalBucket::minutes(0.6, 5, 20),
        IntervalBucket::minutes(0.3, 20, 60),
        IntervalBucket::minutes(0.1, 60, 120),
    ]
}

/// Draws the delay before the next cycle
#[derive(Debug, Clone)]
pub struct IntervalSchedule {
    table: WeightedTable<IntervalBucket>,
}

impl IntervalSchedule {
    pub fn new(buckets: Vec<IntervalBucket>) -> EngineResult<Self> {
        if let Some(bad) = buckets.iter().find(|b| b.min_secs > b.max_secs) {
            return Err(EngineError::Schedule(format!(
                "bucket {}..={}s is empty",
                bad.min_secs, bad.max_secs
            )));
        }
        let table = WeightedTable::new(buckets.into_iter().map(|b| (b.weight, b)).collect())?;
        Ok(Self { table })
    }

    /// Draw the next delay
    pub fn next_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let bucket = self.table.choose(rng);
        Duration::from_secs(rng.gen_range(bucket.min_secs..=bucket.max_secs))
    }

    pub fn buckets(&self) -> &[IntervalBucket] {
        self.table.options()
    }
}

/// Counters reported when the scheduler stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Cycles that persisted an event
    pub cycles: u64,
    /// Cycles abandoned on error
    pub failures: u64,
}

/// Run cycles on randomized intervals until `shutdown` flips to true (or its
/// sender is dropped).
///
/// Shutdown interrupts the wait; a cycle already in progress is finished
/// first. A failed cycle is logged and the loop carries on.
pub async fn run_scheduler(
    engine: Arc<ActivityEngine>,
    schedule: IntervalSchedule,
    mut shutdown: watch::Receiver<bool>,
) -> SchedulerStats {
    let mut stats = SchedulerStats::default();
    info!("Activity scheduler started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let delay = engine.next_delay(&schedule).await;
        debug!(delay_secs = delay.as_secs(), "Next cycle scheduled");

        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = tokio::time::sleep(delay) => {
                match engine.run_cycle().await {
                    Ok(_) => stats.cycles += 1,
                    Err(e) => {
                        stats.failures += 1;
                        warn!(error = %e, "Cycle abandoned");
                    }
                }
            }
        }
    }

    info!(cycles = stats.cycles, failures = stats.failures, "Activity scheduler stopped");
    stats
}
