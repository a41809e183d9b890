//! Tradefeed Engine - synthetic activity orchestration
//!
//! Wires the scenario generator, the store, the rankings cache and the
//! notification sink into a single serialized cycle, and runs that cycle on a
//! randomized, cancellable schedule.
//!
//! # Example
//!
//! ```ignore
//! use tradefeed_engine::{default_buckets, run_scheduler, ActivityEngine, EngineConfig, IntervalSchedule};
//!
//! let engine = Arc::new(ActivityEngine::new(store, cache, sink, generator, EngineConfig::default()));
//! let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
//! let handle = tokio::spawn(run_scheduler(engine, IntervalSchedule::new(default_buckets())?, stop_rx));
//! // ...
//! stop_tx.send(true)?;
//! handle.await?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod roster;
pub mod schedule;

pub use config::EngineConfig;
pub use engine::{ActivityEngine, CycleReport};
pub use error::{EngineError, EngineResult};
pub use roster::{seed_roster, DEFAULT_ROSTER};
pub use schedule::{default_buckets, run_scheduler, IntervalBucket, IntervalSchedule, SchedulerStats};
