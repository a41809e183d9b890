//! Tradefeed Rankings - bounded top-K leaderboard cache
//!
//! # Features
//!
//! - **TTL snapshot**: rebuilt from the trader store on first read and
//!   whenever older than the configured TTL (5 hours by default)
//! - **In-place patching**: single trade updates are folded into a fresh
//!   snapshot without advancing its build time
//! - **Breakout alerts**: a trader who passes the lowest row is announced
//!   through a `NotificationSink`
//! - **Rendering**: medal markers, currency formatting, level badges and
//!   streak annotations
//!
//! # Example
//!
//! ```ignore
//! use tradefeed_rankings::{RankingsCache, RankingsConfig, LogSink, render_lines};
//!
//! let cache = RankingsCache::new(RankingsConfig::default(), store, Arc::new(LogSink), clock);
//! let snapshot = cache.get().await?;
//! for line in render_lines(&snapshot) {
//!     println!("{}", line);
//! }
//! ```

pub mod cache;
pub mod config;
pub mod notify;
pub mod render;

pub use cache::{CacheSnapshot, CacheState, PatchOutcome, RankingRow, RankingsCache};
pub use config::RankingsConfig;
pub use notify::{
    InMemorySink, LogSink, Notification, NotificationKind, NotificationSink, NotifyError, NotifyResult,
};
pub use render::{level_badge, ranked_rows, render_line, render_lines, render_row, RankMarker, EMPTY_PLACEHOLDER};
