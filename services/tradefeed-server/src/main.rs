//! Tradefeed - synthetic trading activity and leaderboard daemon
//!
//! Seeds a trader roster, then keeps generating plausible trades on a
//! randomized schedule, folding them into the rankings cache and printing the
//! leaderboards periodically.
//!
//! # Quick Start
//!
//! ```bash
//! # In-process store, second-scale intervals
//! tradefeed --database-url memory:// --demo
//!
//! # Run 50 cycles right away, print the boards and exit
//! tradefeed --cycles 50 --seed 7
//!
//! # File-backed store
//! TRADEFEED_DATABASE_URL=sqlite://tradefeed.db tradefeed
//! ```

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tradefeed_aggregator::{render_rows, render_trending, LeaderboardAggregator, ViewMetric};
use tradefeed_engine::{
    default_buckets, run_scheduler, seed_roster, ActivityEngine, EngineConfig, IntervalBucket, IntervalSchedule,
    DEFAULT_ROSTER,
};
use tradefeed_rankings::{render_lines, LogSink, NotificationSink, RankingsCache, RankingsConfig};
use tradefeed_scenario::{ScenarioConfig, ScenarioGenerator, SymbolCatalog};
use tradefeed_store::{open_store, StoreConfig};
use tradefeed_types::{Category, SharedClock, SystemClock};

/// Tradefeed - synthetic trading activity and leaderboards
#[derive(Parser, Debug)]
#[command(
    name = "tradefeed",
    about = "Synthetic trading activity generator with cached leaderboards",
    version
)]
struct Args {
    /// Store URL (`memory://` or `sqlite://path.db`)
    #[arg(long, env = "TRADEFEED_DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum pooled SQLite connections
    #[arg(long, env = "TRADEFEED_DB_MAX_CONNECTIONS")]
    max_connections: Option<u32>,

    /// RNG seed for reproducible runs
    #[arg(long, env = "TRADEFEED_SEED")]
    seed: Option<u64>,

    /// Probability that a generated trade is a loss
    #[arg(long, env = "TRADEFEED_LOSS_PROBABILITY")]
    loss_probability: Option<f64>,

    /// Rankings snapshot lifetime in seconds
    #[arg(long, env = "TRADEFEED_RANKINGS_TTL_SECS")]
    rankings_ttl_secs: Option<i64>,

    /// Seconds between leaderboard prints
    #[arg(long, default_value = "3600", env = "TRADEFEED_PRINT_EVERY_SECS")]
    print_every_secs: u64,

    /// Use second-scale intervals instead of minutes
    #[arg(long, default_value = "false")]
    demo: bool,

    /// Run this many cycles immediately, print the leaderboards and exit
    #[arg(long)]
    cycles: Option<u32>,

    /// Do not announce winning trades
    #[arg(long, default_value = "false")]
    no_winners: bool,
}

impl Args {
    fn store_config(&self) -> StoreConfig {
        let mut config = StoreConfig::from_env();
        if let Some(url) = &self.database_url {
            config.database_url = url.clone();
        }
        if let Some(max) = self.max_connections {
            config.max_connections = max;
        }
        config
    }

    fn scenario_config(&self) -> ScenarioConfig {
        let mut config = ScenarioConfig::default();
        if let Some(p) = self.loss_probability {
            config.loss_probability = p;
        }
        config
    }

    fn rankings_config(&self) -> RankingsConfig {
        let config = RankingsConfig::from_env();
        match self.rankings_ttl_secs {
            Some(secs) if secs > 0 => config.with_ttl(chrono::Duration::seconds(secs)),
            _ => config,
        }
    }

    fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::from_env();
        if self.demo {
            config.intervals = demo_buckets();
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.no_winners {
            config.notify_winners = false;
        }
        config
    }
}

fn demo_buckets() -> Vec<IntervalBucket> {
    vec![
        IntervalBucket { weight: 0.6, min_secs: 2, max_secs: 5 },
        IntervalBucket { weight: 0.3, min_secs: 5, max_secs: 15 },
        IntervalBucket { weight: 0.1, min_secs: 15, max_secs: 30 },
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_logging();
    info!(version = env!("CARGO_PKG_VERSION"), "Starting Tradefeed");

    // Store and roster
    let store_config = args.store_config();
    let store = open_store(&store_config).await?;
    let seeded = seed_roster(store.as_ref(), DEFAULT_ROSTER).await?;
    if seeded == 0 {
        info!("Existing trader roster found");
    }

    // Engine wiring
    let engine_config = args.engine_config();
    let rng = match engine_config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let clock: SharedClock = Arc::new(SystemClock);
    let sink: Arc<dyn NotificationSink> = Arc::new(LogSink);
    let cache = Arc::new(RankingsCache::new(
        args.rankings_config(),
        store.clone(),
        sink.clone(),
        clock.clone(),
    ));
    let generator = ScenarioGenerator::new(args.scenario_config(), SymbolCatalog::default(), clock, rng)?;
    let schedule = IntervalSchedule::new(engine_config.intervals.clone())?;
    let engine = Arc::new(ActivityEngine::new(
        store.clone(),
        cache.clone(),
        sink,
        generator,
        engine_config,
    ));
    let aggregator = LeaderboardAggregator::new(store);

    if let Some(cycles) = args.cycles {
        cache.get().await?;
        for _ in 0..cycles {
            if let Err(e) = engine.run_cycle().await {
                warn!(error = %e, "Cycle abandoned");
            }
        }
        print_leaderboards(&cache, &aggregator).await;
        return Ok(());
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    let scheduler = tokio::spawn(run_scheduler(engine.clone(), schedule, stop_rx.clone()));
    let printer = tokio::spawn(print_loop(
        cache.clone(),
        aggregator,
        Duration::from_secs(args.print_every_secs.max(1)),
        stop_rx,
    ));

    shutdown_signal().await;
    stop_tx.send(true)?;

    let stats = scheduler.await?;
    printer.await?;
    info!(cycles = stats.cycles, failures = stats.failures, "Tradefeed shutdown complete");

    Ok(())
}

/// Initialize tracing from `RUST_LOG`, defaulting to `info`
fn init_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

async fn print_loop(
    cache: Arc<RankingsCache>,
    aggregator: LeaderboardAggregator,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(every);
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => print_leaderboards(&cache, &aggregator).await,
        }
    }
}

async fn print_leaderboards(cache: &RankingsCache, aggregator: &LeaderboardAggregator) {
    match cache.get().await {
        Ok(snapshot) => print_section("Top traders", render_lines(&snapshot)),
        Err(e) => warn!(error = %e, "Failed to load rankings"),
    }

    for category in Category::ALL {
        match aggregator.by_asset_category(category).await {
            Ok(rows) => print_section(&format!("Top {} traders", category), render_rows(&rows, ViewMetric::Profit)),
            Err(e) => warn!(%category, error = %e, "Failed to load category view"),
        }
    }

    match aggregator.by_roi().await {
        Ok(rows) => print_section("Best ROI", render_rows(&rows, ViewMetric::Roi)),
        Err(e) => warn!(error = %e, "Failed to load ROI view"),
    }

    match aggregator.trending_symbols().await {
        Ok(symbols) => print_section("Trending", render_trending(&symbols)),
        Err(e) => warn!(error = %e, "Failed to load trending symbols"),
    }
}

fn print_section(title: &str, lines: Vec<String>) {
    println!("\n== {} ==", title);
    for line in lines {
        println!("{}", line);
    }
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, stopping scheduler"),
        _ = terminate => info!("Received SIGTERM, stopping scheduler"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from(["tradefeed", "--database-url", "memory://", "--cycles", "5", "--seed", "9"]);
        assert_eq!(args.cycles, Some(5));
        assert!(args.store_config().is_memory());
        assert_eq!(args.engine_config().seed, Some(9));
        assert!(args.engine_config().notify_winners);
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from([
            "tradefeed",
            "--loss-probability",
            "0.2",
            "--rankings-ttl-secs",
            "60",
            "--demo",
            "--no-winners",
        ]);
        assert_eq!(args.scenario_config().loss_probability, 0.2);
        assert_eq!(args.rankings_config().ttl, chrono::Duration::seconds(60));
        assert_eq!(args.engine_config().intervals, demo_buckets());
        assert!(!args.engine_config().notify_winners);
    }

    #[test]
    fn test_default_intervals() {
        let args = Args::parse_from(["tradefeed"]);
        let config = args.engine_config();
        assert_eq!(config.intervals.len(), default_buckets().len());
        assert!(IntervalSchedule::new(demo_buckets()).is_ok());
    }
}
