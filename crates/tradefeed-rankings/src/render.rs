//! Text rendering of ranking views

use std::fmt;

use rust_decimal::Decimal;

use tradefeed_types::{format_currency, TraderLevel};

use crate::cache::{CacheSnapshot, RankingRow};

/// Line shown in place of an empty view
pub const EMPTY_PLACEHOLDER: &str = "Nothing here yet, check back soon";

/// Minimum streak that earns the fire annotation
pub const HOT_STREAK: u32 = 3;

/// Rank marker: medals for the podium, numbers below it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankMarker {
    Gold,
    Silver,
    Bronze,
    Numbered(usize),
}

impl RankMarker {
    /// Marker for a 1-based rank
    pub fn for_rank(rank: usize) -> Self {
        match rank {
            1 => Self::Gold,
            2 => Self::Silver,
            3 => Self::Bronze,
            n => Self::Numbered(n),
        }
    }
}

impl fmt::Display for RankMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gold => f.write_str("🥇"),
            Self::Silver => f.write_str("🥈"),
            Self::Bronze => f.write_str("🥉"),
            Self::Numbered(n) => write!(f, "{}.", n),
        }
    }
}

/// Badge for a level tier
pub fn level_badge(level: TraderLevel) -> &'static str {
    match level {
        TraderLevel::Rookie => "🌱",
        TraderLevel::Pro => "⭐",
        TraderLevel::Whale => "🐋",
        TraderLevel::Legend => "👑",
    }
}

/// Streak annotation, empty below [`HOT_STREAK`]
pub fn streak_annotation(streak: u32) -> String {
    if streak >= HOT_STREAK {
        format!(" 🔥{}", streak)
    } else {
        String::new()
    }
}

/// Rows paired with their markers, in rank order
pub fn ranked_rows(snapshot: &CacheSnapshot) -> Vec<(RankMarker, &RankingRow)> {
    snapshot
        .entries
        .iter()
        .enumerate()
        .map(|(i, row)| (RankMarker::for_rank(i + 1), row))
        .collect()
}

/// Render a generic ranked line
pub fn render_line(marker: RankMarker, name: &str, amount: Decimal, suffix: &str) -> String {
    format!("{} {} {}{}", marker, name, format_currency(amount), suffix)
}

/// Render one ranking row
pub fn render_row(marker: RankMarker, row: &RankingRow) -> String {
    let suffix = format!(" {}{}", level_badge(row.level), streak_annotation(row.win_streak));
    render_line(marker, &row.display_name, row.total_profit, &suffix)
}

/// Render the whole snapshot, or the placeholder when it has no rows
pub fn render_lines(snapshot: &CacheSnapshot) -> Vec<String> {
    if snapshot.is_empty() {
        return vec![EMPTY_PLACEHOLDER.to_string()];
    }
    ranked_rows(snapshot)
        .into_iter()
        .map(|(marker, row)| render_row(marker, row))
        .collect()
}
