//! Store configuration

use serde::{Deserialize, Serialize};

/// URL that selects the in-process store instead of SQLite
pub const MEMORY_URL: &str = "memory://";

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// `memory://` or a SQLite URL such as `sqlite://tradefeed.db`
    pub database_url: String,
    /// Maximum pooled SQLite connections
    pub max_connections: u32,
    /// Connection acquire timeout in seconds
    pub acquire_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://tradefeed.db".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 30,
        }
    }
}

impl StoreConfig {
    /// Create config from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_url: std::env::var("TRADEFEED_DATABASE_URL").unwrap_or(defaults.database_url),
            max_connections: std::env::var("TRADEFEED_DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_connections),
            acquire_timeout_secs: std::env::var("TRADEFEED_DB_ACQUIRE_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.acquire_timeout_secs),
        }
    }

    /// In-process store config
    pub fn memory() -> Self {
        Self {
            database_url: MEMORY_URL.to_string(),
            ..Default::default()
        }
    }

    /// Whether this config selects the in-process store
    pub fn is_memory(&self) -> bool {
        self.database_url.starts_with("memory")
    }

    /// Whether this is a SQLite database that exists only in memory
    pub fn is_sqlite_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }

    /// Pool size to open; an in-memory SQLite database is per connection,
    /// so it gets exactly one
    pub fn pool_size(&self) -> u32 {
        if self.is_sqlite_in_memory() {
            1
        } else {
            self.max_connections.max(1)
        }
    }

    /// Database URL with credentials and query parameters hidden, for logs
    pub fn database_url_masked(&self) -> String {
        mask_url(&self.database_url)
    }
}

fn mask_url(url: &str) -> String {
    let (base, has_query) = match url.split_once('?') {
        Some((base, _)) => (base, true),
        None => (url, false),
    };
    let mut masked = base.to_string();
    if let (Some(scheme_end), Some(at_pos)) = (base.find("://"), base.rfind('@')) {
        if at_pos <= scheme_end + 3 {
            return if has_query { format!("{}?***", base) } else { masked };
        }
        let user_pass = &base[scheme_end + 3..at_pos];
        if let Some((user, _)) = user_pass.split_once(':') {
            masked = format!("{}{}:***{}", &base[..scheme_end + 3], user, &base[at_pos..]);
        }
    }
    if has_query {
        masked.push_str("?***");
    }
    masked
}
