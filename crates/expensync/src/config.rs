use std::{env, time::Duration};

use expensync_core::storage::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache TTL in seconds (default: 300)
    pub cache_ttl_seconds: u64,
    /// Maximum number of cache entries (default: 10,000)
    pub cache_max_entries: usize,
    /// Maximum number of change events kept for SSE replay (default: 1,000)
    pub event_history_max_size: usize,
    /// Path to SQLite database file (default: "expensync.db")
    /// Note: Only used when the `sqlite` feature is enabled.
    #[allow(dead_code)]
    pub sqlite_path: String,
    /// Page size when a listing request has no `limit` (default: 50)
    pub default_page_size: usize,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CACHE_TTL_SECONDS` - Cache TTL in seconds (default: 300)
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 10,000)
    /// - `EVENT_HISTORY_MAX_SIZE` - SSE replay history size (default: 1,000)
    /// - `SQLITE_PATH` - SQLite database path (default: "expensync.db")
    /// - `DEFAULT_PAGE_SIZE` - Listing page size, clamped to 1..=500 (default: 50)
    pub fn from_env() -> Self {
        Self {
            cache_ttl_seconds: env_or("CACHE_TTL_SECONDS", 300),
            cache_max_entries: env_or("CACHE_MAX_ENTRIES", 10_000),
            event_history_max_size: env_or("EVENT_HISTORY_MAX_SIZE", 1_000),
            sqlite_path: env::var("SQLITE_PATH").unwrap_or_else(|_| "expensync.db".to_string()),
            default_page_size: env_or("DEFAULT_PAGE_SIZE", DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Get cache TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_ttl_conversion() {
        let config = Config {
            cache_ttl_seconds: 600,
            cache_max_entries: 10_000,
            event_history_max_size: 1_000,
            sqlite_path: "test.db".to_string(),
            default_page_size: 50,
        };

        assert_eq!(config.cache_ttl(), Duration::from_secs(600));
    }

    #[test]
    fn test_default_values() {
        env::remove_var("CACHE_TTL_SECONDS");
        env::remove_var("CACHE_MAX_ENTRIES");
        env::remove_var("EVENT_HISTORY_MAX_SIZE");
        env::remove_var("SQLITE_PATH");
        env::remove_var("DEFAULT_PAGE_SIZE");

        let config = Config::from_env();

        assert_eq!(config.cache_ttl_seconds, 300);
        assert_eq!(config.cache_max_entries, 10_000);
        assert_eq!(config.event_history_max_size, 1_000);
        assert_eq!(config.sqlite_path, "expensync.db");
        assert_eq!(config.default_page_size, 50);
    }

    #[test]
    fn test_unparseable_value_falls_back() {
        assert_eq!(env_or("EXPENSYNC_TEST_UNSET_VARIABLE", 7usize), 7);
    }
}
