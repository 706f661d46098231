//! Shared application state.
//!
//! Handlers see storage only through trait objects; the concrete backend
//! combination is picked at compile time by the factory modules below.

use std::sync::Arc;

use tokio::sync::broadcast;

use expensync_core::cache::ChangeFeed;
use expensync_core::storage::TransactionRepository;

use crate::config::Config;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Transaction repository (cached, wraps underlying storage).
    pub transaction_repo: Arc<dyn TransactionRepository>,
    /// Change feed the SSE endpoint streams from.
    pub change_feed: Arc<dyn ChangeFeed>,
    /// Shutdown signal sender for SSE connections.
    pub shutdown_tx: broadcast::Sender<()>,
    /// Page size for listings without an explicit `limit`.
    pub default_page_size: usize,
}

impl AppState {
    fn build(
        transaction_repo: Arc<dyn TransactionRepository>,
        change_feed: Arc<dyn ChangeFeed>,
        config: &Config,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            transaction_repo,
            change_feed,
            shutdown_tx,
            default_page_size: config.default_page_size,
        }
    }

    /// Subscribe to shutdown signal.
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signal all SSE connections to shut down.
    pub fn signal_shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

#[cfg(feature = "sqlite")]
mod sqlite_memory {
    use super::*;
    use crate::cache::{MemoryCache, MemoryChangeFeed};
    use crate::storage::{CachedTransactionRepository, SqliteRepository};

    impl AppState {
        /// Creates AppState with SQLite storage and in-memory cache.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let sqlite_repo = Arc::new(SqliteRepository::new(&config.sqlite_path).await?);
            let memory_cache = Arc::new(MemoryCache::new(config.cache_max_entries));
            let change_feed = Arc::new(MemoryChangeFeed::new(config.event_history_max_size));

            let cached_repo = Arc::new(CachedTransactionRepository::new(
                sqlite_repo,
                memory_cache,
                change_feed.clone(),
                config.cache_ttl(),
            ));

            Ok(Self::build(cached_repo, change_feed, config))
        }
    }
}

#[cfg(feature = "inmemory")]
mod inmemory_memory {
    use super::*;
    use crate::cache::{MemoryCache, MemoryChangeFeed};
    use crate::storage::{CachedTransactionRepository, InMemoryRepository};

    impl AppState {
        /// Creates AppState with in-memory storage and cache.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let inmemory_repo = Arc::new(InMemoryRepository::new());
            let memory_cache = Arc::new(MemoryCache::new(config.cache_max_entries));
            let change_feed = Arc::new(MemoryChangeFeed::new(config.event_history_max_size));

            let cached_repo = Arc::new(CachedTransactionRepository::new(
                inmemory_repo,
                memory_cache,
                change_feed.clone(),
                config.cache_ttl(),
            ));

            Ok(Self::build(cached_repo, change_feed, config))
        }
    }
}
