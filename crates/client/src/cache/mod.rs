//! Local cache implementations.
//!
//! `MemoryLocalCache` lives for the process; `SqliteLocalCache` persists to a
//! file so the next run can start from the cached pages.

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

use std::sync::Arc;

use expensync_core::cache::{self, LocalCache};

pub use memory::MemoryLocalCache;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteLocalCache;

/// Open the local cache: persistent at `path` when given, in memory otherwise.
pub async fn open_local_cache(path: Option<&str>) -> cache::Result<Arc<dyn LocalCache>> {
    match path {
        #[cfg(feature = "sqlite")]
        Some(path) => {
            tracing::debug!(path, "Opening persistent local cache");
            Ok(Arc::new(SqliteLocalCache::new(path).await?))
        }
        #[cfg(not(feature = "sqlite"))]
        Some(path) => {
            tracing::warn!(path, "Built without sqlite, using in-memory cache");
            Ok(Arc::new(MemoryLocalCache::new()))
        }
        None => Ok(Arc::new(MemoryLocalCache::new())),
    }
}
