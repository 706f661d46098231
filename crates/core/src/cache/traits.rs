use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::storage::DateRange;
use crate::transaction::{ChangeEvent, Transaction, TransactionChange, TransactionId};

use super::{CacheMeta, CacheSnapshot, Result};

/// Trait for basic byte cache operations.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Gets a value from the cache by key.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Sets a value in the cache with an optional TTL.
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()>;

    /// Deletes a value from the cache by key.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Deletes all values matching a pattern (e.g., "transactions:page:*").
    async fn delete_pattern(&self, pattern: &str) -> Result<()>;
}

/// Ordered feed of changes to the transaction collection.
///
/// Implementations stamp each published change with the next sequence number
/// and keep a bounded history so reconnecting subscribers can catch up.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Publishes a change and returns it stamped with its sequence number.
    async fn publish(&self, change: TransactionChange) -> Result<ChangeEvent>;

    /// Subscribes to changes published from now on.
    async fn subscribe(&self) -> Result<broadcast::Receiver<ChangeEvent>>;

    /// Returns the retained events with a sequence number greater than `seq`.
    ///
    /// Returns `None` when some of those events are no longer retained.
    async fn events_since(&self, seq: u64) -> Result<Option<Vec<ChangeEvent>>>;

    /// Sequence number of the latest published change (0 if none).
    async fn latest_seq(&self) -> u64;

    /// Number of events currently retained for replay.
    async fn history_len(&self) -> usize;
}

/// Client-side cache of the transaction collection.
///
/// Keyed by transaction id with a secondary index by date, plus one metadata
/// record carrying the expiry timestamp and the pagination cursor.
#[async_trait]
pub trait LocalCache: Send + Sync {
    /// Loads every cached transaction (newest first) together with its
    /// metadata. Returns `None` when no metadata is stored. Freshness is
    /// the caller's decision, see [`is_fresh`](super::is_fresh).
    async fn load(&self) -> Result<Option<CacheSnapshot>>;

    /// Upserts a page of transactions and stamps the metadata with `meta`.
    async fn store_page(&self, transactions: &[Transaction], meta: &CacheMeta) -> Result<()>;

    /// Gets one cached transaction.
    async fn get(&self, id: &TransactionId) -> Result<Option<Transaction>>;

    /// Inserts or replaces one transaction. Does not touch the metadata.
    async fn put(&self, transaction: &Transaction) -> Result<()>;

    /// Deletes one transaction. Does not touch the metadata.
    async fn delete(&self, id: &TransactionId) -> Result<()>;

    /// Cached transactions within a date range, newest first.
    async fn range(&self, range: DateRange) -> Result<Vec<Transaction>>;

    /// Current metadata, if any.
    async fn meta(&self) -> Result<Option<CacheMeta>>;

    /// Drops all transactions and the metadata.
    async fn clear(&self) -> Result<()>;
}
