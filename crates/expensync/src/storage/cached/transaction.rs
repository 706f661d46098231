use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use expensync_core::cache::{
    deserialize_page, deserialize_transaction, serialize_page, serialize_transaction,
    transaction_key, transaction_page_key, transaction_pages_pattern, Cache, ChangeFeed,
};
use expensync_core::storage::{Page, PageQuery, Result, TransactionRepository};
use expensync_core::transaction::{Transaction, TransactionChange, TransactionId};

/// Cached transaction repository decorator.
///
/// Writes are serialized so the feed publishes changes in the order they were
/// persisted. Reads only fill the cache when no write landed while they were
/// reading the underlying store.
///
/// # Type Parameters
///
/// * `R` - The underlying repository implementation
/// * `C` - The cache implementation
/// * `F` - The change feed realtime subscribers listen on
pub struct CachedTransactionRepository<R, C, F>
where
    R: TransactionRepository,
    C: Cache,
    F: ChangeFeed,
{
    repository: Arc<R>,
    cache: Arc<C>,
    feed: Arc<F>,
    ttl: Duration,
    /// Held from persisting a write until its change is published.
    write_lock: Mutex<()>,
    /// Bumped by every successful write before it invalidates.
    write_version: AtomicU64,
}

impl<R, C, F> CachedTransactionRepository<R, C, F>
where
    R: TransactionRepository,
    C: Cache,
    F: ChangeFeed,
{
    pub fn new(repository: Arc<R>, cache: Arc<C>, feed: Arc<F>, ttl: Duration) -> Self {
        Self {
            repository,
            cache,
            feed,
            ttl,
            write_lock: Mutex::new(()),
            write_version: AtomicU64::new(0),
        }
    }

    /// Caches a value read at `version`, unless a write has landed since.
    async fn fill(&self, key: &str, bytes: &[u8], version: u64) {
        if self.write_version.load(Ordering::Acquire) != version {
            tracing::trace!(key = %key, "Skipping cache fill after concurrent write");
            return;
        }
        if let Err(err) = self.cache.set(key, bytes, Some(self.ttl)).await {
            tracing::warn!(key = %key, error = %err, "Failed to fill cache");
            return;
        }
        // A write may have invalidated between the check and the set.
        if self.write_version.load(Ordering::Acquire) != version {
            if let Err(err) = self.cache.delete(key).await {
                tracing::warn!(key = %key, error = %err, "Failed to drop stale cache fill");
            }
        }
    }

    /// Invalidates and publishes after a persisted write. Callers hold
    /// `write_lock`.
    async fn finish_write(&self, id: &TransactionId, change: TransactionChange) {
        self.write_version.fetch_add(1, Ordering::AcqRel);
        self.invalidate(id).await;
        self.publish(change).await;
    }

    /// Drops the cached document and every cached listing page.
    async fn invalidate(&self, id: &TransactionId) {
        if let Err(err) = self.cache.delete(&transaction_key(id)).await {
            tracing::warn!(transaction_id = %id, error = %err, "Failed to invalidate transaction cache");
        }
        if let Err(err) = self.cache.delete_pattern(transaction_pages_pattern()).await {
            tracing::warn!(error = %err, "Failed to invalidate transaction pages cache");
        }
    }

    async fn publish(&self, change: TransactionChange) {
        let id = change.transaction_id().clone();
        let name = change.event_name();
        match self.feed.publish(change).await {
            Ok(event) => {
                tracing::debug!(transaction_id = %id, seq = event.seq, event = name, "Change published");
            }
            Err(err) => {
                tracing::warn!(transaction_id = %id, event = name, error = %err, "Failed to publish change");
            }
        }
    }
}

#[async_trait]
impl<R, C, F> TransactionRepository for CachedTransactionRepository<R, C, F>
where
    R: TransactionRepository + 'static,
    C: Cache + 'static,
    F: ChangeFeed + 'static,
{
    async fn get_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>> {
        let cache_key = transaction_key(id);

        if let Ok(Some(bytes)) = self.cache.get(&cache_key).await {
            if let Ok(transaction) = deserialize_transaction(&bytes) {
                tracing::trace!(transaction_id = %id, "Cache hit for transaction");
                return Ok(Some(transaction));
            }
            tracing::warn!(transaction_id = %id, "Cached transaction deserialization failed");
        }

        tracing::trace!(transaction_id = %id, "Cache miss for transaction");
        let version = self.write_version.load(Ordering::Acquire);
        let transaction = self.repository.get_transaction(id).await?;

        if let Some(ref t) = transaction {
            if let Ok(bytes) = serialize_transaction(t) {
                self.fill(&cache_key, &bytes, version).await;
            }
        }

        Ok(transaction)
    }

    async fn list_transactions(&self, query: &PageQuery) -> Result<Page> {
        let cache_key = transaction_page_key(query);

        if let Ok(Some(bytes)) = self.cache.get(&cache_key).await {
            if let Ok(page) = deserialize_page(&bytes) {
                tracing::trace!(key = %cache_key, count = page.items.len(), "Cache hit for page");
                return Ok(page);
            }
            tracing::warn!(key = %cache_key, "Cached page deserialization failed");
        }

        tracing::trace!(key = %cache_key, "Cache miss for page");
        let version = self.write_version.load(Ordering::Acquire);
        let page = self.repository.list_transactions(query).await?;

        if let Ok(bytes) = serialize_page(&page) {
            self.fill(&cache_key, &bytes, version).await;
        }

        Ok(page)
    }

    async fn create_transaction(&self, transaction: &Transaction) -> Result<()> {
        let _write = self.write_lock.lock().await;
        self.repository.create_transaction(transaction).await?;
        self.finish_write(
            &transaction.id,
            TransactionChange::Added {
                transaction: transaction.clone(),
            },
        )
        .await;
        Ok(())
    }

    async fn update_transaction(&self, transaction: &Transaction) -> Result<()> {
        let _write = self.write_lock.lock().await;
        self.repository.update_transaction(transaction).await?;
        self.finish_write(
            &transaction.id,
            TransactionChange::Modified {
                transaction: transaction.clone(),
            },
        )
        .await;
        Ok(())
    }

    async fn delete_transaction(&self, id: &TransactionId) -> Result<()> {
        let _write = self.write_lock.lock().await;
        self.repository.delete_transaction(id).await?;
        self.finish_write(id, TransactionChange::Removed { id: id.clone() })
            .await;
        Ok(())
    }
}
