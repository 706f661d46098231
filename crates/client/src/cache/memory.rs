//! In-memory local cache.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use expensync_core::cache::{CacheMeta, CacheSnapshot, LocalCache, Result};
use expensync_core::storage::DateRange;
use expensync_core::transaction::{Transaction, TransactionId};

#[derive(Default)]
struct Inner {
    by_id: HashMap<TransactionId, Transaction>,
    by_date: BTreeSet<(NaiveDate, TransactionId)>,
    meta: Option<CacheMeta>,
}

impl Inner {
    fn put(&mut self, transaction: &Transaction) {
        if let Some(old) = self.by_id.insert(transaction.id.clone(), transaction.clone()) {
            self.by_date.remove(&(old.date, old.id));
        }
        self.by_date
            .insert((transaction.date, transaction.id.clone()));
    }

    fn delete(&mut self, id: &TransactionId) {
        if let Some(old) = self.by_id.remove(id) {
            self.by_date.remove(&(old.date, old.id));
        }
    }

    /// Newest first: the date index walked backwards.
    fn newest_first<'a>(
        &'a self,
        keys: impl DoubleEndedIterator<Item = &'a (NaiveDate, TransactionId)>,
    ) -> Vec<Transaction> {
        keys.rev()
            .filter_map(|(_, id)| self.by_id.get(id).cloned())
            .collect()
    }
}

/// Local cache held in process memory.
#[derive(Default)]
pub struct MemoryLocalCache {
    inner: RwLock<Inner>,
}

impl MemoryLocalCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalCache for MemoryLocalCache {
    async fn load(&self) -> Result<Option<CacheSnapshot>> {
        let inner = self.inner.read().await;
        let Some(meta) = inner.meta.clone() else {
            return Ok(None);
        };
        Ok(Some(CacheSnapshot {
            transactions: inner.newest_first(inner.by_date.iter()),
            meta,
        }))
    }

    async fn store_page(&self, transactions: &[Transaction], meta: &CacheMeta) -> Result<()> {
        let mut inner = self.inner.write().await;
        for transaction in transactions {
            inner.put(transaction);
        }
        inner.meta = Some(meta.clone());
        Ok(())
    }

    async fn get(&self, id: &TransactionId) -> Result<Option<Transaction>> {
        Ok(self.inner.read().await.by_id.get(id).cloned())
    }

    async fn put(&self, transaction: &Transaction) -> Result<()> {
        self.inner.write().await.put(transaction);
        Ok(())
    }

    async fn delete(&self, id: &TransactionId) -> Result<()> {
        self.inner.write().await.delete(id);
        Ok(())
    }

    async fn range(&self, range: DateRange) -> Result<Vec<Transaction>> {
        let inner = self.inner.read().await;
        let keys = inner
            .by_date
            .iter()
            .filter(|(date, _)| range.contains(*date));
        Ok(inner.newest_first(keys))
    }

    async fn meta(&self) -> Result<Option<CacheMeta>> {
        Ok(self.inner.read().await.meta.clone())
    }

    async fn clear(&self) -> Result<()> {
        *self.inner.write().await = Inner::default();
        Ok(())
    }
}
