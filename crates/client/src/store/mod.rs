//! Reactive transaction store.
//!
//! [`TransactionStore`] owns the list shown to the user. It is filled from the
//! local cache when that is fresh and from the remote store otherwise, patched
//! by optimistic writes and by the realtime change feed, and published through
//! a `watch` channel so every subscriber sees the same sorted, duplicate-free
//! list.

mod error;
mod realtime;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{watch, Mutex};

use expensync_core::cache::{is_fresh, CacheMeta, CacheSnapshot, LocalCache, DEFAULT_LOCAL_CACHE_TTL};
use expensync_core::storage::{
    DateRange, Page, PageCursor, PageQuery, TransactionRepository, DEFAULT_PAGE_SIZE,
};
use expensync_core::transaction::{
    self as ops, merge_page, remove_by_id, sort_newest_first, upsert_sorted, validate_transaction,
    Summary, Transaction, TransactionDraft, TransactionError, TransactionId, TransactionKind,
    UpsertOutcome,
};

pub use error::{Result, StoreError};

/// Tunables of the store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Transactions fetched per remote page.
    pub page_size: usize,
    /// How long the local cache is served without asking the remote store.
    pub cache_ttl: Duration,
    /// Wait between realtime reconnection attempts.
    pub reconnect_delay: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            cache_ttl: DEFAULT_LOCAL_CACHE_TTL,
            reconnect_delay: Duration::from_secs(3),
        }
    }
}

/// State published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSnapshot {
    /// Newest first, unique by id.
    pub transactions: Vec<Transaction>,
    pub is_loading_more: bool,
    pub has_more: bool,
    pub is_initial_data_loaded: bool,
    pub is_refreshing: bool,
    /// Change feed position the list reflects: the last applied realtime
    /// event, or the position a loaded page was taken at.
    pub last_seq: Option<u64>,
    /// Position after the last page fetched from the remote store.
    pub cursor: Option<PageCursor>,
}

impl Default for StoreSnapshot {
    fn default() -> Self {
        Self {
            transactions: Vec::new(),
            is_loading_more: false,
            has_more: true,
            is_initial_data_loaded: false,
            is_refreshing: false,
            last_seq: None,
            cursor: None,
        }
    }
}

/// Clears a busy flag when dropped.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    /// Sets the flag, or returns `None` if it was already set.
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Reactive list of transactions backed by a remote store and a local cache.
pub struct TransactionStore {
    remote: Arc<dyn TransactionRepository>,
    cache: Arc<dyn LocalCache>,
    config: StoreConfig,
    state: watch::Sender<StoreSnapshot>,
    /// Held by whichever page load is running.
    load_gate: Mutex<()>,
    /// Bumped when the list is reset; loads started before a bump are dropped.
    generation: AtomicU64,
    refreshing: AtomicBool,
}

impl TransactionStore {
    pub fn new(
        remote: Arc<dyn TransactionRepository>,
        cache: Arc<dyn LocalCache>,
        config: StoreConfig,
    ) -> Self {
        let (state, _) = watch::channel(StoreSnapshot::default());
        Self {
            remote,
            cache,
            config,
            state,
            load_gate: Mutex::new(()),
            generation: AtomicU64::new(0),
            refreshing: AtomicBool::new(false),
        }
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.state.subscribe()
    }

    /// Current state.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.state.borrow().clone()
    }

    /// Current transactions, newest first.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.state.borrow().transactions.clone()
    }

    fn update_state(&self, f: impl FnOnce(&mut StoreSnapshot)) {
        self.state.send_modify(f);
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    // ---- local cache, failures logged and skipped ----

    async fn cache_load(&self) -> Option<CacheSnapshot> {
        match self.cache.load().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to read local cache");
                None
            }
        }
    }

    async fn cache_store_page(&self, page: &Page, feed_seq: Option<u64>) {
        let meta = CacheMeta::new(Utc::now(), page.next_cursor.clone(), page.has_more())
            .with_feed_seq(feed_seq);
        if let Err(err) = self.cache.store_page(&page.items, &meta).await {
            tracing::warn!(count = page.items.len(), error = %err, "Failed to cache page");
        }
    }

    async fn cache_put(&self, transaction: &Transaction) {
        if let Err(err) = self.cache.put(transaction).await {
            tracing::warn!(transaction_id = %transaction.id, error = %err, "Failed to cache transaction");
        }
    }

    async fn cache_delete(&self, id: &TransactionId) {
        if let Err(err) = self.cache.delete(id).await {
            tracing::warn!(transaction_id = %id, error = %err, "Failed to evict transaction from cache");
        }
    }

    async fn cache_clear(&self) {
        if let Err(err) = self.cache.clear().await {
            tracing::warn!(error = %err, "Failed to clear local cache");
        }
    }

    fn show_cached(&self, snapshot: CacheSnapshot, generation: u64) {
        let CacheSnapshot {
            mut transactions,
            meta,
        } = snapshot;
        sort_newest_first(&mut transactions);
        self.state.send_if_modified(|s| {
            if !self.is_current(generation) {
                return false;
            }
            s.transactions = transactions;
            s.cursor = meta.cursor;
            s.has_more = meta.has_more;
            s.last_seq = meta.feed_seq;
            s.is_loading_more = false;
            s.is_initial_data_loaded = true;
            true
        });
    }

    /// A cache is served without asking the remote store only while fresh,
    /// and only if it knows where to resume the change feed.
    fn is_servable(&self, meta: &CacheMeta) -> bool {
        meta.feed_seq.is_some() && is_fresh(Some(meta), Utc::now(), self.config.cache_ttl)
    }

    // ---- loading ----

    /// Load the first page: from the local cache when fresh, remotely otherwise.
    ///
    /// Ignored while another load is running. When the remote store fails and
    /// a stale cache exists, the stale cache is shown instead.
    pub async fn load_first_page(&self) -> Result<()> {
        let Ok(_gate) = self.load_gate.try_lock() else {
            tracing::debug!("Load already in progress, skipping");
            return Ok(());
        };
        self.load_first_page_locked(true).await
    }

    /// First-page load for a caller holding `load_gate`.
    async fn load_first_page_locked(&self, use_cache: bool) -> Result<()> {
        let generation = self.generation.load(Ordering::Acquire);
        self.update_state(|s| s.is_loading_more = true);

        let cached = if use_cache { self.cache_load().await } else { None };
        if let Some(snapshot) = cached.as_ref() {
            if self.is_servable(&snapshot.meta) {
                tracing::debug!(count = snapshot.transactions.len(), "Serving fresh local cache");
                self.show_cached(snapshot.clone(), generation);
                return Ok(());
            }
        }

        match self
            .remote
            .list_transactions(&PageQuery::first(self.config.page_size))
            .await
        {
            Ok(page) => {
                if !self.is_current(generation) {
                    tracing::debug!("List was reset during load, dropping first page");
                    return Ok(());
                }
                tracing::info!(
                    count = page.items.len(),
                    has_more = page.has_more(),
                    feed_seq = ?page.feed_seq,
                    "Loaded first page"
                );
                self.cache_clear().await;
                self.cache_store_page(&page, page.feed_seq).await;

                let Page {
                    mut items,
                    next_cursor,
                    feed_seq,
                } = page;
                sort_newest_first(&mut items);
                self.state.send_if_modified(|s| {
                    if !self.is_current(generation) {
                        return false;
                    }
                    s.has_more = next_cursor.is_some();
                    s.cursor = next_cursor;
                    s.transactions = items;
                    if feed_seq.is_some() {
                        s.last_seq = feed_seq;
                    }
                    s.is_loading_more = false;
                    s.is_initial_data_loaded = true;
                    true
                });
                Ok(())
            }
            Err(err) => match cached {
                Some(snapshot) => {
                    tracing::warn!(error = %err, "Remote unavailable, serving stale cache");
                    self.show_cached(snapshot, generation);
                    Ok(())
                }
                None => {
                    tracing::error!(error = %err, "Failed to load first page");
                    self.update_state(|s| {
                        s.is_loading_more = false;
                        s.is_initial_data_loaded = true;
                    });
                    Err(err.into())
                }
            },
        }
    }

    /// Fetch the page after the current cursor and merge it in.
    ///
    /// No-op when there is nothing more to load or a load is running. A page
    /// that arrives after a refresh reset the list is dropped.
    pub async fn load_more(&self) -> Result<()> {
        let (has_more, cursor) = {
            let state = self.state.borrow();
            let cursor = state
                .cursor
                .clone()
                .or_else(|| state.transactions.last().map(PageCursor::at));
            (state.has_more, cursor)
        };
        if !has_more {
            return Ok(());
        }
        let Ok(_gate) = self.load_gate.try_lock() else {
            return Ok(());
        };
        let generation = self.generation.load(Ordering::Acquire);
        self.update_state(|s| s.is_loading_more = true);

        let query = match cursor {
            Some(cursor) => PageQuery::after(self.config.page_size, cursor),
            None => PageQuery::first(self.config.page_size),
        };

        match self.remote.list_transactions(&query).await {
            Ok(page) => {
                if !self.is_current(generation) {
                    tracing::debug!("List was reset during load, dropping page");
                    return Ok(());
                }
                let feed_seq = self.state.borrow().last_seq;
                self.cache_store_page(&page, feed_seq).await;

                let Page {
                    items, next_cursor, ..
                } = page;
                let mut added = None;
                self.state.send_if_modified(|s| {
                    if !self.is_current(generation) {
                        return false;
                    }
                    added = Some(merge_page(&mut s.transactions, items));
                    s.has_more = next_cursor.is_some();
                    s.cursor = next_cursor;
                    s.is_loading_more = false;
                    true
                });
                tracing::debug!(?added, "Loaded next page");
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to load next page");
                if self.is_current(generation) {
                    self.update_state(|s| s.is_loading_more = false);
                }
                Err(err.into())
            }
        }
    }

    /// Drop the local cache and all state, then load the first page again.
    ///
    /// Ignored while a refresh is running. A page load already in flight is
    /// waited for and its result discarded.
    pub async fn force_refresh(&self) -> Result<()> {
        let Some(_busy) = BusyGuard::try_acquire(&self.refreshing) else {
            tracing::debug!("Refresh already in progress, skipping");
            return Ok(());
        };
        tracing::info!("Refreshing transactions");

        self.update_state(|s| {
            self.generation.fetch_add(1, Ordering::AcqRel);
            s.is_refreshing = true;
            s.transactions.clear();
            s.cursor = None;
            s.has_more = true;
            s.is_initial_data_loaded = false;
            s.last_seq = None;
        });

        let _gate = self.load_gate.lock().await;
        self.cache_clear().await;
        let result = self.load_first_page_locked(false).await;
        self.update_state(|s| s.is_refreshing = false);
        result
    }

    // ---- writes ----

    /// Create a transaction from a draft. Shown immediately, rolled back if
    /// the remote store rejects it.
    pub async fn add(&self, draft: TransactionDraft) -> Result<Transaction> {
        let transaction = draft.into_transaction(TransactionId::generate());
        validate_transaction(&transaction)?;

        self.update_state(|s| {
            upsert_sorted(&mut s.transactions, transaction.clone());
        });

        if let Err(err) = self.remote.create_transaction(&transaction).await {
            tracing::warn!(transaction_id = %transaction.id, error = %err, "Create failed, rolling back");
            self.update_state(|s| {
                remove_by_id(&mut s.transactions, &transaction.id);
            });
            return Err(err.into());
        }

        tracing::debug!(transaction_id = %transaction.id, "Created transaction");
        self.cache_put(&transaction).await;
        Ok(transaction)
    }

    /// Replace a transaction. Shown immediately, restored if the remote store
    /// rejects it.
    pub async fn update(&self, transaction: Transaction) -> Result<Transaction> {
        if transaction.id.is_empty() {
            return Err(TransactionError::MissingId.into());
        }
        validate_transaction(&transaction)?;

        let mut outcome = UpsertOutcome::Inserted;
        self.update_state(|s| {
            outcome = upsert_sorted(&mut s.transactions, transaction.clone());
        });

        if let Err(err) = self.remote.update_transaction(&transaction).await {
            tracing::warn!(transaction_id = %transaction.id, error = %err, "Update failed, rolling back");
            self.update_state(|s| match outcome {
                UpsertOutcome::Replaced(previous) => {
                    upsert_sorted(&mut s.transactions, previous);
                }
                UpsertOutcome::Inserted => {
                    remove_by_id(&mut s.transactions, &transaction.id);
                }
            });
            return Err(err.into());
        }

        tracing::debug!(transaction_id = %transaction.id, "Updated transaction");
        self.cache_put(&transaction).await;
        Ok(transaction)
    }

    /// Delete a transaction. Hidden immediately, restored if the remote store
    /// rejects the delete.
    pub async fn remove(&self, id: &TransactionId) -> Result<()> {
        let mut previous = None;
        self.update_state(|s| {
            previous = remove_by_id(&mut s.transactions, id).map(|(_, tx)| tx);
        });

        if let Err(err) = self.remote.delete_transaction(id).await {
            tracing::warn!(transaction_id = %id, error = %err, "Delete failed, rolling back");
            if let Some(previous) = previous {
                self.update_state(|s| {
                    upsert_sorted(&mut s.transactions, previous);
                });
            }
            return Err(err.into());
        }

        tracing::debug!(transaction_id = %id, "Deleted transaction");
        self.cache_delete(id).await;
        Ok(())
    }

    // ---- aggregates over the loaded list ----

    pub fn total(&self, kind: TransactionKind) -> Decimal {
        ops::total(&self.state.borrow().transactions, kind)
    }

    pub fn balance(&self) -> Decimal {
        ops::balance(&self.state.borrow().transactions)
    }

    pub fn expenses_by_category(&self) -> std::collections::BTreeMap<String, Decimal> {
        ops::expenses_by_category(&self.state.borrow().transactions)
    }

    pub fn expenses_by_category_for_location(
        &self,
        location: &str,
    ) -> std::collections::BTreeMap<String, Decimal> {
        ops::expenses_by_category_for_location(&self.state.borrow().transactions, location)
    }

    pub fn summary(&self, location: Option<&str>) -> Summary {
        ops::summarize(&self.state.borrow().transactions, location)
    }

    /// Loaded transactions within `range`, newest first.
    pub fn in_range(&self, range: DateRange) -> Vec<Transaction> {
        ops::filter_by_date_range(&self.state.borrow().transactions, range)
            .into_iter()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use expensync_core::storage::{self, paginate, ChangeSource, ChangeStream, RepositoryError};
    use expensync_core::transaction::{apply_change, ChangeEvent, FeedMessage, TransactionChange};

    use super::*;

    /// Remote store backed by a vector, with a failure switch and a change
    /// log it replays to subscribers.
    #[derive(Default)]
    pub struct MockRemote {
        pub items: Mutex<Vec<Transaction>>,
        pub events: Mutex<Vec<ChangeEvent>>,
        pub fail: AtomicBool,
        pub list_calls: AtomicUsize,
        /// Delay for listings after a cursor, in milliseconds.
        pub next_page_delay_ms: AtomicU64,
    }

    impl MockRemote {
        pub fn with(items: Vec<Transaction>) -> Arc<Self> {
            let remote = Self::default();
            *remote.items.lock().unwrap() = items;
            Arc::new(remote)
        }

        pub fn set_failing(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        pub fn list_calls(&self) -> usize {
            self.list_calls.load(Ordering::SeqCst)
        }

        /// Apply a change made by another client and log it.
        pub fn record(&self, change: TransactionChange) -> ChangeEvent {
            apply_change(&mut self.items.lock().unwrap(), &change);
            let mut events = self.events.lock().unwrap();
            let event = ChangeEvent::new(events.len() as u64 + 1, change);
            events.push(event.clone());
            event
        }

        fn check(&self) -> storage::Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                Err(RepositoryError::ConnectionFailed("offline".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl TransactionRepository for MockRemote {
        async fn get_transaction(&self, id: &TransactionId) -> storage::Result<Option<Transaction>> {
            self.check()?;
            let items = self.items.lock().unwrap();
            Ok(items.iter().find(|tx| &tx.id == id).cloned())
        }

        async fn list_transactions(&self, query: &PageQuery) -> storage::Result<Page> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.check()?;
            let feed_seq = self.events.lock().unwrap().len() as u64;
            let mut items = self.items.lock().unwrap().clone();
            let delay = self.next_page_delay_ms.load(Ordering::SeqCst);
            if query.after.is_some() && delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            sort_newest_first(&mut items);
            Ok(paginate(&items, query).with_feed_seq(feed_seq))
        }

        async fn create_transaction(&self, transaction: &Transaction) -> storage::Result<()> {
            self.check()?;
            self.items.lock().unwrap().push(transaction.clone());
            Ok(())
        }

        async fn update_transaction(&self, transaction: &Transaction) -> storage::Result<()> {
            self.check()?;
            let mut items = self.items.lock().unwrap();
            let slot = items
                .iter_mut()
                .find(|tx| tx.id == transaction.id)
                .ok_or_else(|| RepositoryError::transaction_not_found(&transaction.id))?;
            *slot = transaction.clone();
            Ok(())
        }

        async fn delete_transaction(&self, id: &TransactionId) -> storage::Result<()> {
            self.check()?;
            let mut items = self.items.lock().unwrap();
            let before = items.len();
            items.retain(|tx| &tx.id != id);
            if items.len() == before {
                return Err(RepositoryError::transaction_not_found(id));
            }
            Ok(())
        }
    }

    /// Replays logged events after `since`; a live-only subscription gets
    /// nothing. The stream ends after the backlog.
    #[async_trait]
    impl ChangeSource for MockRemote {
        async fn subscribe_changes(&self, since: Option<u64>) -> storage::Result<ChangeStream> {
            self.check()?;
            let backlog: Vec<_> = match since {
                Some(since) => self
                    .events
                    .lock()
                    .unwrap()
                    .iter()
                    .filter(|e| e.seq > since)
                    .cloned()
                    .map(|e| Ok::<_, RepositoryError>(FeedMessage::Change(e)))
                    .collect(),
                None => Vec::new(),
            };
            Ok(Box::pin(tokio_stream::iter(backlog)))
        }
    }

    pub fn tx(id: &str, day: u32) -> Transaction {
        let date = NaiveDate::from_ymd_opt(2024, 5, day).unwrap();
        Transaction::expense(format!("item {id}"), Decimal::new(1000, 2), date).with_id(id)
    }

    pub fn ids(list: &[Transaction]) -> Vec<&str> {
        list.iter().map(|t| t.id.as_str()).collect()
    }

    pub fn config(page_size: usize) -> StoreConfig {
        StoreConfig {
            page_size,
            reconnect_delay: Duration::from_millis(10),
            ..StoreConfig::default()
        }
    }
}
