use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::transaction::{FeedMessage, Transaction, TransactionId};

use super::{Page, PageQuery, Result};

/// Document store holding the transaction collection.
///
/// Every listing is ordered newest first (date descending, id descending)
/// and paginated with keyset cursors.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Gets a transaction by its ID.
    async fn get_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>>;

    /// Gets one page of transactions.
    async fn list_transactions(&self, query: &PageQuery) -> Result<Page>;

    /// Creates a new transaction. Fails with `AlreadyExists` if the id is taken.
    async fn create_transaction(&self, transaction: &Transaction) -> Result<()>;

    /// Replaces an existing transaction. Fails with `NotFound` if it does not exist.
    async fn update_transaction(&self, transaction: &Transaction) -> Result<()>;

    /// Deletes a transaction by its ID. Fails with `NotFound` if it does not exist.
    async fn delete_transaction(&self, id: &TransactionId) -> Result<()>;
}

/// Stream of realtime feed messages.
pub type ChangeStream = Pin<Box<dyn Stream<Item = Result<FeedMessage>> + Send>>;

/// Realtime subscription to the transaction collection.
#[async_trait]
pub trait ChangeSource: Send + Sync {
    /// Subscribes to changes after sequence number `since`.
    ///
    /// With `since = None` only changes published after the subscription are
    /// delivered. The stream ends when the connection drops.
    async fn subscribe_changes(&self, since: Option<u64>) -> Result<ChangeStream>;
}
