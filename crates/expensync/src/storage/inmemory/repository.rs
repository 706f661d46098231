use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use expensync_core::storage::{
    paginate, Page, PageQuery, RepositoryError, Result, TransactionRepository,
};
use expensync_core::transaction::{
    sort_newest_first, validate_transaction, Transaction, TransactionId,
};

/// In-memory storage backend.
///
/// Data is not persisted and will be lost when the repository is dropped.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    transactions: Arc<RwLock<HashMap<TransactionId, Transaction>>>,
}

impl InMemoryRepository {
    /// Creates a new empty in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository pre-populated with `transactions`.
    ///
    /// Later duplicates of an id replace earlier ones.
    pub fn with_transactions(transactions: impl IntoIterator<Item = Transaction>) -> Self {
        let map = transactions
            .into_iter()
            .map(|tx| (tx.id.clone(), tx))
            .collect();
        Self {
            transactions: Arc::new(RwLock::new(map)),
        }
    }

    /// Number of stored transactions.
    pub async fn len(&self) -> usize {
        self.transactions.read().await.len()
    }
}

#[async_trait]
impl TransactionRepository for InMemoryRepository {
    async fn get_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>> {
        let transactions = self.transactions.read().await;
        Ok(transactions.get(id).cloned())
    }

    async fn list_transactions(&self, query: &PageQuery) -> Result<Page> {
        let mut sorted: Vec<Transaction> =
            self.transactions.read().await.values().cloned().collect();
        sort_newest_first(&mut sorted);
        Ok(paginate(&sorted, query))
    }

    async fn create_transaction(&self, transaction: &Transaction) -> Result<()> {
        validate_transaction(transaction)?;
        let mut transactions = self.transactions.write().await;
        if transactions.contains_key(&transaction.id) {
            return Err(RepositoryError::transaction_exists(&transaction.id));
        }
        transactions.insert(transaction.id.clone(), transaction.clone());
        Ok(())
    }

    async fn update_transaction(&self, transaction: &Transaction) -> Result<()> {
        validate_transaction(transaction)?;
        let mut transactions = self.transactions.write().await;
        match transactions.get_mut(&transaction.id) {
            Some(existing) => {
                *existing = transaction.clone();
                Ok(())
            }
            None => Err(RepositoryError::transaction_not_found(&transaction.id)),
        }
    }

    async fn delete_transaction(&self, id: &TransactionId) -> Result<()> {
        let mut transactions = self.transactions.write().await;
        if transactions.remove(id).is_none() {
            return Err(RepositoryError::transaction_not_found(id));
        }
        Ok(())
    }
}
