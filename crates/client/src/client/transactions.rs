//! Transaction API operations.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};

use expensync_core::storage::{self, Page, PageQuery, TransactionRepository};
use expensync_core::transaction::{Transaction, TransactionId};

use super::ExpensyncClient;
use crate::error::{ClientError, Result};

impl ExpensyncClient {
    /// URL of one transaction, with the id percent-encoded as a path segment.
    fn transaction_url(&self, id: &TransactionId) -> Result<Url> {
        let mut url = Url::parse(&self.url("/api/transactions"))
            .map_err(|e| ClientError::InvalidInput(format!("bad base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidInput("base URL cannot have a path".to_string()))?
            .push(id.as_str());
        Ok(url)
    }

    /// Fetch one page of transactions, newest first.
    pub async fn list_page(&self, query: &PageQuery) -> Result<Page> {
        let mut params = vec![("limit", query.effective_limit().to_string())];
        if let Some(cursor) = &query.after {
            params.push(("after", cursor.to_string()));
        }

        let response = self
            .client
            .get(self.url("/api/transactions"))
            .query(&params)
            .send()
            .await?;
        self.handle_response(response, None).await
    }

    /// Fetch every page and return the whole collection.
    pub async fn list_all(&self, page_size: usize) -> Result<Vec<Transaction>> {
        let mut all = Vec::new();
        let mut query = PageQuery::first(page_size);
        loop {
            let page = self.list_page(&query).await?;
            all.extend(page.items);
            match page.next_cursor {
                Some(cursor) => query = PageQuery::after(page_size, cursor),
                None => break,
            }
        }
        Ok(all)
    }

    /// Get a transaction by ID; `None` if the server does not have it.
    pub async fn get(&self, id: &TransactionId) -> Result<Option<Transaction>> {
        let response = self.client.get(self.transaction_url(id)?).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        self.handle_response(response, Some(id.as_str())).await
    }

    /// Create a transaction; returns the stored document.
    pub async fn create(&self, transaction: &Transaction) -> Result<Transaction> {
        let response = self
            .client
            .post(self.url("/api/transactions"))
            .json(transaction)
            .send()
            .await?;
        self.handle_response(response, Some(transaction.id.as_str()))
            .await
    }

    /// Replace a transaction; returns the stored document.
    pub async fn update(&self, transaction: &Transaction) -> Result<Transaction> {
        let response = self
            .client
            .put(self.transaction_url(&transaction.id)?)
            .json(transaction)
            .send()
            .await?;
        self.handle_response(response, Some(transaction.id.as_str()))
            .await
    }

    /// Delete a transaction by ID.
    pub async fn delete(&self, id: &TransactionId) -> Result<()> {
        let response = self.client.delete(self.transaction_url(id)?).send().await?;
        self.handle_empty_response(response, Some(id.as_str()))
            .await
    }
}

#[async_trait]
impl TransactionRepository for ExpensyncClient {
    async fn get_transaction(&self, id: &TransactionId) -> storage::Result<Option<Transaction>> {
        Ok(self.get(id).await?)
    }

    async fn list_transactions(&self, query: &PageQuery) -> storage::Result<Page> {
        Ok(self.list_page(query).await?)
    }

    async fn create_transaction(&self, transaction: &Transaction) -> storage::Result<()> {
        self.create(transaction).await?;
        Ok(())
    }

    async fn update_transaction(&self, transaction: &Transaction) -> storage::Result<()> {
        self.update(transaction).await?;
        Ok(())
    }

    async fn delete_transaction(&self, id: &TransactionId) -> storage::Result<()> {
        Ok(self.delete(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_url_encodes_id() {
        let client = ExpensyncClient::new("http://localhost:3000");
        let url = client
            .transaction_url(&TransactionId::from("legacy/42 a"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/api/transactions/legacy%2F42%20a"
        );
    }
}
