//! SQLite repository implementation.

use async_trait::async_trait;
use tokio_rusqlite::Connection;

use expensync_core::storage::{
    Page, PageCursor, PageQuery, RepositoryError, Result, TransactionRepository,
};
use expensync_core::transaction::{validate_transaction, Transaction, TransactionId};

use super::conversions::{format_date, row_to_transaction, transaction_params};
use super::error::{map_tokio_rusqlite_error, map_tokio_rusqlite_error_with_id};
use super::schema;

/// Helper to wrap rusqlite errors for tokio_rusqlite closures.
fn wrap_err(e: rusqlite::Error) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Rusqlite(e)
}

/// Errors with `QueryReturnedNoRows` when a write touched nothing.
fn require_row(rows: usize) -> std::result::Result<(), tokio_rusqlite::Error> {
    if rows == 0 {
        Err(wrap_err(rusqlite::Error::QueryReturnedNoRows))
    } else {
        Ok(())
    }
}

/// SQLite-based transaction repository.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Opens (or creates) a file-based database and its schema.
    pub async fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    /// Creates a repository backed by an in-memory database.
    pub async fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    async fn init_schema(conn: &Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(schema::CREATE_TABLES)
                .map_err(wrap_err)?;
            Ok(())
        })
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))
    }
}

#[async_trait]
impl TransactionRepository for SqliteRepository {
    async fn get_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>> {
        let id_str = id.to_string();

        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(&schema::select_transaction_by_id())
                    .map_err(wrap_err)?;
                match stmt.query_row([&id_str], row_to_transaction) {
                    Ok(transaction) => Ok(Some(transaction)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(wrap_err(e)),
                }
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, id.as_str()))
    }

    async fn list_transactions(&self, query: &PageQuery) -> Result<Page> {
        let limit = query.effective_limit();
        // One extra row tells whether another page follows.
        let fetch = (limit + 1) as i64;
        let after = query
            .after
            .as_ref()
            .map(|cursor| (format_date(&cursor.date), cursor.id.to_string()));

        let mut items = self
            .conn
            .call(move |conn| {
                let mut rows = Vec::new();
                match after {
                    Some((date, id)) => {
                        let mut stmt = conn
                            .prepare(&schema::select_page_after())
                            .map_err(wrap_err)?;
                        let mapped = stmt
                            .query_map(rusqlite::params![date, id, fetch], row_to_transaction)
                            .map_err(wrap_err)?;
                        for row in mapped {
                            rows.push(row.map_err(wrap_err)?);
                        }
                    }
                    None => {
                        let mut stmt = conn
                            .prepare(&schema::select_first_page())
                            .map_err(wrap_err)?;
                        let mapped = stmt
                            .query_map([fetch], row_to_transaction)
                            .map_err(wrap_err)?;
                        for row in mapped {
                            rows.push(row.map_err(wrap_err)?);
                        }
                    }
                }
                Ok(rows)
            })
            .await
            .map_err(map_tokio_rusqlite_error)?;

        let next_cursor = if items.len() > limit {
            items.truncate(limit);
            items.last().map(PageCursor::at)
        } else {
            None
        };

        Ok(Page {
            items,
            next_cursor,
            feed_seq: None,
        })
    }

    async fn create_transaction(&self, transaction: &Transaction) -> Result<()> {
        validate_transaction(transaction)?;
        let row = transaction_params(transaction);

        self.conn
            .call(move |conn| {
                row.execute(conn, schema::INSERT_TRANSACTION)
                    .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, transaction.id.as_str()))
    }

    async fn update_transaction(&self, transaction: &Transaction) -> Result<()> {
        validate_transaction(transaction)?;
        let row = transaction_params(transaction);

        self.conn
            .call(move |conn| {
                let rows = row
                    .execute(conn, schema::UPDATE_TRANSACTION)
                    .map_err(wrap_err)?;
                require_row(rows)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, transaction.id.as_str()))
    }

    async fn delete_transaction(&self, id: &TransactionId) -> Result<()> {
        let id_str = id.to_string();

        self.conn
            .call(move |conn| {
                let rows = conn
                    .execute(schema::DELETE_TRANSACTION, [&id_str])
                    .map_err(wrap_err)?;
                require_row(rows)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn tx(id: &str, month: u32, day: u32) -> Transaction {
        let date = NaiveDate::from_ymd_opt(2024, month, day).unwrap();
        Transaction::expense(format!("tx {id}"), Decimal::new(1999, 2), date).with_id(id)
    }

    async fn setup() -> SqliteRepository {
        SqliteRepository::new_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get_preserves_fields() {
        let repo = setup().await;
        let t = tx("a", 1, 10)
            .with_category("Comida")
            .with_location("CDMX")
            .with_payment_method("Tarjeta")
            .with_notes("lunch");

        repo.create_transaction(&t).await.unwrap();
        let fetched = repo.get_transaction(&t.id).await.unwrap();

        assert_eq!(fetched, Some(t));
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let repo = setup().await;
        assert!(repo.get_transaction(&"x".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_duplicate_is_already_exists() {
        let repo = setup().await;
        repo.create_transaction(&tx("a", 1, 1)).await.unwrap();

        let err = repo.create_transaction(&tx("a", 2, 2)).await.unwrap_err();
        assert_eq!(err, RepositoryError::transaction_exists(&"a".into()));
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_are_not_found() {
        let repo = setup().await;

        let err = repo.update_transaction(&tx("a", 1, 1)).await.unwrap_err();
        assert_eq!(err, RepositoryError::transaction_not_found(&"a".into()));

        let err = repo.delete_transaction(&"a".into()).await.unwrap_err();
        assert_eq!(err, RepositoryError::transaction_not_found(&"a".into()));
    }

    #[tokio::test]
    async fn test_update_replaces_row() {
        let repo = setup().await;
        repo.create_transaction(&tx("a", 1, 1)).await.unwrap();

        let mut updated = tx("a", 3, 5);
        updated.amount = Decimal::new(-450, 1);
        repo.update_transaction(&updated).await.unwrap();

        let fetched = repo.get_transaction(&updated.id).await.unwrap().unwrap();
        assert_eq!(fetched.amount, Decimal::new(-450, 1));
        assert_eq!(fetched.date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    }

    #[tokio::test]
    async fn test_delete_removes_row() {
        let repo = setup().await;
        repo.create_transaction(&tx("a", 1, 1)).await.unwrap();
        repo.delete_transaction(&"a".into()).await.unwrap();
        assert!(repo.get_transaction(&"a".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keyset_pages_cover_everything_once() {
        let repo = setup().await;
        for t in [
            tx("a", 1, 1),
            tx("b", 1, 2),
            tx("c", 1, 2),
            tx("d", 2, 1),
            tx("e", 3, 1),
        ] {
            repo.create_transaction(&t).await.unwrap();
        }

        let mut seen = Vec::new();
        let mut query = PageQuery::first(2);
        loop {
            let page = repo.list_transactions(&query).await.unwrap();
            seen.extend(page.items.iter().map(|t| t.id.to_string()));
            match page.next_cursor {
                Some(cursor) => query = PageQuery::after(2, cursor),
                None => break,
            }
        }

        assert_eq!(seen, vec!["e", "d", "c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_exact_fit_has_no_cursor() {
        let repo = setup().await;
        repo.create_transaction(&tx("a", 1, 1)).await.unwrap();
        repo.create_transaction(&tx("b", 1, 2)).await.unwrap();

        let page = repo.list_transactions(&PageQuery::first(2)).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(!page.has_more());
    }
}
