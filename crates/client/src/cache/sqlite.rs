//! SQLite-backed local cache.
//!
//! Transactions are stored as JSON documents keyed by id, with the date in
//! its own indexed column for ordering and range scans.

use async_trait::async_trait;
use tokio_rusqlite::Connection;

use expensync_core::cache::{CacheError, CacheMeta, CacheSnapshot, LocalCache, Result};
use expensync_core::storage::DateRange;
use expensync_core::transaction::{Transaction, TransactionId};

const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS cache_transactions (
    id TEXT PRIMARY KEY NOT NULL,
    date TEXT NOT NULL,
    doc TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cache_transactions_date
    ON cache_transactions(date DESC, id DESC);

CREATE TABLE IF NOT EXISTS cache_meta (
    slot INTEGER PRIMARY KEY CHECK (slot = 0),
    doc TEXT NOT NULL
);
"#;

const UPSERT_TRANSACTION: &str =
    "INSERT OR REPLACE INTO cache_transactions (id, date, doc) VALUES (?1, ?2, ?3)";

const UPSERT_META: &str = "INSERT OR REPLACE INTO cache_meta (slot, doc) VALUES (0, ?1)";

const SELECT_ALL: &str = "SELECT doc FROM cache_transactions ORDER BY date DESC, id DESC";

const SELECT_RANGE: &str = "SELECT doc FROM cache_transactions \
     WHERE date >= ?1 AND date <= ?2 ORDER BY date DESC, id DESC";

const SELECT_ONE: &str = "SELECT doc FROM cache_transactions WHERE id = ?1";

const SELECT_META: &str = "SELECT doc FROM cache_meta WHERE slot = 0";

fn wrap_err(e: rusqlite::Error) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Rusqlite(e)
}

fn map_err(err: tokio_rusqlite::Error) -> CacheError {
    match err {
        tokio_rusqlite::Error::Close(_) | tokio_rusqlite::Error::ConnectionClosed => {
            CacheError::ConnectionFailed("Connection closed unexpectedly".to_string())
        }
        other => CacheError::OperationFailed(other.to_string()),
    }
}

fn to_doc<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn from_docs(docs: Vec<String>) -> Result<Vec<Transaction>> {
    docs.iter()
        .map(|doc| serde_json::from_str(doc).map_err(CacheError::from))
        .collect()
}

fn date_key(date: chrono::NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Local cache persisted in a SQLite file.
pub struct SqliteLocalCache {
    conn: Connection,
}

impl SqliteLocalCache {
    /// Opens (or creates) the cache file.
    pub async fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| CacheError::ConnectionFailed(e.to_string()))?;
        Self::init_schema(&conn).await?;
        Ok(Self { conn })
    }

    /// Cache backed by an in-memory database.
    pub async fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| CacheError::ConnectionFailed(e.to_string()))?;
        Self::init_schema(&conn).await?;
        Ok(Self { conn })
    }

    async fn init_schema(conn: &Connection) -> Result<()> {
        conn.call(|conn| conn.execute_batch(CREATE_TABLES).map_err(wrap_err))
            .await
            .map_err(map_err)
    }

    async fn select_docs(&self, sql: &'static str, params: Vec<String>) -> Result<Vec<String>> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(sql).map_err(wrap_err)?;
                let rows = stmt
                    .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                        row.get::<_, String>(0)
                    })
                    .map_err(wrap_err)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(wrap_err)
            })
            .await
            .map_err(map_err)
    }
}

#[async_trait]
impl LocalCache for SqliteLocalCache {
    async fn load(&self) -> Result<Option<CacheSnapshot>> {
        let Some(meta) = self.meta().await? else {
            return Ok(None);
        };
        let transactions = from_docs(self.select_docs(SELECT_ALL, Vec::new()).await?)?;
        Ok(Some(CacheSnapshot { transactions, meta }))
    }

    async fn store_page(&self, transactions: &[Transaction], meta: &CacheMeta) -> Result<()> {
        let rows = transactions
            .iter()
            .map(|tx| Ok((tx.id.to_string(), date_key(tx.date), to_doc(tx)?)))
            .collect::<Result<Vec<_>>>()?;
        let meta_doc = to_doc(meta)?;

        self.conn
            .call(move |conn| {
                let db_tx = conn.transaction().map_err(wrap_err)?;
                {
                    let mut stmt = db_tx.prepare(UPSERT_TRANSACTION).map_err(wrap_err)?;
                    for (id, date, doc) in &rows {
                        stmt.execute([id, date, doc]).map_err(wrap_err)?;
                    }
                }
                db_tx.execute(UPSERT_META, [&meta_doc]).map_err(wrap_err)?;
                db_tx.commit().map_err(wrap_err)
            })
            .await
            .map_err(map_err)
    }

    async fn get(&self, id: &TransactionId) -> Result<Option<Transaction>> {
        let docs = self.select_docs(SELECT_ONE, vec![id.to_string()]).await?;
        Ok(from_docs(docs)?.into_iter().next())
    }

    async fn put(&self, transaction: &Transaction) -> Result<()> {
        let row = [
            transaction.id.to_string(),
            date_key(transaction.date),
            to_doc(transaction)?,
        ];
        self.conn
            .call(move |conn| {
                conn.execute(UPSERT_TRANSACTION, row)
                    .map(|_| ())
                    .map_err(wrap_err)
            })
            .await
            .map_err(map_err)
    }

    async fn delete(&self, id: &TransactionId) -> Result<()> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM cache_transactions WHERE id = ?1", [id])
                    .map(|_| ())
                    .map_err(wrap_err)
            })
            .await
            .map_err(map_err)
    }

    async fn range(&self, range: DateRange) -> Result<Vec<Transaction>> {
        let params = vec![date_key(range.start), date_key(range.end)];
        from_docs(self.select_docs(SELECT_RANGE, params).await?)
    }

    async fn meta(&self) -> Result<Option<CacheMeta>> {
        let docs = self.select_docs(SELECT_META, Vec::new()).await?;
        docs.first()
            .map(|doc| serde_json::from_str(doc).map_err(CacheError::from))
            .transpose()
    }

    async fn clear(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.execute_batch("DELETE FROM cache_transactions; DELETE FROM cache_meta;")
                    .map_err(wrap_err)
            })
            .await
            .map_err(map_err)
    }
}
