//! Keyset pagination over the newest-first transaction order.
//!
//! A cursor names the last document of the previous page; the next page
//! starts strictly after it. Cursors survive concurrent inserts, unlike
//! offsets, and serialize to `YYYY-MM-DD|id` so they can travel in query
//! strings and cache metadata.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::CursorError;
use crate::transaction::{Transaction, TransactionId};

/// Page size used when a caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: usize = 500;

/// Position of a document in the newest-first order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageCursor {
    pub date: NaiveDate,
    pub id: TransactionId,
}

impl PageCursor {
    pub fn new(date: NaiveDate, id: impl Into<TransactionId>) -> Self {
        Self {
            date,
            id: id.into(),
        }
    }

    /// Cursor pointing at the given transaction.
    pub fn at(transaction: &Transaction) -> Self {
        Self::new(transaction.date, transaction.id.clone())
    }

    /// True if `transaction` comes after this cursor in newest-first order.
    pub fn precedes(&self, transaction: &Transaction) -> bool {
        (transaction.date, &transaction.id) < (self.date, &self.id)
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.date.format("%Y-%m-%d"), self.id)
    }
}

impl FromStr for PageCursor {
    type Err = CursorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (date, id) = s
            .split_once('|')
            .ok_or_else(|| CursorError::Malformed(s.to_string()))?;
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| CursorError::Malformed(s.to_string()))?;
        if id.is_empty() {
            return Err(CursorError::Malformed(s.to_string()));
        }
        Ok(Self::new(date, id))
    }
}

impl Serialize for PageCursor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PageCursor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Request for one page of transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub limit: usize,
    pub after: Option<PageCursor>,
}

impl PageQuery {
    /// The first page.
    pub fn first(limit: usize) -> Self {
        Self { limit, after: None }
    }

    /// The page following `cursor`.
    pub fn after(limit: usize, cursor: PageCursor) -> Self {
        Self {
            limit,
            after: Some(cursor),
        }
    }

    /// The limit clamped to `1..=MAX_PAGE_SIZE`.
    pub fn effective_limit(&self) -> usize {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }
}

impl Default for PageQuery {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_SIZE)
    }
}

/// One page of transactions, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Page {
    pub items: Vec<Transaction>,
    /// Cursor for the next page; `None` when this is the last one.
    pub next_cursor: Option<PageCursor>,
    /// Change feed sequence number read before the listing was taken.
    /// Replaying the feed from here brings the page up to date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_seq: Option<u64>,
}

impl Page {
    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }

    pub fn with_feed_seq(mut self, seq: u64) -> Self {
        self.feed_seq = Some(seq);
        self
    }
}

/// Cuts a page out of a list already sorted newest first.
pub fn paginate(sorted: &[Transaction], query: &PageQuery) -> Page {
    let limit = query.effective_limit();
    let start = match &query.after {
        Some(cursor) => sorted
            .iter()
            .position(|tx| cursor.precedes(tx))
            .unwrap_or(sorted.len()),
        None => 0,
    };

    let remaining = &sorted[start..];
    let items: Vec<Transaction> = remaining.iter().take(limit).cloned().collect();
    let next_cursor = if remaining.len() > limit {
        items.last().map(PageCursor::at)
    } else {
        None
    };

    Page {
        items,
        next_cursor,
        feed_seq: None,
    }
}
