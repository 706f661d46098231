//! Expiry policy of the client-side cache.
//!
//! The whole cache shares one `last_update` timestamp, written when a page
//! from the remote store is stored. Single-record writes do not refresh it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::PageCursor;
use crate::transaction::Transaction;

/// How long cached transactions are served without asking the remote store.
pub const DEFAULT_LOCAL_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// The single metadata record of the local cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMeta {
    pub last_update: DateTime<Utc>,
    /// Cursor of the last remote page stored, for resuming pagination.
    pub cursor: Option<PageCursor>,
    pub has_more: bool,
    /// Change feed position the cached list reflects.
    #[serde(default)]
    pub feed_seq: Option<u64>,
}

impl CacheMeta {
    pub fn new(last_update: DateTime<Utc>, cursor: Option<PageCursor>, has_more: bool) -> Self {
        Self {
            last_update,
            cursor,
            has_more,
            feed_seq: None,
        }
    }

    pub fn with_feed_seq(mut self, seq: Option<u64>) -> Self {
        self.feed_seq = seq;
        self
    }
}

/// Everything the local cache holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSnapshot {
    /// Newest first.
    pub transactions: Vec<Transaction>,
    pub meta: CacheMeta,
}

/// True if the cache was stamped no longer than `ttl` before `now`.
///
/// Missing metadata counts as expired. A timestamp in the future (clock
/// moved backwards) counts as fresh.
pub fn is_fresh(meta: Option<&CacheMeta>, now: DateTime<Utc>, ttl: Duration) -> bool {
    let Some(meta) = meta else {
        return false;
    };
    match (now - meta.last_update).to_std() {
        Ok(age) => age <= ttl,
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, minute, 0).unwrap()
    }

    #[test]
    fn test_missing_meta_is_expired() {
        assert!(!is_fresh(None, at(0), DEFAULT_LOCAL_CACHE_TTL));
    }

    #[test]
    fn test_within_ttl_is_fresh() {
        let meta = CacheMeta::new(at(0), None, true);
        assert!(is_fresh(Some(&meta), at(29), DEFAULT_LOCAL_CACHE_TTL));
        assert!(is_fresh(Some(&meta), at(30), DEFAULT_LOCAL_CACHE_TTL));
    }

    #[test]
    fn test_past_ttl_is_expired() {
        let meta = CacheMeta::new(at(0), None, true);
        assert!(!is_fresh(Some(&meta), at(31), DEFAULT_LOCAL_CACHE_TTL));
    }

    #[test]
    fn test_future_timestamp_is_fresh() {
        let meta = CacheMeta::new(at(10), None, false);
        assert!(is_fresh(Some(&meta), at(0), DEFAULT_LOCAL_CACHE_TTL));
    }

    #[test]
    fn test_meta_without_feed_position_still_parses() {
        let meta: CacheMeta = serde_json::from_str(
            r#"{"last_update":"2024-01-01T12:00:00Z","cursor":null,"has_more":false}"#,
        )
        .unwrap();
        assert_eq!(meta.feed_seq, None);
        assert_eq!(meta.with_feed_seq(Some(3)).feed_seq, Some(3));
    }
}
