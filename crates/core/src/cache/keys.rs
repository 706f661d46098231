use crate::storage::PageQuery;
use crate::transaction::TransactionId;

/// Returns the cache key for a single transaction.
pub fn transaction_key(id: &TransactionId) -> String {
    format!("transaction:{id}")
}

/// Returns the cache key for one page of the transaction listing.
///
/// The limit is the effective (clamped) one, so equivalent queries share a key.
pub fn transaction_page_key(query: &PageQuery) -> String {
    match &query.after {
        Some(cursor) => format!(
            "transactions:page:{}:{}",
            query.effective_limit(),
            cursor
        ),
        None => format!("transactions:page:{}:first", query.effective_limit()),
    }
}

/// Returns the pattern matching every cached listing page.
pub fn transaction_pages_pattern() -> &'static str {
    "transactions:page:*"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::pattern_matches;
    use crate::storage::PageCursor;
    use chrono::NaiveDate;

    #[test]
    fn test_transaction_key() {
        assert_eq!(transaction_key(&"tx-1".into()), "transaction:tx-1");
    }

    #[test]
    fn test_first_page_key_uses_clamped_limit() {
        assert_eq!(
            transaction_page_key(&PageQuery::first(0)),
            "transactions:page:1:first"
        );
    }

    #[test]
    fn test_cursor_page_key() {
        let cursor = PageCursor::new(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), "abc");
        assert_eq!(
            transaction_page_key(&PageQuery::after(50, cursor)),
            "transactions:page:50:2024-05-01|abc"
        );
    }

    #[test]
    fn test_pages_pattern_matches_page_keys_only() {
        let page_key = transaction_page_key(&PageQuery::default());
        assert!(pattern_matches(transaction_pages_pattern(), &page_key));
        assert!(!pattern_matches(
            transaction_pages_pattern(),
            &transaction_key(&"x".into())
        ));
    }
}
