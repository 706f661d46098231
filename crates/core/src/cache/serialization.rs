//! JSON encoding of cached values.
//!
//! JSON keeps cache values readable when inspecting the cache by hand.

use crate::storage::Page;
use crate::transaction::Transaction;

use super::Result;

/// Serializes a transaction to JSON bytes.
pub fn serialize_transaction(transaction: &Transaction) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(transaction)?)
}

/// Deserializes a transaction from JSON bytes.
pub fn deserialize_transaction(bytes: &[u8]) -> Result<Transaction> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Serializes a listing page to JSON bytes.
pub fn serialize_page(page: &Page) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(page)?)
}

/// Deserializes a listing page from JSON bytes.
pub fn deserialize_page(bytes: &[u8]) -> Result<Page> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheError;
    use crate::storage::{paginate, PageQuery};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn sample() -> Transaction {
        let date = NaiveDate::from_ymd_opt(2024, 8, 20).unwrap();
        Transaction::expense("Farmacia", Decimal::from_str("310.75").unwrap(), date)
            .with_id("tx-1")
            .with_account("Salud")
    }

    #[test]
    fn test_transaction_bytes_are_json() {
        let bytes = serialize_transaction(&sample()).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();

        assert!(text.contains("\"cuenta\":\"Salud\""));
        assert_eq!(deserialize_transaction(&bytes).unwrap(), sample());
    }

    #[test]
    fn test_page_keeps_cursor() {
        let items = vec![sample(), sample().with_id("tx-0")];
        let page = paginate(&items, &PageQuery::first(1));

        let restored = deserialize_page(&serialize_page(&page).unwrap()).unwrap();

        assert_eq!(restored, page);
        assert!(restored.has_more());
    }

    #[test]
    fn test_corrupt_bytes_are_serialization_errors() {
        let result = deserialize_transaction(b"{not json");
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }
}
