//! Transaction CRUD handlers.
//!
//! Write bodies are arbitrary JSON records and go through normalization, so
//! legacy clients can send formatted amounts or old date formats. Change
//! publishing is done by the cached repository decorator.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use expensync_core::normalize::{normalize_record, NormalizeError, RecordFixes};
use expensync_core::storage::{Page, PageCursor, PageQuery, RepositoryError};
use expensync_core::transaction::{Transaction, TransactionId};

use crate::{handlers::AppError, state::AppState};

/// Query parameters for listing transactions.
#[derive(Debug, Default, Deserialize)]
pub struct ListTransactionsQuery {
    /// Page size, clamped to the allowed range.
    pub limit: Option<usize>,
    /// Cursor (`YYYY-MM-DD|id`) of the last transaction already seen.
    #[serde(default, deserialize_with = "expensync_core::serde::deserialize_optional_string")]
    pub after: Option<String>,
}

impl ListTransactionsQuery {
    fn into_page_query(self, default_limit: usize) -> Result<PageQuery, AppError> {
        let limit = self.limit.unwrap_or(default_limit);
        Ok(match self.after {
            Some(raw) => PageQuery::after(limit, raw.parse::<PageCursor>()?),
            None => PageQuery::first(limit),
        })
    }
}

/// List one page of transactions, newest first (GET /api/transactions).
///
/// The page carries the feed position read before listing, so a client can
/// resume the event stream from it without missing a write.
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<Page>, AppError> {
    let page_query = query.into_page_query(state.default_page_size)?;
    let feed_seq = state.change_feed.latest_seq().await;
    let page = state
        .transaction_repo
        .list_transactions(&page_query)
        .await?
        .with_feed_seq(feed_seq);
    tracing::debug!(
        count = page.items.len(),
        has_more = page.has_more(),
        feed_seq,
        "Listed transactions"
    );
    Ok(Json(page))
}

/// Get a transaction by id (GET /api/transactions/{id}).
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Transaction>, AppError> {
    let id = TransactionId::new(id);
    let transaction = state
        .transaction_repo
        .get_transaction(&id)
        .await?
        .ok_or_else(|| RepositoryError::transaction_not_found(&id))?;
    Ok(Json(transaction))
}

/// Create a transaction from a JSON record (POST /api/transactions).
///
/// Records without an id get a freshly generated one.
pub async fn create_transaction(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let record = normalize_record(&body, 0)?;
    reject_unreadable_amount(&body, &record.fixes)?;
    let mut transaction = record.transaction;
    if record.fixes.id_assigned {
        transaction.id = TransactionId::generate();
    }

    state
        .transaction_repo
        .create_transaction(&transaction)
        .await?;

    tracing::debug!(transaction_id = %transaction.id, "Transaction created");
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// Update a transaction (PUT /api/transactions/{id}).
///
/// Fields present in the body are merged over the stored document; the path
/// id always wins over an id in the body.
pub async fn update_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Transaction>, AppError> {
    let id = TransactionId::new(id);
    let existing = state
        .transaction_repo
        .get_transaction(&id)
        .await?
        .ok_or_else(|| RepositoryError::transaction_not_found(&id))?;

    let merged = merge_fields(&existing, body.clone())?;
    let record = normalize_record(&merged, 0)?;
    reject_unreadable_amount(&body, &record.fixes)?;
    let mut transaction = record.transaction;
    transaction.id = id;

    state
        .transaction_repo
        .update_transaction(&transaction)
        .await?;

    tracing::debug!(transaction_id = %transaction.id, "Transaction updated");
    Ok(Json(transaction))
}

/// Delete a transaction (DELETE /api/transactions/{id}).
pub async fn delete_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = TransactionId::new(id);
    state.transaction_repo.delete_transaction(&id).await?;
    tracing::debug!(transaction_id = %id, "Transaction deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Fails when `body` carries an amount that could not be parsed.
///
/// Imports fall back to zero for such records, but an API write would
/// otherwise store a zero the caller never asked for.
fn reject_unreadable_amount(body: &Value, fixes: &RecordFixes) -> Result<(), NormalizeError> {
    if !fixes.amount_defaulted {
        return Ok(());
    }
    let supplied = ["amount", "formattedAmount"]
        .iter()
        .find_map(|key| body.get(*key).filter(|value| !value.is_null()));
    match supplied {
        Some(raw) => Err(NormalizeError::InvalidAmount(raw.to_string())),
        None => Ok(()),
    }
}

/// Overlays the keys of `patch` on the document form of `existing`.
fn merge_fields(existing: &Transaction, patch: Value) -> Result<Value, AppError> {
    let Value::Object(patch) = patch else {
        return Err(NormalizeError::NotAnObject.into());
    };
    let mut document = serde_json::to_value(existing)?;
    if let Value::Object(fields) = &mut document {
        fields.extend(patch);
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use serde_json::json;

    #[test]
    fn test_merge_fields_overlays_patch() {
        let existing = Transaction::expense(
            "Taxi",
            Decimal::new(1200, 2),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        )
        .with_id("t1")
        .with_category("Transporte");

        let merged = merge_fields(&existing, json!({"amount": "$ 15.00", "notes": "airport"})).unwrap();

        assert_eq!(merged["description"], "Taxi");
        assert_eq!(merged["category"], "Transporte");
        assert_eq!(merged["amount"], "$ 15.00");
        assert_eq!(merged["notes"], "airport");
    }

    #[test]
    fn test_merge_fields_rejects_non_object() {
        let existing = Transaction::expense(
            "Taxi",
            Decimal::ONE,
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        );
        assert!(merge_fields(&existing, json!([1, 2])).is_err());
    }

    #[test]
    fn test_unreadable_amount_is_rejected_only_when_supplied() {
        let garbled = json!({"date": "2024-02-01", "amount": "abc"});
        let fixes = normalize_record(&garbled, 0).unwrap().fixes;
        assert_eq!(
            reject_unreadable_amount(&garbled, &fixes),
            Err(NormalizeError::InvalidAmount("\"abc\"".to_string()))
        );

        let missing = json!({"date": "2024-02-01"});
        let fixes = normalize_record(&missing, 0).unwrap().fixes;
        assert!(fixes.amount_defaulted);
        assert_eq!(reject_unreadable_amount(&missing, &fixes), Ok(()));
    }

    #[test]
    fn test_query_without_cursor_is_first_page() {
        let query = ListTransactionsQuery::default();
        let page_query = query.into_page_query(25).ok().unwrap();
        assert_eq!(page_query, PageQuery::first(25));
    }

    #[test]
    fn test_query_with_bad_cursor_fails() {
        let query = ListTransactionsQuery {
            limit: Some(10),
            after: Some("yesterday".to_string()),
        };
        assert!(query.into_page_query(25).is_err());
    }
}
