//! SQLite row conversion functions.
//!
//! Pure functions for converting between SQLite rows and domain types.

use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Row, ToSql};
use rust_decimal::Decimal;

use expensync_core::normalize::normalize_kind;
use expensync_core::transaction::Transaction;

/// Convert a SQLite row to a Transaction.
///
/// Expected columns in [`super::schema`] order.
pub fn row_to_transaction(row: &Row) -> rusqlite::Result<Transaction> {
    let id: String = row.get(0)?;
    let description: String = row.get(1)?;
    let amount: String = row.get(2)?;
    let date: String = row.get(3)?;
    let kind: String = row.get(4)?;

    let mut transaction = Transaction::new(
        description,
        parse_decimal(2, &amount)?,
        parse_date(3, &date)?,
        normalize_kind(&kind),
    )
    .with_id(id);

    transaction.category = row.get(5)?;
    transaction.location = row.get(6)?;
    transaction.account = row.get(7)?;
    transaction.subaccount = row.get(8)?;
    transaction.payment_method = row.get(9)?;
    transaction.invoice = row.get(10)?;
    transaction.tags = row.get(11)?;
    transaction.notes = row.get(12)?;
    transaction.business_purpose = row.get(13)?;
    transaction.merchant = row.get(14)?;
    transaction.receipt_number = row.get(15)?;

    Ok(transaction)
}

/// Column values for insert and update statements, `?1` through `?16`.
pub fn transaction_params(transaction: &Transaction) -> TransactionRow {
    TransactionRow {
        id: transaction.id.to_string(),
        description: transaction.description.clone(),
        amount: transaction.amount.to_string(),
        date: format_date(&transaction.date),
        kind: transaction.kind.as_str().to_string(),
        optional: [
            transaction.category.clone(),
            transaction.location.clone(),
            transaction.account.clone(),
            transaction.subaccount.clone(),
            transaction.payment_method.clone(),
            transaction.invoice.clone(),
            transaction.tags.clone(),
            transaction.notes.clone(),
            transaction.business_purpose.clone(),
            transaction.merchant.clone(),
            transaction.receipt_number.clone(),
        ],
    }
}

/// Owned column values that can move into a `Connection::call` closure.
#[derive(Debug, Clone)]
pub struct TransactionRow {
    pub id: String,
    pub description: String,
    pub amount: String,
    pub date: String,
    pub kind: String,
    pub optional: [Option<String>; 11],
}

impl TransactionRow {
    pub fn execute(&self, conn: &rusqlite::Connection, sql: &str) -> rusqlite::Result<usize> {
        let required: [&dyn ToSql; 5] =
            [&self.id, &self.description, &self.amount, &self.date, &self.kind];
        let mut params = required.to_vec();
        params.extend(self.optional.iter().map(|value| value as &dyn ToSql));
        conn.execute(sql, params.as_slice())
    }
}

/// Format a NaiveDate for SQLite storage. ISO dates sort chronologically as text.
pub fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date(column: usize, s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn parse_decimal(column: usize, s: &str) -> rusqlite::Result<Decimal> {
    Decimal::from_str(s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}
