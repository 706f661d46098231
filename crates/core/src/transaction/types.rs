use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a transaction document.
///
/// New records get a UUID v4. Records imported from legacy exports keep
/// whatever id they carried, so the id is an opaque string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Id assigned to a record that had none, based on its position in a batch.
    pub fn local(index: usize) -> Self {
        Self(format!("local-{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransactionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TransactionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Direction of a transaction.
///
/// Stored documents use the Spanish wire names `ingreso` and `egreso`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TransactionKind {
    #[serde(rename = "ingreso")]
    Income,
    #[default]
    #[serde(rename = "egreso")]
    Expense,
}

impl TransactionKind {
    /// Returns the wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "ingreso",
            TransactionKind::Expense => "egreso",
        }
    }

    pub fn is_income(&self) -> bool {
        matches!(self, TransactionKind::Income)
    }

    pub fn is_expense(&self) -> bool {
        matches!(self, TransactionKind::Expense)
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single income or expense record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub description: String,
    #[serde(with = "crate::serde::amount")]
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Ledger account, used as the primary grouping key for expenses.
    #[serde(default, rename = "cuenta", skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, rename = "subcuenta", skip_serializing_if = "Option::is_none")]
    pub subaccount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_number: Option<String>,
}

impl Transaction {
    /// Creates a new transaction with a generated id.
    pub fn new(
        description: impl Into<String>,
        amount: Decimal,
        date: NaiveDate,
        kind: TransactionKind,
    ) -> Self {
        TransactionDraft::new(description, amount, date, kind)
            .into_transaction(TransactionId::generate())
    }

    /// Creates a new expense.
    pub fn expense(description: impl Into<String>, amount: Decimal, date: NaiveDate) -> Self {
        Self::new(description, amount, date, TransactionKind::Expense)
    }

    /// Creates a new income.
    pub fn income(description: impl Into<String>, amount: Decimal, date: NaiveDate) -> Self {
        Self::new(description, amount, date, TransactionKind::Income)
    }

    /// Sets a specific id (useful for testing and imports).
    pub fn with_id(mut self, id: impl Into<TransactionId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    pub fn with_subaccount(mut self, subaccount: impl Into<String>) -> Self {
        self.subaccount = Some(subaccount.into());
        self
    }

    pub fn with_payment_method(mut self, payment_method: impl Into<String>) -> Self {
        self.payment_method = Some(payment_method.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_merchant(mut self, merchant: impl Into<String>) -> Self {
        self.merchant = Some(merchant.into());
        self
    }

    /// Returns the draft part of this transaction (everything but the id).
    pub fn to_draft(&self) -> TransactionDraft {
        TransactionDraft {
            description: self.description.clone(),
            amount: self.amount,
            date: self.date,
            kind: self.kind,
            category: self.category.clone(),
            location: self.location.clone(),
            account: self.account.clone(),
            subaccount: self.subaccount.clone(),
            payment_method: self.payment_method.clone(),
            invoice: self.invoice.clone(),
            tags: self.tags.clone(),
            notes: self.notes.clone(),
            business_purpose: self.business_purpose.clone(),
            merchant: self.merchant.clone(),
            receipt_number: self.receipt_number.clone(),
        }
    }
}

/// A transaction that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
    pub description: String,
    #[serde(with = "crate::serde::amount")]
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(rename = "type", default)]
    pub kind: TransactionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, rename = "cuenta", skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, rename = "subcuenta", skip_serializing_if = "Option::is_none")]
    pub subaccount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_number: Option<String>,
}

impl TransactionDraft {
    pub fn new(
        description: impl Into<String>,
        amount: Decimal,
        date: NaiveDate,
        kind: TransactionKind,
    ) -> Self {
        Self {
            description: description.into(),
            amount,
            date,
            kind,
            category: None,
            location: None,
            account: None,
            subaccount: None,
            payment_method: None,
            invoice: None,
            tags: None,
            notes: None,
            business_purpose: None,
            merchant: None,
            receipt_number: None,
        }
    }

    /// Attaches an id, producing a storable transaction.
    pub fn into_transaction(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            description: self.description,
            amount: self.amount,
            date: self.date,
            kind: self.kind,
            category: self.category,
            location: self.location,
            account: self.account,
            subaccount: self.subaccount,
            payment_method: self.payment_method,
            invoice: self.invoice,
            tags: self.tags,
            notes: self.notes,
            business_purpose: self.business_purpose,
            merchant: self.merchant,
            receipt_number: self.receipt_number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_kind_serializes_to_wire_names() {
        assert_eq!(
            serde_json::to_string(&TransactionKind::Income).unwrap(),
            "\"ingreso\""
        );
        assert_eq!(
            serde_json::to_string(&TransactionKind::Expense).unwrap(),
            "\"egreso\""
        );
    }

    #[test]
    fn test_kind_defaults_to_expense() {
        assert_eq!(TransactionKind::default(), TransactionKind::Expense);
    }

    #[test]
    fn test_transaction_document_shape() {
        let amount = Decimal::from_str("12.50").unwrap();
        let tx = Transaction::expense("Café", amount, date(2024, 3, 1))
            .with_id("tx-1")
            .with_account("Alimentación")
            .with_payment_method("Efectivo");

        let json = serde_json::to_value(&tx).unwrap();

        assert_eq!(json["id"], "tx-1");
        assert_eq!(json["type"], "egreso");
        assert_eq!(json["date"], "2024-03-01");
        assert_eq!(json["amount"], 12.5);
        assert_eq!(json["cuenta"], "Alimentación");
        assert_eq!(json["paymentMethod"], "Efectivo");
        assert!(json.get("category").is_none());
    }

    #[test]
    fn test_transaction_parses_document() {
        let json = r#"{
            "id": "abc",
            "description": "Sueldo",
            "amount": 1500,
            "date": "2024-01-31",
            "type": "ingreso",
            "subcuenta": "Empresa",
            "businessPurpose": "Nómina"
        }"#;

        let tx: Transaction = serde_json::from_str(json).unwrap();

        assert_eq!(tx.id.as_str(), "abc");
        assert_eq!(tx.amount, Decimal::from(1500));
        assert!(tx.kind.is_income());
        assert_eq!(tx.subaccount.as_deref(), Some("Empresa"));
        assert_eq!(tx.business_purpose.as_deref(), Some("Nómina"));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(TransactionId::generate(), TransactionId::generate());
    }

    #[test]
    fn test_local_id_format() {
        assert_eq!(TransactionId::local(7).as_str(), "local-7");
    }

    #[test]
    fn test_draft_round_trips_through_transaction() {
        let tx = Transaction::income("Venta", Decimal::from(40), date(2024, 5, 5)).with_notes("n");
        let rebuilt = tx.to_draft().into_transaction(tx.id.clone());
        assert_eq!(rebuilt, tx);
    }
}
