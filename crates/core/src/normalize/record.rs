//! Normalization of whole legacy records into canonical transactions.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};

use super::amount::parse_amount;
use super::date::{parse_date, DateFormat};
use super::kind::{is_canonical_kind, normalize_kind};
use super::{NormalizeError, Result};
use crate::transaction::{upsert_sorted, Transaction, TransactionId, UpsertOutcome};

/// Key under which some spreadsheet exports stored the business purpose.
const LEGACY_BUSINESS_PURPOSE_KEY: &str = "PagadbusinessPurposeo Por:";

/// What had to be fixed to make a record canonical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordFixes {
    pub id_assigned: bool,
    pub amount_from_text: bool,
    pub amount_defaulted: bool,
    pub kind_fixed: bool,
    pub date_format: DateFormat,
}

/// A canonical transaction together with the fixes applied to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub transaction: Transaction,
    pub fixes: RecordFixes,
}

/// A record left out of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRecord {
    pub index: usize,
    pub reason: String,
}

/// Counts of what [`normalize_batch`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    pub total: usize,
    pub normalized: usize,
    pub ids_assigned: usize,
    pub duplicate_ids: usize,
    pub amounts_from_text: usize,
    pub amounts_defaulted: usize,
    pub kinds_fixed: usize,
    /// Number of records per source date format.
    pub date_formats: BTreeMap<String, usize>,
    pub rejected: Vec<RejectedRecord>,
}

impl NormalizeReport {
    /// Records whose date was not already `YYYY-MM-DD`.
    pub fn dates_converted(&self) -> usize {
        self.date_formats
            .iter()
            .filter(|(label, _)| label.as_str() != DateFormat::Iso.label())
            .map(|(_, count)| count)
            .sum()
    }

    fn record(&mut self, fixes: &RecordFixes) {
        self.normalized += 1;
        self.ids_assigned += usize::from(fixes.id_assigned);
        self.amounts_from_text += usize::from(fixes.amount_from_text);
        self.amounts_defaulted += usize::from(fixes.amount_defaulted);
        self.kinds_fixed += usize::from(fixes.kind_fixed);
        *self
            .date_formats
            .entry(fixes.date_format.label().to_string())
            .or_insert(0) += 1;
    }
}

/// Builds a canonical transaction from a legacy JSON record.
///
/// `index` is the record's position in its batch and names the record when
/// it has no id of its own. Unusable amounts become zero; an unusable date
/// rejects the record.
pub fn normalize_record(value: &Value, index: usize) -> Result<NormalizedRecord> {
    let obj = value.as_object().ok_or(NormalizeError::NotAnObject)?;

    let (date, date_format) = parse_date(obj.get("date").unwrap_or(&Value::Null))?;

    let (id, id_assigned) = match text(obj, "id") {
        Some(id) => (TransactionId::new(id), false),
        None => (TransactionId::local(index), true),
    };

    let raw_amount = obj
        .get("amount")
        .filter(|v| !v.is_null())
        .or_else(|| obj.get("formattedAmount").filter(|v| !v.is_null()));
    let amount_from_text = matches!(raw_amount, Some(Value::String(_)));
    let (amount, amount_defaulted) = match raw_amount.map(parse_amount) {
        Some(Ok(amount)) => (amount, false),
        Some(Err(_)) | None => (Decimal::ZERO, true),
    };

    let raw_kind = obj.get("type").and_then(Value::as_str).unwrap_or("");
    let kind = normalize_kind(raw_kind);

    let transaction = Transaction {
        id,
        description: text(obj, "description").unwrap_or_default(),
        amount,
        date,
        kind,
        category: text(obj, "category"),
        location: text(obj, "location"),
        account: text(obj, "cuenta"),
        subaccount: text(obj, "subcuenta"),
        payment_method: text(obj, "paymentMethod"),
        invoice: text(obj, "invoice"),
        tags: text(obj, "tags"),
        notes: text(obj, "notes"),
        business_purpose: text(obj, "businessPurpose")
            .or_else(|| text(obj, LEGACY_BUSINESS_PURPOSE_KEY)),
        merchant: text(obj, "merchant"),
        receipt_number: text(obj, "receiptNumber"),
    };

    Ok(NormalizedRecord {
        transaction,
        fixes: RecordFixes {
            id_assigned,
            amount_from_text,
            amount_defaulted,
            kind_fixed: !is_canonical_kind(raw_kind),
            date_format,
        },
    })
}

/// Normalizes a batch of legacy records.
///
/// Returns the canonical transactions newest first. When two records share an
/// id the later one wins.
pub fn normalize_batch(values: &[Value]) -> (Vec<Transaction>, NormalizeReport) {
    let mut report = NormalizeReport {
        total: values.len(),
        ..NormalizeReport::default()
    };
    let mut transactions = Vec::with_capacity(values.len());

    for (index, value) in values.iter().enumerate() {
        match normalize_record(value, index) {
            Ok(record) => {
                report.record(&record.fixes);
                let outcome = upsert_sorted(&mut transactions, record.transaction);
                if matches!(outcome, UpsertOutcome::Replaced(_)) {
                    report.duplicate_ids += 1;
                }
            }
            Err(error) => report.rejected.push(RejectedRecord {
                index,
                reason: error.to_string(),
            }),
        }
    }

    (transactions, report)
}

/// Normalizes a JSON document that must be an array of records.
pub fn normalize_document(document: &Value) -> Result<(Vec<Transaction>, NormalizeReport)> {
    let values = document.as_array().ok_or(NormalizeError::NotAnArray)?;
    Ok(normalize_batch(values))
}

/// Reads a text field, accepting numbers, trimming, and mapping blanks to None.
fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    let value = match obj.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!value.is_empty()).then_some(value)
}
