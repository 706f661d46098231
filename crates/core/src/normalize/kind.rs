use crate::transaction::TransactionKind;

/// Maps the many spellings found in legacy data to a [`TransactionKind`].
///
/// Matching is case-insensitive and ignores surrounding whitespace. Blank or
/// unknown values are treated as expenses.
pub fn normalize_kind(raw: &str) -> TransactionKind {
    match raw.trim().to_lowercase().as_str() {
        "ingreso" | "ingresso" | "income" => TransactionKind::Income,
        _ => TransactionKind::Expense,
    }
}

/// True if `raw` is already the canonical wire name of a kind.
pub fn is_canonical_kind(raw: &str) -> bool {
    raw == TransactionKind::Income.as_str() || raw == TransactionKind::Expense.as_str()
}
