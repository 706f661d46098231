//! Pure queries and aggregates over transaction lists.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::TransactionError;
use super::types::{Transaction, TransactionKind};
use crate::storage::DateRange;

/// Grouping key for expenses that have neither account nor category.
pub const UNCATEGORIZED: &str = "Sin categoría";

/// Maximum length of a transaction description.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Display order of transactions: newest date first, ties by id descending.
pub fn compare_newest_first(a: &Transaction, b: &Transaction) -> Ordering {
    b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id))
}

/// Sorts transactions newest first.
pub fn sort_newest_first(transactions: &mut [Transaction]) {
    transactions.sort_by(compare_newest_first);
}

/// Validates a transaction before it is written.
pub fn validate_transaction(transaction: &Transaction) -> Result<(), TransactionError> {
    if transaction.id.is_empty() {
        return Err(TransactionError::MissingId);
    }
    if transaction.description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(TransactionError::DescriptionTooLong {
            max: MAX_DESCRIPTION_LEN,
        });
    }
    Ok(())
}

/// Filters transactions whose date falls within the range (inclusive).
pub fn filter_by_date_range(transactions: &[Transaction], range: DateRange) -> Vec<&Transaction> {
    transactions
        .iter()
        .filter(|tx| tx.date >= range.start && tx.date <= range.end)
        .collect()
}

/// Sum of the amounts of all transactions of the given kind.
pub fn total(transactions: &[Transaction], kind: TransactionKind) -> Decimal {
    transactions
        .iter()
        .filter(|tx| tx.kind == kind)
        .map(|tx| tx.amount)
        .sum()
}

/// Income minus expenses.
pub fn balance(transactions: &[Transaction]) -> Decimal {
    total(transactions, TransactionKind::Income) - total(transactions, TransactionKind::Expense)
}

/// Key under which an expense is grouped: account, else category, else
/// [`UNCATEGORIZED`].
pub fn category_key(transaction: &Transaction) -> &str {
    transaction
        .account
        .as_deref()
        .filter(|s| !s.is_empty())
        .or_else(|| transaction.category.as_deref().filter(|s| !s.is_empty()))
        .unwrap_or(UNCATEGORIZED)
}

/// Expense totals grouped by [`category_key`].
pub fn expenses_by_category(transactions: &[Transaction]) -> BTreeMap<String, Decimal> {
    group_expenses(transactions.iter().filter(|tx| tx.kind.is_expense()))
}

/// Expense totals grouped by [`category_key`] for a single location.
///
/// Non-positive amounts are left out, so refunds booked as negative
/// expenses do not shrink a location's spending.
pub fn expenses_by_category_for_location(
    transactions: &[Transaction],
    location: &str,
) -> BTreeMap<String, Decimal> {
    group_expenses(transactions.iter().filter(|tx| {
        tx.kind.is_expense()
            && tx.location.as_deref() == Some(location)
            && tx.amount > Decimal::ZERO
    }))
}

fn group_expenses<'a>(
    transactions: impl Iterator<Item = &'a Transaction>,
) -> BTreeMap<String, Decimal> {
    transactions.fold(BTreeMap::new(), |mut acc, tx| {
        *acc.entry(category_key(tx).to_string())
            .or_insert(Decimal::ZERO) += tx.amount;
        acc
    })
}

/// Distinct non-empty locations, sorted.
pub fn locations(transactions: &[Transaction]) -> BTreeSet<String> {
    transactions
        .iter()
        .filter_map(|tx| tx.location.as_deref())
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Derived figures shown next to the transaction list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub income: Decimal,
    pub expenses: Decimal,
    pub balance: Decimal,
    pub expenses_by_category: BTreeMap<String, Decimal>,
}

/// Computes the [`Summary`] of a list, optionally restricted to one location.
pub fn summarize(transactions: &[Transaction], location: Option<&str>) -> Summary {
    let income = total(transactions, TransactionKind::Income);
    let expenses = total(transactions, TransactionKind::Expense);
    let expenses_by_category = match location {
        Some(location) => expenses_by_category_for_location(transactions, location),
        None => expenses_by_category(transactions),
    };

    Summary {
        count: transactions.len(),
        income,
        expenses,
        balance: income - expenses,
        expenses_by_category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    fn sample() -> Vec<Transaction> {
        vec![
            Transaction::income("Sueldo", Decimal::from(1000), date(1)).with_id("a"),
            Transaction::expense("Super", Decimal::from(200), date(2))
                .with_id("b")
                .with_account("Alimentación")
                .with_location("Montevideo"),
            Transaction::expense("Taxi", Decimal::from(50), date(3))
                .with_id("c")
                .with_category("Transporte")
                .with_location("Montevideo"),
            Transaction::expense("Varios", Decimal::from(25), date(3)).with_id("d"),
            Transaction::expense("Devolución", Decimal::from(-30), date(4))
                .with_id("e")
                .with_account("Alimentación")
                .with_location("Montevideo"),
        ]
    }

    #[test]
    fn test_sort_newest_first_with_id_tiebreak() {
        let mut txs = sample();
        sort_newest_first(&mut txs);
        let ids: Vec<_> = txs.iter().map(|tx| tx.id.as_str()).collect();
        assert_eq!(ids, vec!["e", "d", "c", "b", "a"]);
    }

    #[test]
    fn test_totals_and_balance() {
        let txs = sample();
        assert_eq!(total(&txs, TransactionKind::Income), Decimal::from(1000));
        assert_eq!(total(&txs, TransactionKind::Expense), Decimal::from(245));
        assert_eq!(balance(&txs), Decimal::from(755));
    }

    #[test]
    fn test_totals_of_empty_list_are_zero() {
        assert_eq!(total(&[], TransactionKind::Income), Decimal::ZERO);
        assert_eq!(balance(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_expenses_by_category_prefers_account() {
        let by_category = expenses_by_category(&sample());
        assert_eq!(by_category["Alimentación"], Decimal::from(170));
        assert_eq!(by_category["Transporte"], Decimal::from(50));
        assert_eq!(by_category[UNCATEGORIZED], Decimal::from(25));
        assert_eq!(by_category.len(), 3);
    }

    #[test]
    fn test_expenses_by_category_for_location_skips_non_positive() {
        let by_category = expenses_by_category_for_location(&sample(), "Montevideo");
        assert_eq!(by_category["Alimentación"], Decimal::from(200));
        assert_eq!(by_category["Transporte"], Decimal::from(50));
        assert!(!by_category.contains_key(UNCATEGORIZED));
    }

    #[test]
    fn test_empty_account_falls_back_to_category() {
        let tx = Transaction::expense("x", Decimal::ONE, date(1))
            .with_account("")
            .with_category("Ocio");
        assert_eq!(category_key(&tx), "Ocio");
    }

    #[test]
    fn test_filter_by_date_range_is_inclusive() {
        let txs = sample();
        let range = DateRange::new(date(2), date(3)).unwrap();
        let ids: Vec<_> = filter_by_date_range(&txs, range)
            .iter()
            .map(|tx| tx.id.as_str())
            .collect();
        assert_eq!(ids, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_locations_are_distinct() {
        let locations = locations(&sample());
        assert_eq!(locations.len(), 1);
        assert!(locations.contains("Montevideo"));
    }

    #[test]
    fn test_summarize_for_location() {
        let summary = summarize(&sample(), Some("Montevideo"));
        assert_eq!(summary.count, 5);
        assert_eq!(summary.balance, Decimal::from(755));
        assert_eq!(summary.expenses_by_category.len(), 2);
    }

    #[test]
    fn test_validate_transaction() {
        let tx = Transaction::expense("ok", Decimal::ONE, date(1));
        assert!(validate_transaction(&tx).is_ok());

        let missing_id = tx.clone().with_id("  ");
        assert_eq!(
            validate_transaction(&missing_id),
            Err(TransactionError::MissingId)
        );

        let mut long = tx;
        long.description = "x".repeat(MAX_DESCRIPTION_LEN + 1);
        assert_eq!(
            validate_transaction(&long),
            Err(TransactionError::DescriptionTooLong {
                max: MAX_DESCRIPTION_LEN
            })
        );
    }
}
