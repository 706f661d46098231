//! Merging of remote results into a locally held, ordered transaction list.
//!
//! The list is always kept sorted by [`compare_newest_first`] and never holds
//! two transactions with the same id. Pages, realtime changes and optimistic
//! writes all go through these functions, so a record that arrives twice
//! (for example an optimistic insert echoed back by the change feed) replaces
//! the earlier copy instead of being duplicated.

use super::events::TransactionChange;
use super::operations::compare_newest_first;
use super::types::{Transaction, TransactionId};

/// What [`upsert_sorted`] did with the incoming transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No transaction with this id existed.
    Inserted,
    /// An existing transaction was replaced; holds the previous value.
    Replaced(Transaction),
}

/// Inserts or replaces a transaction, keeping the list ordered.
pub fn upsert_sorted(list: &mut Vec<Transaction>, transaction: Transaction) -> UpsertOutcome {
    let previous = remove_by_id(list, &transaction.id).map(|(_, tx)| tx);
    let position = list
        .binary_search_by(|probe| compare_newest_first(probe, &transaction))
        .unwrap_or_else(|pos| pos);
    list.insert(position, transaction);

    match previous {
        Some(tx) => UpsertOutcome::Replaced(tx),
        None => UpsertOutcome::Inserted,
    }
}

/// Removes a transaction by id, returning its former position and value.
pub fn remove_by_id(
    list: &mut Vec<Transaction>,
    id: &TransactionId,
) -> Option<(usize, Transaction)> {
    let position = list.iter().position(|tx| &tx.id == id)?;
    Some((position, list.remove(position)))
}

/// Applies a realtime change. Returns true if the list changed.
pub fn apply_change(list: &mut Vec<Transaction>, change: &TransactionChange) -> bool {
    match change {
        TransactionChange::Added { transaction } | TransactionChange::Modified { transaction } => {
            match upsert_sorted(list, transaction.clone()) {
                UpsertOutcome::Inserted => true,
                UpsertOutcome::Replaced(previous) => &previous != transaction,
            }
        }
        TransactionChange::Removed { id } => remove_by_id(list, id).is_some(),
    }
}

/// Merges a page of results. Returns the number of transactions that were new.
pub fn merge_page(list: &mut Vec<Transaction>, page: Vec<Transaction>) -> usize {
    page.into_iter()
        .filter(|tx| matches!(upsert_sorted(list, tx.clone()), UpsertOutcome::Inserted))
        .count()
}
