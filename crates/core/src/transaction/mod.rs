mod error;
mod events;
mod merge;
mod operations;
mod types;

pub use error::TransactionError;
pub use events::{ChangeEvent, FeedMessage, TransactionChange};
pub use merge::{apply_change, merge_page, remove_by_id, upsert_sorted, UpsertOutcome};
pub use operations::{
    balance, category_key, compare_newest_first, expenses_by_category,
    expenses_by_category_for_location, filter_by_date_range, locations, sort_newest_first,
    summarize, total, validate_transaction, Summary, MAX_DESCRIPTION_LEN, UNCATEGORIZED,
};
pub use types::{Transaction, TransactionDraft, TransactionId, TransactionKind};
