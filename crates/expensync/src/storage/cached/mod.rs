//! Cached repository decorator.
//!
//! Wraps a [`TransactionRepository`] with the cache-aside pattern:
//!
//! - **Reads**: check the cache first, on miss fetch from the repository and populate the cache
//! - **Writes**: persist, invalidate the affected keys, publish the change to the feed
//!
//! Cache and feed failures are logged and never fail the operation.
//!
//! [`TransactionRepository`]: expensync_core::storage::TransactionRepository

mod transaction;

pub use transaction::CachedTransactionRepository;
