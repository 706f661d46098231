//! expensync_client - client side of expensync.
//!
//! [`ExpensyncClient`] talks to the document store over HTTP, a [`LocalCache`]
//! keeps the last pages on this machine, and [`TransactionStore`] merges both
//! with the realtime change feed into one reactive list.
//!
//! [`LocalCache`]: expensync_core::cache::LocalCache

pub mod cache;
pub mod cli;
pub mod client;
pub mod error;
pub mod output;
pub mod store;

pub use client::ExpensyncClient;
pub use error::{ClientError, Result};
pub use store::{StoreConfig, StoreError, StoreSnapshot, TransactionStore};
